pub mod client_notification;
pub mod incident;
pub mod material;
pub mod material_ledger;
pub mod order;
pub mod order_history;
pub mod order_item;
pub mod price_history;
pub mod service;
pub mod service_material;
pub mod user;

pub use order::OrderStatus;
pub use user::Role;
