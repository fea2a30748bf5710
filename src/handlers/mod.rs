pub mod auth;
pub mod common;
pub mod incidents;
pub mod inventory;
pub mod orders;
pub mod pricelist;

use crate::db::DbPool;
use crate::services::{
    incidents::IncidentService, inventory::InventoryService, orders::OrderService,
    pricelist::PricelistService, users::UserService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub inventory: Arc<InventoryService>,
    pub pricelist: Arc<PricelistService>,
    pub incidents: Arc<IncidentService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, order_number_prefix: &str) -> Self {
        Self {
            orders: Arc::new(OrderService::new(db_pool.clone(), order_number_prefix)),
            inventory: Arc::new(InventoryService::new(db_pool.clone())),
            pricelist: Arc::new(PricelistService::new(db_pool.clone())),
            incidents: Arc::new(IncidentService::new(db_pool.clone())),
            users: Arc::new(UserService::new(db_pool)),
        }
    }
}
