use crate::entities::Role;

// Order lifecycle
pub mod order_state;
pub mod orders;
pub mod pricing;

// Stock and catalog
pub mod inventory;
pub mod pricelist;

// Staff
pub mod incidents;
pub mod users;

// Bootstrap data
pub mod seed;

/// The authenticated caller a service acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i32, role: Role) -> Self {
        Self { user_id, role }
    }
}
