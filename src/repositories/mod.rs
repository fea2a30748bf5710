use sea_orm::ConnectionTrait;

pub mod catalog_repository;
pub mod incident_repository;
pub mod material_repository;
pub mod order_repository;
pub mod user_repository;

pub use catalog_repository::CatalogRepository;
pub use incident_repository::IncidentRepository;
pub use material_repository::MaterialRepository;
pub use order_repository::OrderRepository;
pub use user_repository::UserRepository;

/// Repository trait for common database operations.
///
/// Repositories borrow a connection instead of owning a pool so the same
/// code runs against the pool or inside an open transaction.
pub trait Repository {
    type Conn: ConnectionTrait;

    fn get_db(&self) -> &Self::Conn;
}

#[derive(Debug)]
pub struct BaseRepository<'c, C> {
    db: &'c C,
}

impl<'c, C: ConnectionTrait> BaseRepository<'c, C> {
    pub fn new(db: &'c C) -> Self {
        Self { db }
    }
}

impl<'c, C: ConnectionTrait> Repository for BaseRepository<'c, C> {
    type Conn = C;

    fn get_db(&self) -> &C {
        self.db
    }
}
