use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
};

use crate::entities::user::{self, Entity as User, Model as UserModel};
use crate::errors::ServiceError;

use super::{BaseRepository, Repository};

#[derive(Debug)]
pub struct UserRepository<'c, C> {
    base: BaseRepository<'c, C>,
}

impl<'c, C: ConnectionTrait> UserRepository<'c, C> {
    pub fn new(db: &'c C) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<UserModel>, ServiceError> {
        User::find_by_id(id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, ServiceError> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        User::find()
            .count(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn insert(&self, model: user::ActiveModel) -> Result<UserModel, ServiceError> {
        model.insert(self.get_db()).await.map_err(ServiceError::db_error)
    }
}

impl<'c, C: ConnectionTrait> Repository for UserRepository<'c, C> {
    type Conn = C;

    fn get_db(&self) -> &C {
        self.base.get_db()
    }
}
