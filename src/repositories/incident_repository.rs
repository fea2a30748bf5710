use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::incident::{self, Entity as Incident, IncidentStatus, Model as IncidentModel};
use crate::errors::ServiceError;

use super::{BaseRepository, Repository};

#[derive(Debug)]
pub struct IncidentRepository<'c, C> {
    base: BaseRepository<'c, C>,
}

impl<'c, C: ConnectionTrait> IncidentRepository<'c, C> {
    pub fn new(db: &'c C) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn insert(&self, model: incident::ActiveModel) -> Result<IncidentModel, ServiceError> {
        model.insert(self.get_db()).await.map_err(ServiceError::db_error)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<IncidentModel>, ServiceError> {
        Incident::find_by_id(id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn set_status(
        &self,
        incident: IncidentModel,
        status: IncidentStatus,
    ) -> Result<IncidentModel, ServiceError> {
        let mut active: incident::ActiveModel = incident.into();
        active.status = Set(status);
        active.update(self.get_db()).await.map_err(ServiceError::db_error)
    }

    /// Newest first, at most `limit` rows matching `condition`.
    pub async fn list(
        &self,
        condition: Condition,
        limit: u64,
    ) -> Result<Vec<IncidentModel>, ServiceError> {
        Incident::find()
            .filter(condition)
            .order_by_desc(incident::Column::CreatedAt)
            .order_by_desc(incident::Column::Id)
            .limit(limit)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }
}

impl<'c, C: ConnectionTrait> Repository for IncidentRepository<'c, C> {
    type Conn = C;

    fn get_db(&self) -> &C {
        self.base.get_db()
    }
}
