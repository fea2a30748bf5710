use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use rust_decimal::Decimal;

use crate::entities::price_history::{self, Entity as PriceHistory, Model as PriceHistoryModel};
use crate::entities::service::{self, Entity as Service, Model as ServiceModel};
use crate::entities::service_material::{
    self, Entity as ServiceMaterial, Model as ServiceMaterialModel,
};
use crate::errors::ServiceError;

use super::{BaseRepository, Repository};

/// Services, their material mapping and price history.
#[derive(Debug)]
pub struct CatalogRepository<'c, C> {
    base: BaseRepository<'c, C>,
}

impl<'c, C: ConnectionTrait> CatalogRepository<'c, C> {
    pub fn new(db: &'c C) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_service(&self, id: i32) -> Result<Option<ServiceModel>, ServiceError> {
        Service::find_by_id(id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn find_active_service(&self, id: i32) -> Result<Option<ServiceModel>, ServiceError> {
        Service::find_by_id(id)
            .filter(service::Column::IsActive.eq(true))
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn find_service_by_code(&self, code: &str) -> Result<Option<ServiceModel>, ServiceError> {
        Service::find()
            .filter(service::Column::Code.eq(code))
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Active services, grouped by category.
    pub async fn list_active_services(&self) -> Result<Vec<ServiceModel>, ServiceError> {
        Service::find()
            .filter(service::Column::IsActive.eq(true))
            .order_by_asc(service::Column::Category)
            .order_by_asc(service::Column::Id)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn count_services(&self) -> Result<u64, ServiceError> {
        Service::find()
            .count(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn insert_service(&self, model: service::ActiveModel) -> Result<ServiceModel, ServiceError> {
        model.insert(self.get_db()).await.map_err(ServiceError::db_error)
    }

    pub async fn update_service(&self, model: service::ActiveModel) -> Result<ServiceModel, ServiceError> {
        model.update(self.get_db()).await.map_err(ServiceError::db_error)
    }

    /// The mapping with the lowest material id; a service draws on one material.
    pub async fn primary_material(
        &self,
        service_id: i32,
    ) -> Result<Option<ServiceMaterialModel>, ServiceError> {
        ServiceMaterial::find()
            .filter(service_material::Column::ServiceId.eq(service_id))
            .order_by_asc(service_material::Column::MaterialId)
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn map_material(
        &self,
        service_id: i32,
        material_id: i32,
        ratio: Decimal,
    ) -> Result<ServiceMaterialModel, ServiceError> {
        service_material::ActiveModel {
            service_id: Set(service_id),
            material_id: Set(material_id),
            ratio: Set(ratio),
        }
        .insert(self.get_db())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn archive_prices(
        &self,
        current: &ServiceModel,
        changed_by: i32,
    ) -> Result<PriceHistoryModel, ServiceError> {
        price_history::ActiveModel {
            service_id: Set(current.id),
            price_retail: Set(current.price_retail),
            price_dealer: Set(current.price_dealer),
            changed_by: Set(changed_by),
            changed_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.get_db())
        .await
        .map_err(ServiceError::db_error)
    }

    /// Newest first.
    pub async fn price_history(&self, service_id: i32) -> Result<Vec<PriceHistoryModel>, ServiceError> {
        PriceHistory::find()
            .filter(price_history::Column::ServiceId.eq(service_id))
            .order_by_desc(price_history::Column::ChangedAt)
            .order_by_desc(price_history::Column::Id)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }
}

impl<'c, C: ConnectionTrait> Repository for CatalogRepository<'c, C> {
    type Conn = C;

    fn get_db(&self) -> &C {
        self.base.get_db()
    }
}
