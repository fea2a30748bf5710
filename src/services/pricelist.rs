use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::db::{self, DbPool};
use crate::entities::price_history::Model as PriceHistoryModel;
use crate::entities::service::{ActiveModel as ServiceActiveModel, Model as ServiceModel};
use crate::entities::Role;
use crate::errors::ServiceError;
use crate::repositories::CatalogRepository;

/// Price-list row. `cost_price` is only present for directors.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceView {
    pub id: i32,
    pub code: String,
    pub name_ru: String,
    pub name_ky: String,
    pub category: String,
    pub unit: String,
    pub price_retail: Decimal,
    pub price_dealer: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<Decimal>,
    pub min_order: Decimal,
    #[schema(value_type = Option<Object>)]
    pub options: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceView {
    pub fn for_role(service: ServiceModel, role: Role) -> Self {
        Self {
            cost_price: role.is_director().then_some(service.cost_price),
            id: service.id,
            code: service.code,
            name_ru: service.name_ru,
            name_ky: service.name_ky,
            category: service.category,
            unit: service.unit,
            price_retail: service.price_retail,
            price_dealer: service.price_dealer,
            min_order: service.min_order,
            options: service.options,
            updated_at: service.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceUpdate {
    pub price_retail: Decimal,
    pub price_dealer: Decimal,
    pub cost_price: Option<Decimal>,
}

impl PriceUpdate {
    fn check(&self) -> Result<(), ServiceError> {
        let negative = self.price_retail < Decimal::ZERO
            || self.price_dealer < Decimal::ZERO
            || self.cost_price.is_some_and(|c| c < Decimal::ZERO);
        if negative {
            return Err(ServiceError::ValidationError(
                "prices must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceHistoryView {
    pub id: i32,
    pub service_id: i32,
    pub price_retail: Decimal,
    pub price_dealer: Decimal,
    pub changed_by: i32,
    pub changed_at: DateTime<Utc>,
}

impl From<PriceHistoryModel> for PriceHistoryView {
    fn from(entry: PriceHistoryModel) -> Self {
        Self {
            id: entry.id,
            service_id: entry.service_id,
            price_retail: entry.price_retail,
            price_dealer: entry.price_dealer,
            changed_by: entry.changed_by,
            changed_at: entry.changed_at,
        }
    }
}

#[derive(Clone)]
pub struct PricelistService {
    db_pool: Arc<DbPool>,
}

impl PricelistService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, role: Role) -> Result<Vec<ServiceView>, ServiceError> {
        let db = &*self.db_pool;
        let services = CatalogRepository::new(db).list_active_services().await?;
        Ok(services
            .into_iter()
            .map(|service| ServiceView::for_role(service, role))
            .collect())
    }

    /// Archives the current retail and dealer prices, then applies the new ones.
    #[instrument(skip(self, update), fields(service_id = id))]
    pub async fn update_prices(
        &self,
        id: i32,
        update: PriceUpdate,
        changed_by: i32,
    ) -> Result<ServiceView, ServiceError> {
        update.check()?;

        let txn = db::begin(&self.db_pool, "pricelist.update").await?;
        let catalog = CatalogRepository::new(&txn);
        let current = catalog
            .find_service(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Service {} not found", id)))?;

        catalog.archive_prices(&current, changed_by).await?;

        let previous_retail = current.price_retail;
        let mut active: ServiceActiveModel = current.into();
        active.price_retail = Set(update.price_retail);
        active.price_dealer = Set(update.price_dealer);
        if let Some(cost) = update.cost_price {
            active.cost_price = Set(cost);
        }
        active.updated_at = Set(Utc::now());
        let updated = catalog.update_service(active).await?;
        db::commit(txn, "pricelist.update").await?;

        counter!("printshop.pricelist.updates", 1);
        info!(
            service_id = id,
            from = %previous_retail,
            to = %updated.price_retail,
            "Service prices updated"
        );
        Ok(ServiceView::for_role(updated, Role::Director))
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn history(&self, id: i32) -> Result<Vec<PriceHistoryView>, ServiceError> {
        let db = &*self.db_pool;
        let catalog = CatalogRepository::new(db);
        catalog
            .find_service(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Service {} not found", id)))?;
        let entries = catalog.price_history(id).await?;
        Ok(entries.into_iter().map(PriceHistoryView::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn negative_prices_are_rejected() {
        let update = PriceUpdate {
            price_retail: dec!(450),
            price_dealer: dec!(-1),
            cost_price: None,
        };
        assert_matches!(update.check(), Err(ServiceError::ValidationError(_)));

        let update = PriceUpdate {
            price_retail: dec!(0),
            price_dealer: dec!(0),
            cost_price: Some(dec!(-0.5)),
        };
        assert_matches!(update.check(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn zero_prices_are_allowed() {
        let update = PriceUpdate {
            price_retail: dec!(0),
            price_dealer: dec!(0),
            cost_price: Some(dec!(0)),
        };
        assert!(update.check().is_ok());
    }
}
