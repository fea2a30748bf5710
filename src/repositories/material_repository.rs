use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::material::{self, Entity as Material, Model as MaterialModel};
use crate::entities::material_ledger::{
    self, Entity as MaterialLedger, LedgerAction, Model as LedgerModel,
};
use crate::errors::ServiceError;

use super::{BaseRepository, Repository};

/// Ledger row to append.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry<'a> {
    pub material_id: i32,
    pub order_id: Option<i32>,
    pub action: LedgerAction,
    pub quantity: Decimal,
    pub note: &'a str,
    pub performed_by: i32,
}

/// Stock levels and the material ledger.
#[derive(Debug)]
pub struct MaterialRepository<'c, C> {
    base: BaseRepository<'c, C>,
}

impl<'c, C: ConnectionTrait> MaterialRepository<'c, C> {
    pub fn new(db: &'c C) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<MaterialModel>, ServiceError> {
        Material::find_by_id(id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get(&self, id: i32) -> Result<MaterialModel, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Material {} not found", id)))
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<MaterialModel>, ServiceError> {
        Material::find()
            .filter(material::Column::Code.eq(code))
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn list_all(&self) -> Result<Vec<MaterialModel>, ServiceError> {
        Material::find()
            .order_by_asc(material::Column::Id)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn insert(&self, model: material::ActiveModel) -> Result<MaterialModel, ServiceError> {
        model.insert(self.get_db()).await.map_err(ServiceError::db_error)
    }

    /// Adds `quantity` to `reserved` only while `quantity >= reserved + q`
    /// still holds. Returns `false` when the guard rejected the update.
    pub async fn try_reserve(&self, id: i32, quantity: Decimal) -> Result<bool, ServiceError> {
        let result = Material::update_many()
            .col_expr(
                material::Column::Reserved,
                Expr::col(material::Column::Reserved).add(quantity),
            )
            .col_expr(material::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(material::Column::Id.eq(id))
            .filter(
                Expr::col(material::Column::Quantity)
                    .gte(Expr::col(material::Column::Reserved).add(quantity)),
            )
            .exec(self.get_db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(result.rows_affected == 1)
    }

    pub async fn release(&self, id: i32, quantity: Decimal) -> Result<(), ServiceError> {
        Material::update_many()
            .col_expr(
                material::Column::Reserved,
                Expr::col(material::Column::Reserved).sub(quantity),
            )
            .col_expr(material::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(material::Column::Id.eq(id))
            .exec(self.get_db())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }

    /// Moves reserved stock out of the building: both on-hand and reserved drop.
    pub async fn consume(&self, id: i32, quantity: Decimal) -> Result<(), ServiceError> {
        Material::update_many()
            .col_expr(
                material::Column::Quantity,
                Expr::col(material::Column::Quantity).sub(quantity),
            )
            .col_expr(
                material::Column::Reserved,
                Expr::col(material::Column::Reserved).sub(quantity),
            )
            .col_expr(material::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(material::Column::Id.eq(id))
            .exec(self.get_db())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }

    /// Adds a signed delta to on-hand stock unless the result would drop
    /// below zero or below what is reserved. Returns `false` when rejected.
    pub async fn try_adjust_quantity(&self, id: i32, delta: Decimal) -> Result<bool, ServiceError> {
        let result = Material::update_many()
            .col_expr(
                material::Column::Quantity,
                Expr::col(material::Column::Quantity).add(delta),
            )
            .col_expr(material::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(material::Column::Id.eq(id))
            .filter(Expr::col(material::Column::Quantity).gte(-delta))
            .filter(
                Expr::col(material::Column::Quantity)
                    .gte(Expr::col(material::Column::Reserved).sub(delta)),
            )
            .exec(self.get_db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(result.rows_affected == 1)
    }

    /// Adds a signed delta to on-hand stock.
    pub async fn adjust_quantity(&self, id: i32, delta: Decimal) -> Result<(), ServiceError> {
        Material::update_many()
            .col_expr(
                material::Column::Quantity,
                Expr::col(material::Column::Quantity).add(delta),
            )
            .col_expr(material::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(material::Column::Id.eq(id))
            .exec(self.get_db())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }

    pub async fn append_ledger(&self, entry: NewLedgerEntry<'_>) -> Result<LedgerModel, ServiceError> {
        material_ledger::ActiveModel {
            material_id: Set(entry.material_id),
            order_id: Set(entry.order_id),
            action: Set(entry.action),
            quantity: Set(entry.quantity),
            note: Set(entry.note.to_string()),
            performed_by: Set(entry.performed_by),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.get_db())
        .await
        .map_err(ServiceError::db_error)
    }

    /// Newest first.
    pub async fn ledger_page(
        &self,
        material_id: i32,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<LedgerModel>, ServiceError> {
        MaterialLedger::find()
            .filter(material_ledger::Column::MaterialId.eq(material_id))
            .order_by_desc(material_ledger::Column::CreatedAt)
            .order_by_desc(material_ledger::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Every reserve, unreserve and consume entry; input of the
    /// reconciliation report.
    pub async fn reservation_movements(&self) -> Result<Vec<LedgerModel>, ServiceError> {
        MaterialLedger::find()
            .filter(material_ledger::Column::Action.is_in([
                LedgerAction::Reserve,
                LedgerAction::Unreserve,
                LedgerAction::Consume,
            ]))
            .order_by_asc(material_ledger::Column::Id)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn ledger_for_order(&self, order_id: i32) -> Result<Vec<LedgerModel>, ServiceError> {
        MaterialLedger::find()
            .filter(material_ledger::Column::OrderId.eq(order_id))
            .order_by_asc(material_ledger::Column::Id)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }
}

impl<'c, C: ConnectionTrait> Repository for MaterialRepository<'c, C> {
    type Conn = C;

    fn get_db(&self) -> &C {
        self.base.get_db()
    }
}
