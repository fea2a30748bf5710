use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A priced catalog entry (banner printing, business cards, ...).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub name_ru: String,
    pub name_ky: String,
    pub category: String,
    /// Free-form unit label. Area-priced services carry a square-meter label.
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub price_retail: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub price_dealer: Decimal,
    /// Cost per material unit, used to compute an order's material cost.
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub cost_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 4)))")]
    pub min_order: Decimal,
    pub options: Option<Json>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::service_material::Entity")]
    ServiceMaterial,
    #[sea_orm(has_many = "super::price_history::Entity")]
    PriceHistory,
}

impl Related<super::service_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceMaterial.def()
    }
}

impl Related<super::price_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
