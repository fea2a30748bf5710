use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A stocked consumable. `reserved` is the part of `quantity` promised to
/// open orders; `quantity - reserved` is what new orders can draw on.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "materials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub name_ru: String,
    pub name_ky: String,
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((14, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 4)))")]
    pub reserved: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 4)))")]
    pub low_threshold: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 4)))")]
    pub roll_size: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn available(&self) -> Decimal {
        self.quantity - self.reserved
    }

    pub fn is_low(&self) -> bool {
        self.available() < self.low_threshold
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::material_ledger::Entity")]
    Ledger,
}

impl Related<super::material_ledger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledger.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
