use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Kind of stock movement. Reserve, consume and defect entries are stored
/// with a negative quantity, receive and unreserve with a positive one and
/// corrections carry their own sign.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum LedgerAction {
    #[sea_orm(string_value = "receive")]
    Receive,
    #[sea_orm(string_value = "reserve")]
    Reserve,
    #[sea_orm(string_value = "unreserve")]
    Unreserve,
    #[sea_orm(string_value = "consume")]
    Consume,
    #[sea_orm(string_value = "correction")]
    Correction,
    #[sea_orm(string_value = "defect")]
    Defect,
}

impl LedgerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAction::Receive => "receive",
            LedgerAction::Reserve => "reserve",
            LedgerAction::Unreserve => "unreserve",
            LedgerAction::Consume => "consume",
            LedgerAction::Correction => "correction",
            LedgerAction::Defect => "defect",
        }
    }
}

impl fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only journal of stock movements.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "material_ledger")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub material_id: i32,
    pub order_id: Option<i32>,
    pub action: LedgerAction,
    #[sea_orm(column_type = "Decimal(Some((14, 4)))")]
    pub quantity: Decimal,
    pub note: String,
    pub performed_by: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::material::Entity",
        from = "Column::MaterialId",
        to = "super::material::Column::Id"
    )]
    Material,
}

impl Related<super::material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Material.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
