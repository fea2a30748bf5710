use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Lifecycle state of an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "design")]
    Design,
    #[sea_orm(string_value = "design_done")]
    DesignDone,
    #[sea_orm(string_value = "production")]
    Production,
    #[sea_orm(string_value = "printed")]
    Printed,
    #[sea_orm(string_value = "postprocess")]
    Postprocess,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "closed")]
    Closed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "defect")]
    Defect,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Design => "design",
            OrderStatus::DesignDone => "design_done",
            OrderStatus::Production => "production",
            OrderStatus::Printed => "printed",
            OrderStatus::Postprocess => "postprocess",
            OrderStatus::Ready => "ready",
            OrderStatus::Closed => "closed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Defect => "defect",
        }
    }

    /// No further edits once an order reached one of these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Cancelled)
    }

    /// Pre-production states; cancelling from one of them releases the
    /// order's reservations.
    pub fn releases_on_cancel(&self) -> bool {
        matches!(
            self,
            OrderStatus::Created | OrderStatus::Design | OrderStatus::DesignDone
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "design" => Ok(OrderStatus::Design),
            "design_done" => Ok(OrderStatus::DesignDone),
            "production" => Ok(OrderStatus::Production),
            "printed" => Ok(OrderStatus::Printed),
            "postprocess" => Ok(OrderStatus::Postprocess),
            "ready" => Ok(OrderStatus::Ready),
            "closed" => Ok(OrderStatus::Closed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "defect" => Ok(OrderStatus::Defect),
            other => Err(format!("Unknown status '{}'", other)),
        }
    }
}

/// Which price tier applies to the client.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    #[default]
    #[sea_orm(string_value = "retail")]
    Retail,
    #[sea_orm(string_value = "dealer")]
    Dealer,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub order_number: String,
    pub client_name: String,
    pub client_phone: String,
    pub client_type: ClientType,
    pub status: OrderStatus,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub material_cost: Decimal,
    pub notes: String,
    pub design_file: Option<String>,
    pub photo_file: Option<String>,
    pub assigned_designer: Option<i32>,
    pub assigned_master: Option<i32>,
    pub assigned_assistant: Option<i32>,
    pub deadline: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::order_history::Entity")]
    OrderHistory,
    #[sea_orm(has_many = "super::client_notification::Entity")]
    ClientNotification,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::order_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderHistory.def()
    }
}

impl Related<super::client_notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientNotification.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
