use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::client_notification::{
    self, Entity as ClientNotification, Model as NotificationModel,
};
use crate::entities::order::{
    ActiveModel as OrderActiveModel, Column, Entity as Order, Model as OrderModel, OrderStatus,
};
use crate::entities::order_history::{self, Entity as OrderHistory, Model as HistoryModel};
use crate::entities::order_item::{self, Entity as OrderItem, Model as OrderItemModel};
use crate::errors::ServiceError;

use super::{BaseRepository, Repository};

/// Repository for orders, their items, status history and client notifications
#[derive(Debug)]
pub struct OrderRepository<'c, C> {
    base: BaseRepository<'c, C>,
}

impl<'c, C: ConnectionTrait> OrderRepository<'c, C> {
    pub fn new(db: &'c C) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find an order by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<OrderModel>, ServiceError> {
        Order::find_by_id(id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Find an order by ID, restricted to rows matching `visibility`
    pub async fn find_visible(
        &self,
        id: i32,
        visibility: Condition,
    ) -> Result<Option<OrderModel>, ServiceError> {
        Order::find_by_id(id)
            .filter(visibility)
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Most recently inserted order number starting with `prefix`
    pub async fn last_number_with_prefix(&self, prefix: &str) -> Result<Option<String>, ServiceError> {
        let last = Order::find()
            .filter(Column::OrderNumber.starts_with(prefix))
            .order_by_desc(Column::Id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(last.map(|order| order.order_number))
    }

    /// Orders matching `condition`, newest first, with the unpaged total
    pub async fn list(
        &self,
        condition: Condition,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let query = Order::find().filter(condition);

        let total = query
            .clone()
            .count(self.get_db())
            .await
            .map_err(ServiceError::db_error)?;

        let orders = query
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok((orders, total))
    }

    /// Create a new order
    pub async fn create(&self, order: OrderActiveModel) -> Result<OrderModel, ServiceError> {
        order.insert(self.get_db()).await.map_err(ServiceError::db_error)
    }

    /// Update an order
    pub async fn update(&self, order: OrderActiveModel) -> Result<OrderModel, ServiceError> {
        order.update(self.get_db()).await.map_err(ServiceError::db_error)
    }

    /// Moves an order from `from` to `to` only if it is still in `from`.
    /// Returns `false` when another writer changed the status first.
    pub async fn compare_and_set_status(
        &self,
        id: i32,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, ServiceError> {
        let result = Order::update_many()
            .col_expr(Column::Status, Expr::value(to))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(from))
            .exec(self.get_db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(result.rows_affected == 1)
    }

    pub async fn add_item(&self, item: order_item::ActiveModel) -> Result<OrderItemModel, ServiceError> {
        item.insert(self.get_db()).await.map_err(ServiceError::db_error)
    }

    /// Get order items for an order
    pub async fn items(&self, order_id: i32) -> Result<Vec<OrderItemModel>, ServiceError> {
        OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Items of several orders in one query
    pub async fn items_for_orders(&self, order_ids: &[i32]) -> Result<Vec<OrderItemModel>, ServiceError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(order_ids.iter().copied()))
            .order_by_asc(order_item::Column::Id)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn append_history(
        &self,
        order_id: i32,
        old_status: Option<OrderStatus>,
        new_status: OrderStatus,
        changed_by: i32,
        note: &str,
    ) -> Result<HistoryModel, ServiceError> {
        order_history::ActiveModel {
            order_id: Set(order_id),
            old_status: Set(old_status),
            new_status: Set(new_status),
            changed_by: Set(changed_by),
            note: Set(note.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.get_db())
        .await
        .map_err(ServiceError::db_error)
    }

    /// Oldest first
    pub async fn history(&self, order_id: i32) -> Result<Vec<HistoryModel>, ServiceError> {
        OrderHistory::find()
            .filter(order_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_history::Column::CreatedAt)
            .order_by_asc(order_history::Column::Id)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn queue_notification(
        &self,
        order_id: i32,
        channel: &str,
        message: &str,
    ) -> Result<NotificationModel, ServiceError> {
        client_notification::ActiveModel {
            order_id: Set(order_id),
            channel: Set(channel.to_string()),
            message: Set(message.to_string()),
            status: Set(client_notification::STATUS_QUEUED.to_string()),
            created_at: Set(Utc::now()),
            sent_at: Set(None),
            ..Default::default()
        }
        .insert(self.get_db())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn notifications(&self, order_id: i32) -> Result<Vec<NotificationModel>, ServiceError> {
        ClientNotification::find()
            .filter(client_notification::Column::OrderId.eq(order_id))
            .order_by_asc(client_notification::Column::Id)
            .all(self.get_db())
            .await
            .map_err(ServiceError::db_error)
    }
}

impl<'c, C: ConnectionTrait> Repository for OrderRepository<'c, C> {
    type Conn = C;

    fn get_db(&self) -> &C {
        self.base.get_db()
    }
}

