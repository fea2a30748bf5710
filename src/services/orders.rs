use crate::{
    db::{self, DbPool},
    entities::order::{self, ActiveModel as OrderActiveModel, ClientType, Model as OrderModel},
    entities::order_history::Model as HistoryModel,
    entities::order_item::{self, Model as OrderItemModel},
    entities::{OrderStatus, Role},
    errors::ServiceError,
    repositories::{CatalogRepository, OrderRepository, UserRepository},
    services::{
        inventory,
        order_state::{self, SideEffect},
        pricing::{self, LineQuote},
        Actor,
    },
};
use chrono::{DateTime, Datelike, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Condition, DatabaseTransaction, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const DEFAULT_LIST_LIMIT: u64 = 100;
pub const MAX_LIST_LIMIT: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderItem {
    pub service_id: i32,
    pub quantity: Decimal,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    #[schema(value_type = Option<Object>)]
    pub options: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 200, message = "Client name is required"))]
    pub client_name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub client_phone: String,
    #[serde(default)]
    pub client_type: ClientType,
    #[serde(default)]
    pub notes: String,
    pub deadline: Option<String>,
    pub design_file: Option<String>,
    pub photo_file: Option<String>,
    pub assigned_designer: Option<i32>,
    pub assigned_master: Option<i32>,
    pub assigned_assistant: Option<i32>,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<CreateOrderItem>,
}

/// Editable order fields. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderRequest {
    #[validate(length(min = 1, max = 200))]
    pub client_name: Option<String>,
    #[validate(length(max = 50))]
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub deadline: Option<String>,
    pub assigned_designer: Option<i32>,
    pub assigned_master: Option<i32>,
    pub assigned_assistant: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub status: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct NotifyRequest {
    pub channels: Option<Vec<String>>,
    #[validate(length(min = 1, max = 1000))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    /// Status filter; `closed` also matches cancelled orders
    pub status: Option<String>,
    /// Substring of the order number or client name
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemView {
    pub id: i32,
    pub service_id: i32,
    pub material_id: Option<i32>,
    pub quantity: Decimal,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub material_qty: Decimal,
    #[schema(value_type = Option<Object>)]
    pub options: Option<serde_json::Value>,
}

impl From<OrderItemModel> for OrderItemView {
    fn from(item: OrderItemModel) -> Self {
        Self {
            id: item.id,
            service_id: item.service_id,
            material_id: item.material_id,
            quantity: item.quantity,
            width: item.width,
            height: item.height,
            unit_price: item.unit_price,
            total: item.total,
            material_qty: item.material_qty,
            options: item.options,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryView {
    pub id: i32,
    pub old_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub changed_by: i32,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryModel> for HistoryView {
    fn from(entry: HistoryModel) -> Self {
        Self {
            id: entry.id,
            old_status: entry.old_status,
            new_status: entry.new_status,
            changed_by: entry.changed_by,
            note: entry.note,
            created_at: entry.created_at,
        }
    }
}

/// Order as seen by a particular role. `material_cost` is only present for
/// directors.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderView {
    pub id: i32,
    pub order_number: String,
    pub client_name: String,
    pub client_phone: String,
    pub client_type: ClientType,
    pub status: OrderStatus,
    pub total_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_cost: Option<Decimal>,
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
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    pub fn for_role(order: OrderModel, items: Vec<OrderItemModel>, role: Role) -> Self {
        Self {
            material_cost: role.is_director().then_some(order.material_cost),
            id: order.id,
            order_number: order.order_number,
            client_name: order.client_name,
            client_phone: order.client_phone,
            client_type: order.client_type,
            status: order.status,
            total_price: order.total_price,
            notes: order.notes,
            design_file: order.design_file,
            photo_file: order.photo_file,
            assigned_designer: order.assigned_designer,
            assigned_master: order.assigned_master,
            assigned_assistant: order.assigned_assistant,
            deadline: order.deadline,
            created_by: order.created_by,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items: items.into_iter().map(OrderItemView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderView,
    /// Oldest first
    pub history: Vec<HistoryView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderList {
    pub orders: Vec<OrderView>,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueuedNotification {
    pub id: i32,
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotifyResponse {
    pub ok: bool,
    pub notifications: Vec<QueuedNotification>,
}

/// Rows a role may see. Managers and directors see everything; production
/// staff see what is assigned to them plus the queue of their stage.
pub fn visibility(actor: &Actor) -> Condition {
    use order::Column;

    match actor.role {
        Role::Director | Role::Manager => Condition::all(),
        Role::Designer => Condition::any()
            .add(Column::AssignedDesigner.eq(actor.user_id))
            .add(Column::Status.eq(OrderStatus::Design)),
        Role::Master => Condition::any()
            .add(Column::AssignedMaster.eq(actor.user_id))
            .add(Column::Status.is_in([
                OrderStatus::DesignDone,
                OrderStatus::Production,
                OrderStatus::Printed,
            ])),
        Role::Assistant => Condition::any()
            .add(Column::AssignedAssistant.eq(actor.user_id))
            .add(Column::Status.eq(OrderStatus::Postprocess)),
    }
}

/// `{prefix}-{year}-` shared by every order number of that year.
pub fn year_prefix(prefix: &str, year: i32) -> String {
    format!("{}-{}-", prefix, year)
}

/// Next sequential number after `last` (the most recent number of the same
/// year), padded to three digits.
pub fn next_order_number(prefix: &str, year: i32, last: Option<&str>) -> String {
    let sequence = last
        .and_then(|number| number.rsplit('-').next())
        .and_then(|suffix| suffix.parse::<u32>().ok())
        .unwrap_or(0)
        + 1;
    format!("{}{:03}", year_prefix(prefix, year), sequence)
}

pub fn ready_message(order_number: &str) -> String {
    format!("Your order {} is ready", order_number)
}

fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    raw.parse::<OrderStatus>()
        .map_err(ServiceError::ValidationError)
}

fn not_found(id: i32) -> ServiceError {
    ServiceError::NotFound(format!("Order {} not found", id))
}

struct PricedLine<'a> {
    request: &'a CreateOrderItem,
    quote: LineQuote,
    /// `(material_id, required quantity)`
    material: Option<(i32, Decimal)>,
}

/// Order lifecycle: creation with material reservation, queries with role
/// visibility, edits and status transitions.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    number_prefix: String,
    numbering: Arc<Mutex<()>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, number_prefix: impl Into<String>) -> Self {
        Self {
            db_pool,
            number_prefix: number_prefix.into(),
            numbering: Arc::new(Mutex::new(())),
        }
    }

    /// Prices every line, numbers the order and reserves its materials in a
    /// single transaction. Any failure leaves the database untouched.
    #[instrument(skip(self, request), fields(client = %request.client_name, items = request.items.len(), user_id = actor.user_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        actor: &Actor,
    ) -> Result<OrderDetail, ServiceError> {
        request.validate()?;

        // Numbering reads the last number and inserts the next one; only one
        // creation may do that at a time.
        let _numbering = self.numbering.lock().await;
        let txn = db::begin(&self.db_pool, "orders.create").await?;

        match self.create_in(&txn, &request, actor).await {
            Ok(order) => {
                db::commit(txn, "orders.create").await?;
                counter!("printshop.orders.created", 1);
                info!(order_id = order.id, order_number = %order.order_number, total = %order.total_price, "Order created");
                self.detail(&*self.db_pool, order, actor.role).await
            }
            Err(e) => {
                warn!(error = %e, "Order creation rolled back");
                Err(e)
            }
        }
    }

    async fn create_in(
        &self,
        txn: &DatabaseTransaction,
        request: &CreateOrderRequest,
        actor: &Actor,
    ) -> Result<OrderModel, ServiceError> {
        let catalog = CatalogRepository::new(txn);
        let orders = OrderRepository::new(txn);

        for assignee in [
            request.assigned_designer,
            request.assigned_master,
            request.assigned_assistant,
        ]
        .into_iter()
        .flatten()
        {
            ensure_user_exists(txn, assignee).await?;
        }

        let mut lines = Vec::with_capacity(request.items.len());
        let mut total_price = Decimal::ZERO;
        let mut material_cost = Decimal::ZERO;

        for item in &request.items {
            let service = catalog
                .find_active_service(item.service_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("Unknown service {}", item.service_id))
                })?;

            let quote = pricing::quote_line(
                &service,
                request.client_type,
                item.quantity,
                item.width,
                item.height,
            )?;

            let material = catalog
                .primary_material(service.id)
                .await?
                .map(|mapping| (mapping.material_id, quote.units * mapping.ratio));
            if let Some((_, required)) = material {
                material_cost += required * service.cost_price;
            }

            total_price += quote.total;
            lines.push(PricedLine {
                request: item,
                quote,
                material,
            });
        }

        let year = Utc::now().year();
        let last = orders
            .last_number_with_prefix(&year_prefix(&self.number_prefix, year))
            .await?;
        let order_number = next_order_number(&self.number_prefix, year, last.as_deref());

        let now = Utc::now();
        let order = orders
            .create(OrderActiveModel {
                order_number: Set(order_number),
                client_name: Set(request.client_name.trim().to_string()),
                client_phone: Set(request.client_phone.trim().to_string()),
                client_type: Set(request.client_type),
                status: Set(OrderStatus::Created),
                total_price: Set(total_price),
                material_cost: Set(material_cost),
                notes: Set(request.notes.clone()),
                design_file: Set(request.design_file.clone()),
                photo_file: Set(request.photo_file.clone()),
                assigned_designer: Set(request.assigned_designer),
                assigned_master: Set(request.assigned_master),
                assigned_assistant: Set(request.assigned_assistant),
                deadline: Set(request.deadline.clone()),
                created_by: Set(actor.user_id),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            })
            .await?;

        // Lines reserve in request order, so a later line sees what earlier
        // lines already took.
        for line in lines {
            if let Some((material_id, required)) = line.material {
                if required > Decimal::ZERO {
                    inventory::reserve_material(txn, material_id, required, order.id, actor.user_id)
                        .await?;
                }
            }

            orders
                .add_item(order_item::ActiveModel {
                    order_id: Set(order.id),
                    service_id: Set(line.request.service_id),
                    material_id: Set(line.material.map(|(id, _)| id)),
                    quantity: Set(line.request.quantity),
                    width: Set(line.request.width),
                    height: Set(line.request.height),
                    unit_price: Set(line.quote.unit_price),
                    total: Set(line.quote.total),
                    material_qty: Set(line.material.map(|(_, q)| q).unwrap_or(Decimal::ZERO)),
                    options: Set(line.request.options.clone()),
                    ..Default::default()
                })
                .await?;
        }

        orders
            .append_history(order.id, None, OrderStatus::Created, actor.user_id, "order created")
            .await?;

        Ok(order)
    }

    #[instrument(skip(self, query), fields(user_id = actor.user_id, role = %actor.role))]
    pub async fn list_orders(
        &self,
        query: OrderListQuery,
        actor: &Actor,
    ) -> Result<OrderList, ServiceError> {
        use order::Column;

        let mut condition = Condition::all().add(visibility(actor));

        match query.status.as_deref().map(str::trim) {
            None | Some("") => {}
            Some("closed") => {
                condition = condition
                    .add(Column::Status.is_in([OrderStatus::Closed, OrderStatus::Cancelled]));
            }
            Some(raw) => condition = condition.add(Column::Status.eq(parse_status(raw)?)),
        }

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(Column::OrderNumber.contains(search))
                    .add(Column::ClientName.contains(search)),
            );
        }

        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let db = &*self.db_pool;
        let repo = OrderRepository::new(db);
        let (models, total) = repo.list(condition, limit, offset).await?;

        let ids: Vec<i32> = models.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<i32, Vec<OrderItemModel>> = HashMap::new();
        for item in repo.items_for_orders(&ids).await? {
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        let orders = models
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                OrderView::for_role(order, items, actor.role)
            })
            .collect();

        Ok(OrderList { orders, total })
    }

    /// Orders outside the caller's visibility are reported as missing.
    #[instrument(skip(self), fields(user_id = actor.user_id))]
    pub async fn get_order(&self, id: i32, actor: &Actor) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db_pool;
        let order = OrderRepository::new(db)
            .find_visible(id, visibility(actor))
            .await?
            .ok_or_else(|| not_found(id))?;
        self.detail(db, order, actor.role).await
    }

    #[instrument(skip(self, request), fields(user_id = actor.user_id))]
    pub async fn update_order(
        &self,
        id: i32,
        request: UpdateOrderRequest,
        actor: &Actor,
    ) -> Result<OrderDetail, ServiceError> {
        request.validate()?;

        let txn = db::begin(&self.db_pool, "orders.update").await?;
        let orders = OrderRepository::new(&txn);
        let order = orders.find_by_id(id).await?.ok_or_else(|| not_found(id))?;

        if order.status.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is {} and can no longer be edited",
                order.order_number, order.status
            )));
        }

        for assignee in [
            request.assigned_designer,
            request.assigned_master,
            request.assigned_assistant,
        ]
        .into_iter()
        .flatten()
        {
            ensure_user_exists(&txn, assignee).await?;
        }

        let mut active: OrderActiveModel = order.into();
        if let Some(name) = request.client_name {
            active.client_name = Set(name.trim().to_string());
        }
        if let Some(phone) = request.client_phone {
            active.client_phone = Set(phone.trim().to_string());
        }
        if let Some(notes) = request.notes {
            active.notes = Set(notes);
        }
        if let Some(deadline) = request.deadline {
            active.deadline = Set(Some(deadline));
        }
        if let Some(designer) = request.assigned_designer {
            active.assigned_designer = Set(Some(designer));
        }
        if let Some(master) = request.assigned_master {
            active.assigned_master = Set(Some(master));
        }
        if let Some(assistant) = request.assigned_assistant {
            active.assigned_assistant = Set(Some(assistant));
        }
        active.updated_at = Set(Utc::now());

        let updated = orders.update(active).await?;
        db::commit(txn, "orders.update").await?;

        info!(order_id = id, "Order updated");
        self.detail(&*self.db_pool, updated, actor.role).await
    }

    /// Applies a status change and its side effects atomically.
    #[instrument(skip(self, request), fields(order_id = id, to = %request.status, user_id = actor.user_id, role = %actor.role))]
    pub async fn transition_status(
        &self,
        id: i32,
        request: TransitionRequest,
        actor: &Actor,
    ) -> Result<OrderDetail, ServiceError> {
        let target = parse_status(request.status.trim())?;

        let txn = db::begin(&self.db_pool, "orders.transition").await?;
        let orders = OrderRepository::new(&txn);
        let order = orders
            .find_visible(id, visibility(actor))
            .await?
            .ok_or_else(|| not_found(id))?;
        let current = order.status;

        order_state::authorize_transition(current, target, actor.role).map_err(|e| {
            warn!(from = %current, to = %target, "Transition denied");
            e
        })?;

        if !orders.compare_and_set_status(id, current, target).await? {
            return Err(ServiceError::Conflict(format!(
                "Order {} changed status concurrently",
                order.order_number
            )));
        }

        for effect in order_state::effects_for(current, target) {
            match effect {
                SideEffect::ConsumeReservations => {
                    inventory::consume_order_reservations(&txn, id, actor.user_id).await?
                }
                SideEffect::ReleaseReservations => {
                    inventory::release_order_reservations(&txn, id, actor.user_id).await?
                }
                SideEffect::QueueReadyNotification => {
                    orders
                        .queue_notification(
                            id,
                            crate::entities::client_notification::CHANNEL_MANUAL,
                            &ready_message(&order.order_number),
                        )
                        .await?;
                }
            }
        }

        let note = request
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} -> {}", current, target));
        orders
            .append_history(id, Some(current), target, actor.user_id, &note)
            .await?;

        let updated = orders.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        db::commit(txn, "orders.transition").await.map_err(|e| {
            error!(error = %e, order_id = id, "Transition commit failed");
            e
        })?;

        counter!("printshop.orders.transitions", 1, "from" => current.as_str(), "to" => target.as_str());
        info!(order_id = id, from = %current, to = %target, "Order status changed");
        self.detail(&*self.db_pool, updated, actor.role).await
    }

    /// Queues a client notification on each requested channel.
    #[instrument(skip(self, request), fields(order_id = id, user_id = actor.user_id))]
    pub async fn notify_client(
        &self,
        id: i32,
        request: NotifyRequest,
        actor: &Actor,
    ) -> Result<NotifyResponse, ServiceError> {
        request.validate()?;

        let channels: Vec<String> = request
            .channels
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        let channels = if channels.is_empty() {
            vec![crate::entities::client_notification::CHANNEL_MANUAL.to_string()]
        } else {
            channels
        };

        let txn = db::begin(&self.db_pool, "orders.notify").await?;
        let orders = OrderRepository::new(&txn);
        let order = orders.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        let message = request
            .message
            .unwrap_or_else(|| ready_message(&order.order_number));

        let mut notifications = Vec::with_capacity(channels.len());
        for channel in channels {
            let queued = orders.queue_notification(id, &channel, &message).await?;
            notifications.push(QueuedNotification {
                id: queued.id,
                channel: queued.channel,
            });
        }
        db::commit(txn, "orders.notify").await?;

        counter!("printshop.notifications.queued", notifications.len() as u64);
        info!(order_id = id, count = notifications.len(), "Client notifications queued");
        Ok(NotifyResponse {
            ok: true,
            notifications,
        })
    }

    async fn detail<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        order: OrderModel,
        role: Role,
    ) -> Result<OrderDetail, ServiceError> {
        let repo = OrderRepository::new(conn);
        let items = repo.items(order.id).await?;
        let history = repo.history(order.id).await?;
        Ok(OrderDetail {
            order: OrderView::for_role(order, items, role),
            history: history.into_iter().map(HistoryView::from).collect(),
        })
    }
}

async fn ensure_user_exists(txn: &DatabaseTransaction, user_id: i32) -> Result<(), ServiceError> {
    UserRepository::new(txn)
        .find_by_id(user_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::ValidationError(format!("Unknown user {}", user_id)))
}
