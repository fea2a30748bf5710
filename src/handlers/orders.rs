use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, patch, post},
    Router,
};

use crate::auth::{AuthRouterExt, AuthUser, ALL_ROLES, MANAGEMENT};
use crate::handlers::common::{created, Created};
use crate::services::orders::{
    CreateOrderRequest, NotifyRequest, NotifyResponse, OrderDetail, OrderList, OrderListQuery,
    TransitionRequest, UpdateOrderRequest,
};
use crate::{errors::ServiceError, ApiResponse, ApiResult, AppState};

pub fn order_routes() -> Router<AppState> {
    let any_staff = Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", patch(update_order_status))
        .with_roles(ALL_ROLES);

    let management = Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", axum::routing::put(update_order))
        .route("/orders/:id/notify", post(notify_client))
        .with_roles(MANAGEMENT);

    any_staff.merge(management)
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Orders visible to the caller's role, newest first",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<OrderList>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<OrderList> {
    let orders = state
        .services
        .orders
        .list_orders(query, &auth_user.actor())
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Prices the items, reserves their materials and opens the order in status `created`",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = ApiResponse<OrderDetail>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Unknown service, missing dimensions or insufficient material", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order number collision", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Created<OrderDetail>, ServiceError> {
    let order = state
        .services
        .orders
        .create_order(request, &auth_user.actor())
        .await?;
    Ok(created(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    description = "Order with its items and status history",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderDetail>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<OrderDetail> {
    let order = state.services.orders.get_order(id, &auth_user.actor()).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    summary = "Update order",
    description = "Edit client details, notes, deadline and assignees of an open order",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderDetail>),
        (status = 400, description = "Order is closed or cancelled", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateOrderRequest>,
) -> ApiResult<OrderDetail> {
    let order = state
        .services
        .orders
        .update_order(id, request, &auth_user.actor())
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/orders/{id}/status",
    summary = "Change order status",
    description = "Moves the order along the status table. Directors may force any move.",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<OrderDetail>),
        (status = 400, description = "Unknown status or transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Status changed concurrently", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(request): Json<TransitionRequest>,
) -> ApiResult<OrderDetail> {
    let order = state
        .services
        .orders
        .transition_status(id, request, &auth_user.actor())
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/notify",
    summary = "Notify client",
    description = "Queues a client notification per channel (default `manual`)",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = NotifyRequest,
    responses(
        (status = 200, description = "Notifications queued", body = ApiResponse<NotifyResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn notify_client(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    body: Option<Json<NotifyRequest>>,
) -> ApiResult<NotifyResponse> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let queued = state
        .services
        .orders
        .notify_client(id, request, &auth_user.actor())
        .await?;
    Ok(Json(ApiResponse::success(queued)))
}
