use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::{AuthRouterExt, AuthUser, DIRECTOR_ONLY, MANAGEMENT, STOCK_VIEWERS};
use crate::services::inventory::{
    LedgerEntryView, MaterialView, ReconciliationLine, StockAdjustment,
};
use crate::{ApiResponse, ApiResult, AppState};

pub fn inventory_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/inventory", get(list_materials))
        .with_roles(STOCK_VIEWERS);

    let manage = Router::new()
        .route("/inventory/alerts", get(low_stock_alerts))
        .route("/inventory/:id/ledger", get(material_ledger))
        .route("/inventory/:id/receive", post(receive_material))
        .route("/inventory/:id/correction", post(correct_material))
        .with_roles(MANAGEMENT);

    let audit = Router::new()
        .route("/inventory/reconciliation", get(reconciliation))
        .with_roles(DIRECTOR_ONLY);

    read.merge(manage).merge(audit)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LedgerQuery {
    /// Page size (default 50)
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    summary = "List materials",
    description = "Stock levels with available quantity and low-stock flag",
    responses(
        (status = 200, description = "Materials", body = ApiResponse<Vec<MaterialView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn list_materials(State(state): State<AppState>) -> ApiResult<Vec<MaterialView>> {
    let materials = state.services.inventory.list_materials().await?;
    Ok(Json(ApiResponse::success(materials)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/alerts",
    summary = "Low-stock alerts",
    description = "Materials whose available quantity is below their threshold",
    responses(
        (status = 200, description = "Materials running low", body = ApiResponse<Vec<MaterialView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn low_stock_alerts(State(state): State<AppState>) -> ApiResult<Vec<MaterialView>> {
    let materials = state.services.inventory.low_stock_alerts().await?;
    Ok(Json(ApiResponse::success(materials)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}/ledger",
    summary = "Material ledger",
    description = "Stock movements of a material, newest first",
    params(("id" = i32, Path, description = "Material ID"), LedgerQuery),
    responses(
        (status = 200, description = "Ledger entries", body = ApiResponse<Vec<LedgerEntryView>>),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn material_ledger(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<Vec<LedgerEntryView>> {
    let entries = state
        .services
        .inventory
        .ledger(id, query.limit, query.offset)
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/receive",
    summary = "Receive material",
    description = "Adds a positive quantity to stock on hand",
    params(("id" = i32, Path, description = "Material ID")),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Updated material", body = ApiResponse<MaterialView>),
        (status = 400, description = "Quantity must be positive", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn receive_material(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(input): Json<StockAdjustment>,
) -> ApiResult<MaterialView> {
    let material = state
        .services
        .inventory
        .receive(id, input, auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(material)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/correction",
    summary = "Correct stock",
    description = "Signed stock correction; may not leave less than zero or than is reserved",
    params(("id" = i32, Path, description = "Material ID")),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Updated material", body = ApiResponse<MaterialView>),
        (status = 400, description = "Zero quantity or correction below reserved stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn correct_material(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(input): Json<StockAdjustment>,
) -> ApiResult<MaterialView> {
    let material = state
        .services
        .inventory
        .correct(id, input, auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(material)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/reconciliation",
    summary = "Reservation reconciliation",
    description = "Compares reserved stock with outstanding reservations in the ledger",
    responses(
        (status = 200, description = "Per-material report", body = ApiResponse<Vec<ReconciliationLine>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "inventory"
)]
pub async fn reconciliation(State(state): State<AppState>) -> ApiResult<Vec<ReconciliationLine>> {
    let report = state.services.inventory.reconciliation().await?;
    Ok(Json(ApiResponse::success(report)))
}
