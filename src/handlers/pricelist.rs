use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, put},
    Router,
};

use crate::auth::{AuthRouterExt, AuthUser, ALL_ROLES, DIRECTOR_ONLY, MANAGEMENT};
use crate::services::pricelist::{PriceHistoryView, PriceUpdate, ServiceView};
use crate::{ApiResponse, ApiResult, AppState};

pub fn pricelist_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/pricelist", get(list_services))
        .with_roles(ALL_ROLES);

    let history = Router::new()
        .route("/pricelist/:id/history", get(price_history))
        .with_roles(MANAGEMENT);

    let edit = Router::new()
        .route("/pricelist/:id", put(update_prices))
        .with_roles(DIRECTOR_ONLY);

    read.merge(history).merge(edit)
}

#[utoipa::path(
    get,
    path = "/api/v1/pricelist",
    summary = "Price list",
    description = "Active services by category; cost price is shown to directors only",
    responses(
        (status = 200, description = "Services", body = ApiResponse<Vec<ServiceView>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "pricelist"
)]
pub async fn list_services(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Vec<ServiceView>> {
    let services = state.services.pricelist.list(auth_user.role).await?;
    Ok(Json(ApiResponse::success(services)))
}

#[utoipa::path(
    put,
    path = "/api/v1/pricelist/{id}",
    summary = "Update prices",
    description = "Archives the current prices and sets new ones",
    params(("id" = i32, Path, description = "Service ID")),
    request_body = PriceUpdate,
    responses(
        (status = 200, description = "Updated service", body = ApiResponse<ServiceView>),
        (status = 400, description = "Negative price", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Service not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "pricelist"
)]
pub async fn update_prices(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(update): Json<PriceUpdate>,
) -> ApiResult<ServiceView> {
    let service = state
        .services
        .pricelist
        .update_prices(id, update, auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    get,
    path = "/api/v1/pricelist/{id}/history",
    summary = "Price history",
    description = "Previous prices of a service, newest first",
    params(("id" = i32, Path, description = "Service ID")),
    responses(
        (status = 200, description = "History entries", body = ApiResponse<Vec<PriceHistoryView>>),
        (status = 404, description = "Service not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "pricelist"
)]
pub async fn price_history(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Vec<PriceHistoryView>> {
    let history = state.services.pricelist.history(id).await?;
    Ok(Json(ApiResponse::success(history)))
}
