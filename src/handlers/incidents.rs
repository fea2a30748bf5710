use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, patch},
    Router,
};

use crate::auth::{AuthRouterExt, AuthUser, DIRECTOR_ONLY, MANAGEMENT};
use crate::handlers::common::{created, Created};
use crate::services::incidents::{CreateIncidentRequest, IncidentListQuery, IncidentView};
use crate::{errors::ServiceError, ApiResponse, ApiResult, AppState};

pub fn incident_routes() -> Router<AppState> {
    let records = Router::new()
        .route("/incidents", get(list_incidents).post(create_incident))
        .with_roles(MANAGEMENT);
    let review = Router::new()
        .route("/incidents/:id/review", patch(review_incident))
        .with_roles(DIRECTOR_ONLY);
    records.merge(review)
}

#[utoipa::path(
    post,
    path = "/api/v1/incidents",
    summary = "Record incident",
    description = "Records a staff incident; defects with waste write off the order's material",
    request_body = CreateIncidentRequest,
    responses(
        (status = 201, description = "Incident recorded", body = ApiResponse<IncidentView>),
        (status = 400, description = "Unknown user or invalid amounts", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "incidents"
)]
pub async fn create_incident(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateIncidentRequest>,
) -> Result<Created<IncidentView>, ServiceError> {
    let incident = state
        .services
        .incidents
        .create(request, auth_user.user_id)
        .await?;
    Ok(created(incident))
}

#[utoipa::path(
    get,
    path = "/api/v1/incidents",
    summary = "List incidents",
    description = "Newest first, at most 200; filter by status, staff member, day range or deductions",
    params(IncidentListQuery),
    responses(
        (status = 200, description = "Incidents", body = ApiResponse<Vec<IncidentView>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "incidents"
)]
pub async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<IncidentListQuery>,
) -> ApiResult<Vec<IncidentView>> {
    let incidents = state.services.incidents.list(query).await?;
    Ok(Json(ApiResponse::success(incidents)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/incidents/{id}/review",
    summary = "Review incident",
    params(("id" = i32, Path, description = "Incident id")),
    responses(
        (status = 200, description = "Incident reviewed", body = ApiResponse<IncidentView>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Incident not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "incidents"
)]
pub async fn review_incident(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<IncidentView> {
    let incident = state
        .services
        .incidents
        .review(id, auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(incident)))
}
