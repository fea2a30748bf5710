use axum::{extract::State, response::Json, routing::get, routing::post, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{AuthRouterExt, AuthUser};
use crate::services::users::UserView;
use crate::{errors::ServiceError, ApiResponse, ApiResult, AppState};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserView,
}

pub fn auth_routes() -> Router<AppState> {
    let public = Router::new().route("/auth/login", post(login));
    let session = Router::new().route("/auth/me", get(me)).with_auth();
    public.merge(session)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    summary = "Sign in",
    description = "Exchanges a username and password for a bearer token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid username or password", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    request.validate()?;

    let user = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;
    let token = state
        .auth
        .generate_token(&user)
        .map_err(|e| ServiceError::InternalError(e.to_string()))?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.auth.expires_in_secs(),
        user: user.into(),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    summary = "Current user",
    responses(
        (status = 200, description = "The signed-in user", body = ApiResponse<UserView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn me(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<UserView> {
    let user = state.services.users.get(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}
