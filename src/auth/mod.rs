/*!
 * # Authentication and Authorization
 *
 * Staff sign in with a username and password and receive an HS256 JWT that
 * carries their id, username and role. Every route below `/api/v1` except
 * login goes through [`auth_middleware`], which validates the bearer token,
 * reloads the account and inserts an [`AuthUser`] into the request
 * extensions. Identity and role always come from the stored account, so a
 * deactivated or re-roled user is cut off on their next request. Route
 * groups then declare which roles may reach them with
 * [`AuthRouterExt::with_roles`].
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::db::DbPool;
use crate::entities::user::Model as UserModel;
use crate::entities::Role;
use crate::repositories::UserRepository;
use crate::services::Actor;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signed-in staff member as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, access_token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            access_token_expiration,
        }
    }
}

/// Issues and validates access tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &UserModel) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    pub fn expires_in_secs(&self) -> u64 {
        self.config.access_token_expiration.as_secs()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::AccountDisabled => (
                StatusCode::UNAUTHORIZED,
                "AUTH_ACCOUNT_DISABLED",
                "Account is disabled".to_string(),
            ),
            Self::TokenCreation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                msg.clone(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Rejects callers whose role is not in `allowed`.
pub async fn role_middleware(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_any_role(allowed) {
        warn!(user_id = user.user_id, role = %user.role, path = %request.uri().path(), "Role not permitted");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let extensions = request.extensions();
    let (auth_service, db) = match (
        extensions.get::<Arc<AuthService>>(),
        extensions.get::<Arc<DbPool>>(),
    ) {
        (Some(service), Some(db)) => (service.clone(), db.clone()),
        _ => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    let authenticated = match extract_auth_from_headers(request.headers(), &auth_service) {
        Ok(claimed) => load_account(&db, &claimed).await,
        Err(e) => Err(e),
    };

    match authenticated {
        Ok(user) => {
            debug!(user_id = user.user_id, role = %user.role, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Identity claimed by a bearer token.
fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingAuth)?;

    let claims = auth_service.validate_token(token)?;
    let user_id = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

    Ok(AuthUser {
        user_id,
        username: claims.username,
        role: claims.role,
    })
}

/// Resolves a token's identity against the stored account. Deleted accounts
/// invalidate the token; inactive ones are refused.
async fn load_account(db: &DbPool, claimed: &AuthUser) -> Result<AuthUser, AuthError> {
    let user = UserRepository::new(db)
        .find_by_id(claimed.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = claimed.user_id, "Account lookup failed");
            AuthError::InternalError("Account lookup failed".to_string())
        })?
        .ok_or(AuthError::InvalidToken)?;

    if !user.is_active {
        warn!(user_id = user.id, "Token presented for a disabled account");
        return Err(AuthError::AccountDisabled);
    }
    if user.role != claimed.role {
        debug!(user_id = user.id, token_role = %claimed.role, role = %user.role, "Role changed since sign-in");
    }

    Ok(AuthUser {
        user_id: user.id,
        username: user.username,
        role: user.role,
    })
}

pub const ALL_ROLES: &[Role] = &[
    Role::Director,
    Role::Manager,
    Role::Designer,
    Role::Master,
    Role::Assistant,
];
pub const MANAGEMENT: &[Role] = &[Role::Director, Role::Manager];
pub const STOCK_VIEWERS: &[Role] = &[Role::Director, Role::Manager, Role::Master];
pub const DIRECTOR_ONLY: &[Role] = &[Role::Director];

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_roles(self, roles: &'static [Role]) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_roles(self, roles: &'static [Role]) -> Self {
        self.layer(axum::middleware::from_fn_with_state(roles, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "an-adequately-long-test-secret-0123456789".to_string(),
            Duration::from_secs(3600),
        ))
    }

    fn user(role: Role) -> UserModel {
        UserModel {
            id: 7,
            username: "master1".into(),
            password_hash: String::new(),
            full_name: "Master".into(),
            role,
            phone: None,
            is_active: true,
            lang: "ru".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trips_identity_and_role() {
        let auth = service();
        let token = auth.generate_token(&user(Role::Master)).unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.username, "master1");
        assert_eq!(claims.role, Role::Master);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = AuthService::new(AuthConfig::new(
            "a-completely-different-secret-abcdefghij".to_string(),
            Duration::from_secs(3600),
        ));
        let token = other.generate_token(&user(Role::Director)).unwrap();
        assert_matches!(service().validate_token(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let auth = service();
        let claims = Claims {
            sub: "7".into(),
            username: "master1".into(),
            role: Role::Master,
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(auth.config.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert_matches!(auth.validate_token(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn bearer_header_is_required() {
        let auth = service();
        let mut headers = HeaderMap::new();
        assert_matches!(
            extract_auth_from_headers(&headers, &auth),
            Err(AuthError::MissingAuth)
        );

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_matches!(
            extract_auth_from_headers(&headers, &auth),
            Err(AuthError::MissingAuth)
        );

        let token = auth.generate_token(&user(Role::Assistant)).unwrap();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        let authed = extract_auth_from_headers(&headers, &auth).unwrap();
        assert_eq!(authed.user_id, 7);
        assert_eq!(authed.actor(), Actor::new(7, Role::Assistant));
    }

    #[test]
    fn role_sets() {
        assert!(ALL_ROLES.contains(&Role::Assistant));
        assert!(!MANAGEMENT.contains(&Role::Master));
        assert!(STOCK_VIEWERS.contains(&Role::Master));
        assert_eq!(DIRECTOR_ONLY, &[Role::Director]);
    }
}
