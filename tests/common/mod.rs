#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use printshop_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{material::Model as MaterialModel, service::Model as ServiceModel, Role},
    repositories::{CatalogRepository, MaterialRepository, UserRepository},
    services::{
        inventory::StockAdjustment,
        seed::seed_defaults,
        users::{create_user, NewUser},
    },
    AppState,
};

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const STAFF_PASSWORD: &str = "staff-password";

/// A signed-in staff member.
#[derive(Debug, Clone)]
pub struct Staff {
    pub id: i32,
    pub role: Role,
    pub token: String,
}

/// Application backed by a seeded SQLite file in a temporary directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub director: Staff,
    pub manager: Staff,
    pub designer: Staff,
    pub master: Staff,
    pub assistant: Staff,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("printshop.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        seed_defaults(&pool, Some(ADMIN_PASSWORD))
            .await
            .expect("failed to seed defaults");

        let admin = UserRepository::new(&pool)
            .find_by_username("admin")
            .await
            .expect("lookup admin")
            .expect("seeded admin");

        let auth = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            Duration::from_secs(3600),
        )));

        let mut staff = Vec::new();
        for (username, role) in [
            ("manager", Role::Manager),
            ("designer", Role::Designer),
            ("master", Role::Master),
            ("assistant", Role::Assistant),
        ] {
            let user = create_user(
                &pool,
                NewUser {
                    username: username.to_string(),
                    password: STAFF_PASSWORD.to_string(),
                    full_name: format!("Test {}", username),
                    role,
                    phone: None,
                },
            )
            .await
            .expect("create staff user");
            staff.push(Staff {
                id: user.id,
                role,
                token: auth.generate_token(&user).expect("token"),
            });
        }

        let director = Staff {
            id: admin.id,
            role: Role::Director,
            token: auth.generate_token(&admin).expect("token"),
        };

        let state = AppState::new(Arc::new(pool), cfg, auth);
        let router = printshop_api::app_router(state.clone());

        let mut staff = staff.into_iter();
        let mut next = || staff.next().expect("staff member");
        let (manager, designer, master, assistant) = (next(), next(), next(), next());

        Self {
            router,
            state,
            director,
            manager,
            designer,
            master,
            assistant,
            _dir: dir,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request as `who`, returning the status and the parsed JSON body.
    pub async fn call(
        &self,
        who: &Staff,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, Some(&who.token)).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub fn db(&self) -> &printshop_api::db::DbPool {
        &self.state.db
    }

    pub async fn service(&self, code: &str) -> ServiceModel {
        CatalogRepository::new(self.db())
            .find_service_by_code(code)
            .await
            .expect("service lookup")
            .expect("seeded service")
    }

    pub async fn material(&self, code: &str) -> MaterialModel {
        MaterialRepository::new(self.db())
            .find_by_code(code)
            .await
            .expect("material lookup")
            .expect("seeded material")
    }

    /// Books `quantity` of the material into stock as the director.
    pub async fn stock(&self, code: &str, quantity: Decimal) -> MaterialModel {
        let material = self.material(code).await;
        self.state
            .services
            .inventory
            .receive(
                material.id,
                StockAdjustment {
                    quantity,
                    note: String::new(),
                },
                self.director.id,
            )
            .await
            .expect("receive stock");
        self.material(code).await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

/// Reads a decimal serialized as a JSON string (or number).
pub fn dec_of(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
