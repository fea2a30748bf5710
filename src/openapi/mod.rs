use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Print Shop API",
        version = "1.0.0",
        description = r#"
# Print Shop Order Engine

Orders, material stock and the price list of a print shop.

## Authentication

Sign in with `POST /api/v1/auth/login` and send the returned token on every
other request:

```
Authorization: Bearer <token>
```

## Roles

`director`, `manager`, `designer`, `master` and `assistant`. Production roles
only see orders assigned to them or waiting at their stage.

## Error Handling

Failures return an `ErrorResponse` with the HTTP status category, a message
and the request id echoed from `x-request-id`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Sign-in endpoints"),
        (name = "orders", description = "Order lifecycle endpoints"),
        (name = "inventory", description = "Material stock endpoints"),
        (name = "pricelist", description = "Service catalog endpoints"),
        (name = "incidents", description = "Staff incident endpoints"),
    ),
    paths(
        // Auth
        crate::handlers::auth::login,
        crate::handlers::auth::me,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::notify_client,

        // Inventory
        crate::handlers::inventory::list_materials,
        crate::handlers::inventory::low_stock_alerts,
        crate::handlers::inventory::material_ledger,
        crate::handlers::inventory::receive_material,
        crate::handlers::inventory::correct_material,
        crate::handlers::inventory::reconciliation,

        // Price list
        crate::handlers::pricelist::list_services,
        crate::handlers::pricelist::update_prices,
        crate::handlers::pricelist::price_history,

        // Incidents
        crate::handlers::incidents::create_incident,
        crate::handlers::incidents::list_incidents,
        crate::handlers::incidents::review_incident,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::entities::OrderStatus,
            crate::entities::Role,
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_group() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        for path in [
            "/api/v1/auth/login",
            "/api/v1/orders/{id}/status",
            "/api/v1/inventory/reconciliation",
            "/api/v1/pricelist/{id}/history",
            "/api/v1/incidents",
            "/api/v1/incidents/{id}/review",
        ] {
            assert!(json.contains(path), "missing {path}");
        }
        assert!(json.contains("\"Bearer\""));
    }
}
