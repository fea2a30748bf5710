//! End-to-end order lifecycle: creation with reservation, transitions and
//! their stock side effects, numbering and role visibility.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Datelike, Utc};
use common::{dec_of, Staff, TestApp};
use printshop_api::entities::material_ledger::LedgerAction;
use printshop_api::repositories::{CatalogRepository, MaterialRepository, OrderRepository};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn banner_order(service_id: i32, width: &str, height: &str) -> Value {
    json!({
        "client_name": "Cafe Ala-Too",
        "client_phone": "+996 555 000 111",
        "items": [{
            "service_id": service_id,
            "quantity": "1",
            "width": width,
            "height": height,
        }]
    })
}

async fn create(app: &TestApp, who: &Staff, body: Value) -> (StatusCode, Value) {
    app.call(who, Method::POST, "/api/v1/orders", Some(body)).await
}

async fn assert_reconciled(app: &TestApp) {
    let (status, report) = app
        .call(&app.director, Method::GET, "/api/v1/inventory/reconciliation", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let lines = report["data"].as_array().expect("report lines");
    assert!(lines.iter().all(|line| line["consistent"] == true), "{report}");
}

async fn transition(app: &TestApp, who: &Staff, order_id: i64, status: &str) -> (StatusCode, Value) {
    app.call(
        who,
        Method::PATCH,
        &format!("/api/v1/orders/{}/status", order_id),
        Some(json!({ "status": status })),
    )
    .await
}

#[tokio::test]
async fn creating_an_order_prices_lines_and_reserves_material() {
    let app = TestApp::new().await;
    let banner = app.service("banner").await;
    app.stock("banner_roll", dec!(10)).await;

    let (status, body) = create(&app, &app.manager, banner_order(banner.id, "2", "3")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let order = &body["data"];
    assert_eq!(order["status"], "created");
    assert_eq!(dec_of(&order["total_price"]), dec!(2700));
    assert!(order.get("material_cost").is_none(), "cost is director-only");
    assert_eq!(order["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(dec_of(&order["items"][0]["material_qty"]), dec!(6));
    assert_eq!(order["history"][0]["note"], "order created");

    let year = Utc::now().year();
    assert_eq!(order["order_number"], format!("POL-{}-001", year));

    let roll = app.material("banner_roll").await;
    assert_eq!(roll.quantity, dec!(10));
    assert_eq!(roll.reserved, dec!(6));

    let order_id = order["id"].as_i64().expect("order id") as i32;
    let ledger = MaterialRepository::new(app.db())
        .ledger_for_order(order_id)
        .await
        .expect("ledger");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].action, LedgerAction::Reserve);
    assert_eq!(ledger[0].quantity, dec!(-6));

    // The director sees the material cost of the same order.
    let (status, body) = app
        .call(&app.director, Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec_of(&body["data"]["material_cost"]), dec!(900));
}

#[tokio::test]
async fn order_numbers_increase_within_the_year() {
    let app = TestApp::new().await;
    let menu = app.service("menu_a4").await;
    let year = Utc::now().year();

    for expected in ["001", "002", "003"] {
        let (status, body) = create(
            &app,
            &app.manager,
            json!({
                "client_name": "School 5",
                "items": [{ "service_id": menu.id, "quantity": "10" }]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(
            body["data"]["order_number"],
            format!("POL-{}-{}", year, expected)
        );
    }
}

#[tokio::test]
async fn oversold_order_leaves_no_trace() {
    let app = TestApp::new().await;
    let banner = app.service("banner").await;
    let vinyl = app.service("vinyl").await;
    app.stock("banner_roll", dec!(5)).await;
    app.stock("vinyl_roll", dec!(10)).await;

    let (status, body) = create(
        &app,
        &app.manager,
        json!({
            "client_name": "Bakery",
            "items": [
                { "service_id": vinyl.id, "quantity": "1", "width": "1", "height": "2" },
                { "service_id": banner.id, "quantity": "1", "width": "2", "height": "3" }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("Insufficient"), "{message}");

    assert_eq!(app.material("vinyl_roll").await.reserved, dec!(0));
    assert_eq!(app.material("banner_roll").await.reserved, dec!(0));

    let (status, body) = app
        .call(&app.director, Method::GET, "/api/v1/orders", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);

    // Only the receipt is on the ledger.
    let (_, ledger) = app
        .call(
            &app.director,
            Method::GET,
            &format!("/api/v1/inventory/{}/ledger", app.material("banner_roll").await.id),
            None,
        )
        .await;
    let entries = ledger["data"].as_array().expect("ledger entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "receive");
}

#[tokio::test]
async fn cancelling_before_production_releases_the_reservation() {
    let app = TestApp::new().await;
    let banner = app.service("banner").await;
    app.stock("banner_roll", dec!(10)).await;

    let (_, body) = create(&app, &app.manager, banner_order(banner.id, "2", "3")).await;
    let order_id = body["data"]["id"].as_i64().expect("order id");

    let (status, body) = transition(&app, &app.manager, order_id, "cancelled").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");

    let roll = app.material("banner_roll").await;
    assert_eq!(roll.quantity, dec!(10));
    assert_eq!(roll.reserved, dec!(0));

    let ledger = MaterialRepository::new(app.db())
        .ledger_for_order(order_id as i32)
        .await
        .expect("ledger");
    let actions: Vec<_> = ledger.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![LedgerAction::Reserve, LedgerAction::Unreserve]);
}

#[tokio::test]
async fn production_consumes_and_later_cancel_changes_nothing() {
    let app = TestApp::new().await;
    let banner = app.service("banner").await;
    app.stock("banner_roll", dec!(10)).await;

    let (_, body) = create(&app, &app.manager, banner_order(banner.id, "2", "3")).await;
    let order_id = body["data"]["id"].as_i64().expect("order id");

    let (status, _) = transition(&app, &app.manager, order_id, "production").await;
    assert_eq!(status, StatusCode::OK);
    let roll = app.material("banner_roll").await;
    assert_eq!(roll.quantity, dec!(4));
    assert_eq!(roll.reserved, dec!(0));

    // Re-entering production is rejected and moves no stock.
    let (status, _) = transition(&app, &app.manager, order_id, "production").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = transition(&app, &app.manager, order_id, "cancelled").await;
    assert_eq!(status, StatusCode::OK);
    let roll = app.material("banner_roll").await;
    assert_eq!(roll.quantity, dec!(4));
    assert_eq!(roll.reserved, dec!(0));

    assert_reconciled(&app).await;
}

#[tokio::test]
async fn forced_detour_into_production_still_consumes() {
    let app = TestApp::new().await;
    let banner = app.service("banner").await;
    app.stock("banner_roll", dec!(10)).await;

    let (_, body) = create(&app, &app.manager, banner_order(banner.id, "2", "3")).await;
    let order_id = body["data"]["id"].as_i64().expect("order id");

    let (status, _) = transition(&app, &app.director, order_id, "defect").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.material("banner_roll").await.reserved, dec!(6));

    let (status, body) = transition(&app, &app.director, order_id, "production").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let roll = app.material("banner_roll").await;
    assert_eq!(roll.quantity, dec!(4));
    assert_eq!(roll.reserved, dec!(0));

    // A second trip through production has nothing left to consume.
    transition(&app, &app.director, order_id, "design").await;
    let (status, _) = transition(&app, &app.director, order_id, "production").await;
    assert_eq!(status, StatusCode::OK);
    let roll = app.material("banner_roll").await;
    assert_eq!(roll.quantity, dec!(4));
    assert_eq!(roll.reserved, dec!(0));

    let actions: Vec<_> = MaterialRepository::new(app.db())
        .ledger_for_order(order_id as i32)
        .await
        .expect("ledger")
        .iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec![LedgerAction::Reserve, LedgerAction::Consume]);
    assert_reconciled(&app).await;
}

#[tokio::test]
async fn later_line_sees_earlier_reservation_of_the_same_material() {
    let app = TestApp::new().await;
    let banner = app.service("banner").await;
    let roll = app.stock("banner_roll", dec!(10)).await;

    let line = json!({ "service_id": banner.id, "quantity": "1", "width": "2", "height": "3" });
    let (status, body) = create(
        &app,
        &app.manager,
        json!({ "client_name": "Two banners", "items": [line.clone(), line] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("available 4.0, required 6.0"), "{message}");

    let roll_after = app.material("banner_roll").await;
    assert_eq!(roll_after.reserved, dec!(0));
    assert_eq!(roll_after.quantity, dec!(10));

    let ledger = MaterialRepository::new(app.db())
        .ledger_page(roll.id, 50, 0)
        .await
        .expect("ledger");
    assert!(ledger.iter().all(|e| e.action == LedgerAction::Receive));
}

#[tokio::test]
async fn unknown_services_and_missing_dimensions_are_rejected() {
    let app = TestApp::new().await;
    let banner = app.service("banner").await;
    app.stock("banner_roll", dec!(10)).await;

    let (status, body) = create(
        &app,
        &app.manager,
        json!({
            "client_name": "Ghost",
            "items": [{ "service_id": 9999, "quantity": "1" }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("Unknown service"));

    let (status, body) = create(
        &app,
        &app.manager,
        json!({
            "client_name": "No size",
            "items": [{ "service_id": banner.id, "quantity": "1", "width": "2" }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("missing dimensions"));

    assert_eq!(app.material("banner_roll").await.reserved, dec!(0));
}

#[tokio::test]
async fn zero_material_requirement_is_not_reserved() {
    let app = TestApp::new().await;
    let table = app.service("table").await;
    let roll = app.material("banner_roll").await;
    CatalogRepository::new(app.db())
        .map_material(table.id, roll.id, dec!(0))
        .await
        .expect("map material");

    let (status, body) = create(
        &app,
        &app.manager,
        json!({
            "client_name": "Office",
            "items": [{ "service_id": table.id, "quantity": "2" }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let ledger = MaterialRepository::new(app.db())
        .ledger_page(roll.id, 50, 0)
        .await
        .expect("ledger");
    assert!(ledger.is_empty());
    assert_eq!(app.material("banner_roll").await.reserved, dec!(0));
}

#[tokio::test]
async fn directors_may_force_edges_managers_may_not() {
    let app = TestApp::new().await;
    let menu = app.service("menu_a4").await;
    let order = json!({
        "client_name": "Hotel",
        "items": [{ "service_id": menu.id, "quantity": "5" }]
    });

    let (_, first) = create(&app, &app.manager, order.clone()).await;
    let first_id = first["data"]["id"].as_i64().expect("order id");
    let (status, body) = transition(&app, &app.manager, first_id, "ready").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("not allowed for role 'manager'"));

    let (status, body) = transition(&app, &app.director, first_id, "ready").await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // Reaching ready queues the pickup notification.
    let notifications = OrderRepository::new(app.db())
        .notifications(first_id as i32)
        .await
        .expect("notifications");
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].message.contains("is ready"));

    let (status, _) = transition(&app, &app.director, first_id, "ready").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "same-status moves are never allowed");
}

#[tokio::test]
async fn production_staff_only_see_their_stage() {
    let app = TestApp::new().await;
    let menu = app.service("menu_a4").await;

    let (_, body) = create(
        &app,
        &app.manager,
        json!({
            "client_name": "Gym",
            "items": [{ "service_id": menu.id, "quantity": "5" }]
        }),
    )
    .await;
    let order_id = body["data"]["id"].as_i64().expect("order id");
    let path = format!("/api/v1/orders/{}", order_id);

    let (status, _) = app.call(&app.designer, Method::GET, &path, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = transition(&app, &app.designer, order_id, "production").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    transition(&app, &app.manager, order_id, "design").await;

    let (status, _) = app.call(&app.designer, Method::GET, &path, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call(&app.master, Method::GET, &path, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = app
        .call(&app.assistant, Method::GET, "/api/v1/orders", None)
        .await;
    assert_eq!(list["data"]["total"], 0);

    let (status, body) = transition(&app, &app.designer, order_id, "production").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let history = body["data"]["history"].as_array().expect("history");
    assert_eq!(history.len(), 3);
    assert_eq!(history[2]["note"], "design -> production");
}

#[tokio::test]
async fn closed_orders_cannot_be_edited() {
    let app = TestApp::new().await;
    let menu = app.service("menu_a4").await;

    let (_, body) = create(
        &app,
        &app.manager,
        json!({
            "client_name": "Clinic",
            "items": [{ "service_id": menu.id, "quantity": "5" }]
        }),
    )
    .await;
    let order_id = body["data"]["id"].as_i64().expect("order id");
    let path = format!("/api/v1/orders/{}", order_id);

    let (status, body) = app
        .call(&app.manager, Method::PUT, &path, Some(json!({ "notes": "matte paper" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["notes"], "matte paper");

    transition(&app, &app.manager, order_id, "cancelled").await;
    let (status, _) = app
        .call(&app.manager, Method::PUT, &path, Some(json!({ "notes": "too late" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_filters_by_status_and_search() {
    let app = TestApp::new().await;
    let menu = app.service("menu_a4").await;

    for client in ["Alpha Print", "Beta Cafe"] {
        create(
            &app,
            &app.manager,
            json!({
                "client_name": client,
                "items": [{ "service_id": menu.id, "quantity": "5" }]
            }),
        )
        .await;
    }

    let (_, body) = app
        .call(&app.manager, Method::GET, "/api/v1/orders?search=Beta", None)
        .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["orders"][0]["client_name"], "Beta Cafe");

    let (_, body) = app
        .call(&app.manager, Method::GET, "/api/v1/orders?status=design", None)
        .await;
    assert_eq!(body["data"]["total"], 0);

    let (status, _) = app
        .call(&app.manager, Method::GET, "/api/v1/orders?status=shipped", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notify_defaults_to_a_manual_ready_message() {
    let app = TestApp::new().await;
    let menu = app.service("menu_a4").await;
    let (_, body) = create(
        &app,
        &app.manager,
        json!({
            "client_name": "Library",
            "items": [{ "service_id": menu.id, "quantity": "5" }]
        }),
    )
    .await;
    let order_id = body["data"]["id"].as_i64().expect("order id");

    let (status, body) = app
        .call(
            &app.manager,
            Method::POST,
            &format!("/api/v1/orders/{}/notify", order_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["ok"], true);
    assert_eq!(body["data"]["notifications"][0]["channel"], "manual");

    let (status, _) = app
        .call(
            &app.designer,
            Method::POST,
            &format!("/api/v1/orders/{}/notify", order_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
