//! Stock operations over HTTP: receipts, corrections, alerts, the ledger and
//! defect write-offs.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{dec_of, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn receiving_stock_adds_to_quantity_and_ledger() {
    let app = TestApp::new().await;
    let roll = app.material("banner_roll").await;

    let (status, body) = app
        .call(
            &app.manager,
            Method::POST,
            &format!("/api/v1/inventory/{}/receive", roll.id),
            Some(json!({ "quantity": "25", "note": "supplier delivery" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(dec_of(&body["data"]["quantity"]), dec!(25));
    assert_eq!(dec_of(&body["data"]["available"]), dec!(25));
    assert_eq!(body["data"]["is_low"], false);

    let (_, ledger) = app
        .call(
            &app.manager,
            Method::GET,
            &format!("/api/v1/inventory/{}/ledger", roll.id),
            None,
        )
        .await;
    assert_eq!(ledger["data"][0]["action"], "receive");
    assert_eq!(ledger["data"][0]["note"], "supplier delivery");
    assert_eq!(dec_of(&ledger["data"][0]["quantity"]), dec!(25));
}

#[tokio::test]
async fn receipts_must_be_positive() {
    let app = TestApp::new().await;
    let roll = app.material("banner_roll").await;

    for quantity in ["0", "-3"] {
        let (status, _) = app
            .call(
                &app.manager,
                Method::POST,
                &format!("/api/v1/inventory/{}/receive", roll.id),
                Some(json!({ "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn corrections_cannot_dip_below_reserved_stock() {
    let app = TestApp::new().await;
    let banner = app.service("banner").await;
    let roll = app.stock("banner_roll", dec!(10)).await;

    let (status, _) = app
        .call(
            &app.manager,
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "client_name": "Stadium",
                "items": [{ "service_id": banner.id, "quantity": "1", "width": "2", "height": "3" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let path = format!("/api/v1/inventory/{}/correction", roll.id);

    let (status, body) = app
        .call(&app.manager, Method::POST, &path, Some(json!({ "quantity": "-5" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(app.material("banner_roll").await.quantity, dec!(10));

    let (status, body) = app
        .call(
            &app.manager,
            Method::POST,
            &path,
            Some(json!({ "quantity": "-4", "note": "water damage" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(dec_of(&body["data"]["quantity"]), dec!(6));
    assert_eq!(dec_of(&body["data"]["available"]), dec!(0));

    let (status, _) = app
        .call(&app.manager, Method::POST, &path, Some(json!({ "quantity": "0" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn alerts_list_materials_under_their_threshold() {
    let app = TestApp::new().await;
    app.stock("banner_roll", dec!(20)).await;

    let (status, body) = app
        .call(&app.manager, Method::GET, "/api/v1/inventory/alerts", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = body["data"]
        .as_array()
        .expect("alerts")
        .iter()
        .filter_map(|m| m["code"].as_str())
        .collect();
    assert!(!codes.contains(&"banner_roll"));
    assert!(codes.contains(&"vinyl_roll"));
}

#[tokio::test]
async fn stock_visibility_follows_roles() {
    let app = TestApp::new().await;

    let (status, _) = app.call(&app.master, Method::GET, "/api/v1/inventory", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(&app.designer, Method::GET, "/api/v1/inventory", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .call(&app.manager, Method::GET, "/api/v1/inventory/reconciliation", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(&app.manager, Method::GET, "/api/v1/inventory/999/ledger", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn defect_incident_writes_off_order_material() {
    let app = TestApp::new().await;
    let banner = app.service("banner").await;
    app.stock("banner_roll", dec!(10)).await;

    let (_, order) = app
        .call(
            &app.manager,
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "client_name": "Market",
                "items": [{ "service_id": banner.id, "quantity": "1", "width": "1", "height": "2" }]
            })),
        )
        .await;
    let order_id = order["data"]["id"].as_i64().expect("order id");

    let (status, body) = app
        .call(
            &app.manager,
            Method::POST,
            "/api/v1/incidents",
            Some(json!({
                "user_id": app.master.id,
                "type": "defect",
                "description": "misprint",
                "order_id": order_id,
                "material_waste": "1.5",
                "deduction_amount": "300"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["type"], "defect");
    assert_eq!(body["data"]["status"], "pending");

    let roll = app.material("banner_roll").await;
    assert_eq!(roll.quantity, dec!(8.5));
    assert_eq!(roll.reserved, dec!(2));

    let (_, ledger) = app
        .call(
            &app.manager,
            Method::GET,
            &format!("/api/v1/inventory/{}/ledger", roll.id),
            None,
        )
        .await;
    assert_eq!(ledger["data"][0]["action"], "defect");
    assert_eq!(ledger["data"][0]["note"], "Defect: misprint");
    assert_eq!(dec_of(&ledger["data"][0]["quantity"]), dec!(-1.5));

    let (_, incidents) = app
        .call(
            &app.manager,
            Method::GET,
            &format!("/api/v1/incidents?user_id={}", app.master.id),
            None,
        )
        .await;
    assert_eq!(incidents["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn incidents_reject_unknown_staff_and_negative_amounts() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(
            &app.manager,
            Method::POST,
            "/api/v1/incidents",
            Some(json!({ "user_id": 4040, "type": "late" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            &app.manager,
            Method::POST,
            "/api/v1/incidents",
            Some(json!({ "user_id": app.designer.id, "type": "late", "deduction_amount": "-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            &app.designer,
            Method::GET,
            "/api/v1/incidents",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn directors_review_incidents() {
    let app = TestApp::new().await;

    let (_, body) = app
        .call(
            &app.manager,
            Method::POST,
            "/api/v1/incidents",
            Some(json!({ "user_id": app.designer.id, "type": "late" })),
        )
        .await;
    let id = body["data"]["id"].as_i64().expect("incident id");
    let path = format!("/api/v1/incidents/{}/review", id);

    let (status, _) = app.call(&app.manager, Method::PATCH, &path, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(&app.director, Method::PATCH, &path, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "reviewed");

    let (status, body) = app.call(&app.director, Method::PATCH, &path, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "reviewed");

    let (status, _) = app
        .call(&app.director, Method::PATCH, "/api/v1/incidents/4040/review", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn incident_list_filters() {
    let app = TestApp::new().await;

    let mut ids = Vec::new();
    for (user_id, kind, deduction) in [
        (app.designer.id, "late", "0"),
        (app.master.id, "complaint", "500"),
        (app.master.id, "other", "0"),
    ] {
        let (status, body) = app
            .call(
                &app.manager,
                Method::POST,
                "/api/v1/incidents",
                Some(json!({ "user_id": user_id, "type": kind, "deduction_amount": deduction })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        ids.push(body["data"]["id"].as_i64().expect("incident id"));
    }
    app.call(
        &app.director,
        Method::PATCH,
        &format!("/api/v1/incidents/{}/review", ids[0]),
        None,
    )
    .await;

    let count = |body: &serde_json::Value| body["data"].as_array().map(Vec::len);

    let (_, body) = app
        .call(&app.manager, Method::GET, "/api/v1/incidents?status=reviewed", None)
        .await;
    assert_eq!(count(&body), Some(1));
    assert_eq!(body["data"][0]["id"], ids[0]);

    let (_, body) = app
        .call(&app.manager, Method::GET, "/api/v1/incidents?status=pending", None)
        .await;
    assert_eq!(count(&body), Some(2));

    let (_, body) = app
        .call(&app.manager, Method::GET, "/api/v1/incidents?penalties_only=true", None)
        .await;
    assert_eq!(count(&body), Some(1));
    assert_eq!(body["data"][0]["type"], "complaint");

    let (_, body) = app
        .call(
            &app.manager,
            Method::GET,
            &format!("/api/v1/incidents?user_id={}&status=pending", app.master.id),
            None,
        )
        .await;
    assert_eq!(count(&body), Some(2));

    let today = Utc::now().date_naive();
    let yesterday = today.pred_opt().expect("yesterday");

    let (_, body) = app
        .call(
            &app.manager,
            Method::GET,
            &format!("/api/v1/incidents?date_from={}&date_to={}", today, today),
            None,
        )
        .await;
    assert_eq!(count(&body), Some(3));

    let (_, body) = app
        .call(
            &app.manager,
            Method::GET,
            &format!("/api/v1/incidents?date_to={}", yesterday),
            None,
        )
        .await;
    assert_eq!(count(&body), Some(0));

    let (status, _) = app
        .call(
            &app.manager,
            Method::GET,
            &format!("/api/v1/incidents?date_from={}&date_to={}", today, yesterday),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
