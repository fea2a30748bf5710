//! Simultaneous order creation against one material: no oversell, reserved
//! stock matches the ledger and every order gets its own number.

mod common;

use std::collections::HashSet;

use axum::http::{Method, StatusCode};
use common::TestApp;
use futures::future::join_all;
use printshop_api::repositories::MaterialRepository;
use printshop_api::services::inventory::outstanding_reservations;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

const ATTEMPTS: usize = 8;

#[tokio::test]
async fn concurrent_orders_never_oversell() {
    let app = TestApp::new().await;
    let banner = app.service("banner").await;
    let roll = app.stock("banner_roll", dec!(7)).await;

    // Each order needs 2 m², so at most three fit into 7 m².
    let requests = (0..ATTEMPTS).map(|n| {
        let body = json!({
            "client_name": format!("Client {}", n),
            "items": [{ "service_id": banner.id, "quantity": "1", "width": "1", "height": "2" }]
        });
        let app = &app;
        async move {
            app.call(&app.manager, Method::POST, "/api/v1/orders", Some(body))
                .await
        }
    });
    let results = join_all(requests).await;

    let mut numbers = HashSet::new();
    let mut created = 0;
    for (status, body) in &results {
        match *status {
            StatusCode::CREATED => {
                created += 1;
                let number = body["data"]["order_number"].as_str().expect("order number");
                assert!(numbers.insert(number.to_string()), "duplicate number {number}");
            }
            StatusCode::BAD_REQUEST => {
                let message = body["message"].as_str().unwrap_or_default();
                assert!(message.contains("Insufficient"), "{message}");
            }
            other => panic!("unexpected status {other}: {body}"),
        }
    }

    let required = dec!(2);
    assert_eq!(created, 3);
    assert!(Decimal::from(created) * required <= dec!(7));

    let roll = MaterialRepository::new(app.db())
        .get(roll.id)
        .await
        .expect("material");
    assert_eq!(roll.quantity, dec!(7));
    assert_eq!(roll.reserved, Decimal::from(created) * required);

    let movements = MaterialRepository::new(app.db())
        .reservation_movements()
        .await
        .expect("ledger");
    let outstanding = outstanding_reservations(&movements);
    assert_eq!(outstanding.get(&roll.id).copied(), Some(roll.reserved));
}
