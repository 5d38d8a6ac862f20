//! Session lifecycle and legacy-path behavior through the router.

#![cfg(test)]

use super::{read_body, TestClient};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use flow_gateway::{CompletionSink, GatewayConfig};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn reinit_replaces_accumulated_fields() {
    let mut client = TestClient::new(GatewayConfig::default());

    client
        .exchange(json!({
            "action": "data_exchange",
            "flow_token": "flow-reset",
            "data": {"stale": "yes"},
        }))
        .await;
    client
        .exchange(json!({"action": "init", "flow_token": "flow-reset"}))
        .await;

    let done = client
        .exchange(json!({
            "action": "complete",
            "flow_token": "flow-reset",
            "data": {"fresh": "yes"},
        }))
        .await;
    assert_eq!(done["data"]["fresh"], "yes");
    assert!(done["data"].get("stale").is_none());
}

#[tokio::test]
async fn standalone_pricing_emits_bare_amount() {
    let mut client = TestClient::new(GatewayConfig::default());
    let resp = client
        .exchange(json!({
            "action": "calculate_pricing",
            "flow_token": "flow-price-2",
            "pricing_choice": "custom_price",
            "trainer_default_price": "R500",
            "custom_price_amount": " 650 ",
            "data": {"client_name": "Sam"},
        }))
        .await;
    assert_eq!(resp["screen"], "CONFIRMATION");
    assert_eq!(resp["data"]["calculated_price"], "650");
    assert_eq!(resp["data"]["client_name"], "Sam");

    // The priced fields are part of the completed set.
    let done = client
        .exchange(json!({"action": "complete", "flow_token": "flow-price-2"}))
        .await;
    assert_eq!(done["data"]["calculated_price"], "650");
}

#[tokio::test]
async fn unknown_actions_still_accumulate_data() {
    let mut client = TestClient::new(GatewayConfig::default());
    client
        .exchange(json!({
            "action": "back",
            "flow_token": "flow-nav",
            "data": {"step": 2},
        }))
        .await;
    let done = client
        .exchange(json!({"action": "complete", "flow_token": "flow-nav"}))
        .await;
    assert_eq!(done["data"]["step"], 2);
}

#[tokio::test]
async fn legacy_submission_skips_crypto_entirely() {
    let client = TestClient::new(GatewayConfig::default());
    let response = client
        .post(json!({"phone_number": "+27820000000", "data": {"name": "Sam"}}).to_string())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&read_body(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(
        client.sink.collected_fields("+27820000000").unwrap().get("name"),
        Some(&json!("Sam"))
    );
}

#[tokio::test]
async fn liveness_probe_counts_sessions() {
    let mut client = TestClient::new(GatewayConfig::default());
    client
        .exchange(json!({"action": "init", "flow_token": "flow-count"}))
        .await;

    let response = client
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/webhook/flows")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&read_body(response).await).unwrap();
    assert_eq!(body["sessions"], 1);
}
