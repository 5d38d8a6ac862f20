//! End-to-end encrypted exchanges through the real router.

#![cfg(test)]

use super::{read_body, TestClient};
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use flow_gateway::{CompletionSink, GatewayConfig};
use serde_json::json;

#[tokio::test]
async fn init_then_exchange_then_complete() {
    let mut client = TestClient::new(GatewayConfig::default());

    let welcome = client
        .exchange(json!({
            "action": "init",
            "flow_token": "flow-e2e-1",
            "version": "3.0",
        }))
        .await;
    assert_eq!(welcome["screen"], "welcome");

    let ack = client
        .exchange(json!({
            "action": "data_exchange",
            "flow_token": "flow-e2e-1",
            "version": "3.0",
            "data": {"name": "Sam"},
        }))
        .await;
    assert_eq!(ack["data"], json!({}));
    assert!(ack.get("screen").is_none());

    let done = client
        .exchange(json!({
            "action": "complete",
            "flow_token": "flow-e2e-1",
            "version": "3.0",
        }))
        .await;
    assert_eq!(done["data"]["name"], "Sam");
    assert!(done["data"].get("action").is_none());
    assert!(done["data"].get("screen").is_none());
    assert!(done["data"].get("flow_token").is_none());

    let collected = client.sink.collected_fields("flow-e2e-1").unwrap();
    assert_eq!(collected.get("name"), Some(&json!("Sam")));
}

#[tokio::test]
async fn ping_round_trips_through_the_channel() {
    let mut client = TestClient::new(GatewayConfig::default());
    let pong = client
        .exchange(json!({"action": "ping", "version": "3.0"}))
        .await;
    assert_eq!(pong["version"], "3.0");
    assert_eq!(pong["data"]["status"], "active");
}

#[tokio::test]
async fn onboarding_init_is_hydrated() {
    let mut client = TestClient::new(GatewayConfig::default());
    client.metadata.insert(
        "client_onboarding_778",
        flow_gateway::ports::TokenMetadata {
            trainer_name: Some("Thabo".into()),
            selected_price: Some("450".into()),
        },
    );

    let welcome = client
        .exchange(json!({
            "action": "init",
            "flow_token": "client_onboarding_778",
        }))
        .await;
    assert_eq!(welcome["screen"], "welcome");
    assert_eq!(welcome["data"]["trainer_name"], "Thabo");
    assert_eq!(welcome["data"]["selected_price"], "450");
}

#[tokio::test]
async fn health_notes_pricing_navigates_to_confirmation() {
    let mut client = TestClient::new(GatewayConfig::default());
    let resp = client
        .exchange(json!({
            "action": "data_exchange",
            "screen": "HEALTH_NOTES",
            "flow_token": "flow-price-1",
            "data": {
                "operation": "calculate_pricing",
                "pricing_choice": "custom_price",
                "trainer_default_price": "R500",
                "custom_price_amount": "R650",
            },
        }))
        .await;
    assert_eq!(resp["screen"], "CONFIRMATION");
    assert_eq!(resp["data"]["calculated_price"], "R650");
}

#[tokio::test]
async fn corrupted_tag_yields_421_not_500() {
    let mut client = TestClient::new(GatewayConfig::default());
    let (body, _) = client.seal(&json!({"action": "ping"}));

    // Flip one byte inside the authenticated region.
    let mut parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    let mut sealed = BASE64
        .decode(parsed["encrypted_flow_data"].as_str().unwrap())
        .unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0x01;
    parsed["encrypted_flow_data"] = json!(BASE64.encode(sealed));

    let response = client.post(parsed.to_string()).await;
    assert_eq!(response.status(), StatusCode::MISDIRECTED_REQUEST);
    assert!(read_body(response).await.is_empty());
}

#[tokio::test]
async fn signed_exchange_succeeds_and_unsigned_is_rejected() {
    let mut client = TestClient::new(GatewayConfig {
        app_secret: Some("e2e-secret".into()),
        ..Default::default()
    });

    // Signed by TestClient::post.
    let pong = client
        .exchange(json!({"action": "ping", "version": "3.0"}))
        .await;
    assert_eq!(pong["data"]["status"], "active");

    // Same payload without a signature must be rejected before decryption.
    let (body, _) = client.seal(&json!({"action": "ping"}));
    let unsigned = TestClient {
        secret: None,
        ..client
    };
    let response = unsigned.post(body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn internal_dispatch_failures_stay_on_the_channel() {
    // A malformed envelope that still decrypts (action is a number, not a
    // string) must come back as a 421, never a 500 or a panic.
    let mut client = TestClient::new(GatewayConfig::default());
    let (body, _) = client.seal(&json!({"action": 17, "flow_token": 3}));
    let response = client.post(body).await;
    assert_eq!(response.status(), StatusCode::MISDIRECTED_REQUEST);
}
