//! Webhook entrypoint - HTTP-facing orchestration of the exchange pipeline.
//!
//! Data flows one way per request:
//!
//! ```text
//! raw bytes → signature check → CryptoChannel.decrypt → ActionDispatcher
//!           → CryptoChannel.encrypt → raw bytes out
//! ```
//!
//! Protocol status mapping: signature mismatch → 401; any failure inside
//! the encrypted region → 421 with an empty body (the platform's signal to
//! re-establish the channel); success → 200 `text/plain` with the bare
//! base64 ciphertext. Requests without the encrypted envelope shape fall
//! back to a legacy unencrypted handler.

use crate::dispatch::ActionDispatcher;
use crate::domain::config::GatewayConfig;
use crate::domain::envelope::FlowRequest;
use crate::domain::error::GatewayError;
use crate::ports::{CompletionSink, TokenMetadataStore};
use crate::session::SessionManager;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use flow_crypto::{validate_signature, CryptoChannel, CryptoError, EncryptedPayload};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Signature header sent by the platform.
const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<GatewayConfig>,
    channel: Arc<CryptoChannel>,
    sessions: Arc<SessionManager>,
    dispatcher: Arc<ActionDispatcher>,
    sink: Arc<dyn CompletionSink>,
}

/// Flow gateway service: owns configuration, wiring, and lifecycle.
pub struct FlowGatewayService {
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FlowGatewayService {
    /// Create a service, loading the RSA private key from the configured
    /// PEM.
    pub fn new(
        config: GatewayConfig,
        metadata: Arc<dyn TokenMetadataStore>,
        sink: Arc<dyn CompletionSink>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        let channel = CryptoChannel::from_pem(&config.private_key_pem)?;
        Ok(Self::with_channel(config, channel, metadata, sink))
    }

    /// Create a service around an already-constructed crypto channel.
    ///
    /// Skips PEM parsing; the config is still expected to be valid.
    pub fn with_channel(
        config: GatewayConfig,
        channel: CryptoChannel,
        metadata: Arc<dyn TokenMetadataStore>,
        sink: Arc<dyn CompletionSink>,
    ) -> Self {
        if config.app_secret.is_none() {
            warn!("No app secret configured; request signature validation is DISABLED");
        }
        let sessions = Arc::new(SessionManager::new());
        let dispatcher = Arc::new(ActionDispatcher::new(
            Arc::clone(&sessions),
            metadata,
            Arc::clone(&sink),
            config.onboarding_token_prefix.clone(),
        ));
        Self {
            state: AppState {
                config: Arc::new(config),
                channel: Arc::new(channel),
                sessions,
                dispatcher,
                sink,
            },
            shutdown_tx: None,
        }
    }

    /// Build the axum router for the webhook path.
    pub fn router(&self) -> Router {
        Router::new()
            .route(
                &self.state.config.webhook_path,
                get(handle_verification).post(handle_exchange),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// The session store, for diagnostics and tests.
    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.state.sessions)
    }

    /// Bind the listener and spawn the server task.
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        let listener = tokio::net::TcpListener::bind(self.state.config.bind).await?;
        let addr = listener.local_addr()?;
        info!(
            %addr,
            path = %self.state.config.webhook_path,
            signature_validation = self.state.config.app_secret.is_some(),
            "Flow gateway listening"
        );

        let (tx, rx) = oneshot::channel();
        self.shutdown_tx = Some(tx);

        let router = self.router();
        tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async {
                rx.await.ok();
            });
            if let Err(e) = server.await {
                warn!(error = %e, "Flow gateway server exited with error");
            }
        });

        Ok(())
    }

    /// Signal the server to shut down and drop all sessions.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.state.sessions.clear();
        info!("Flow gateway stopped");
    }
}

/// GET: platform verification challenge or liveness probe.
///
/// Never touches the crypto channel.
async fn handle_verification(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.sessions.reap(state.config.session_ttl());

    if params.get("hub.mode").map(String::as_str) == Some("subscribe") {
        if let Some(challenge) = params.get("hub.challenge") {
            if let Some(expected) = &state.config.verify_token {
                if params.get("hub.verify_token") != Some(expected) {
                    warn!("Subscribe verification with wrong verify token");
                    return StatusCode::FORBIDDEN.into_response();
                }
            }
            debug!("Answering subscribe verification challenge");
            return challenge.clone().into_response();
        }
    }

    Json(json!({
        "status": "ok",
        "service": "flow-gateway",
        "sessions": state.sessions.len(),
    }))
    .into_response()
}

/// POST: one encrypted exchange (or the legacy unencrypted fallback).
async fn handle_exchange(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.sessions.reap(state.config.session_ttl());

    if let Some(secret) = &state.config.app_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !validate_signature(&body, signature, secret) {
            warn!("Request signature mismatch");
            return legacy_status(StatusCode::UNAUTHORIZED, "Invalid request signature");
        }
    }

    let parsed: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Request body is not JSON");
            return legacy_status(StatusCode::BAD_REQUEST, "Request body must be JSON");
        }
    };

    match serde_json::from_value::<EncryptedPayload>(parsed.clone()) {
        Ok(payload) => match encrypted_exchange(&state, &payload).await {
            Ok(sealed) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain")],
                sealed,
            )
                .into_response(),
            Err(e) => {
                // 421 tells the platform to re-establish the encrypted
                // channel; the body stays empty by protocol.
                warn!(error = %e, "Encrypted exchange failed");
                StatusCode::MISDIRECTED_REQUEST.into_response()
            }
        },
        Err(_) => legacy_exchange(&state, &parsed),
    }
}

/// Decrypt, dispatch, and re-encrypt one exchange.
async fn encrypted_exchange(
    state: &AppState,
    payload: &EncryptedPayload,
) -> Result<String, CryptoError> {
    let (envelope, keys) = state.channel.decrypt(payload)?;
    let request: FlowRequest = serde_json::from_value(envelope)
        .map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))?;

    debug!(
        token = request.token(),
        action = %request.action,
        screen = request.screen.as_deref().unwrap_or(""),
        "Dispatching flow action"
    );

    let response = state.dispatcher.dispatch(&request).await;
    let response_value = serde_json::to_value(&response)
        .map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))?;
    state.channel.encrypt(&response_value, &keys)
}

/// Legacy unencrypted fallback: form fields arrive directly and the
/// completion side effect fires without any crypto step.
fn legacy_exchange(state: &AppState, parsed: &Value) -> Response {
    let Some(phone_number) = parsed.get("phone_number").and_then(Value::as_str) else {
        return legacy_status(StatusCode::BAD_REQUEST, "phone_number is required");
    };
    let Some(fields) = parsed.get("data").and_then(Value::as_object) else {
        return legacy_status(StatusCode::BAD_REQUEST, "data object is required");
    };

    state.sink.record(phone_number, fields.clone());
    info!(phone_number, field_count = fields.len(), "Legacy submission recorded");
    legacy_status(StatusCode::OK, "received")
}

/// JSON `{status, message}` body used by the legacy path and pre-crypto
/// rejections.
fn legacy_status(status: StatusCode, message: &str) -> Response {
    let label = if status.is_success() { "ok" } else { "error" };
    (
        status,
        Json(json!({"status": label, "message": message})),
    )
        .into_response()
}
