//! Action dispatch for decrypted flow envelopes.
//!
//! One exhaustive match over the closed [`Action`] vocabulary. Every branch
//! mutates the session through [`SessionManager`] and produces the next
//! unencrypted response envelope; the caller encrypts it. Dispatch never
//! fails outward: internal errors are recovered into a well-formed error
//! envelope so the remote client keeps the channel open.

use crate::domain::envelope::{Action, FlowRequest, FlowResponse};
use crate::domain::pricing::{price_from_fields, PriceFormat, FALLBACK_DEFAULT_PRICE};
use crate::ports::{CompletionSink, TokenMetadataStore};
use crate::session::SessionManager;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Screen shown after a successful `init`.
pub const SCREEN_WELCOME: &str = "welcome";
/// Screen whose data exchange may embed a pricing request.
pub const SCREEN_HEALTH_NOTES: &str = "HEALTH_NOTES";
/// Screen shown once a price has been calculated.
pub const SCREEN_CONFIRMATION: &str = "CONFIRMATION";

/// `data.operation` value that triggers pricing during a data exchange.
const OP_CALCULATE_PRICING: &str = "calculate_pricing";

/// Internal dispatch failures, recovered before they reach the transport.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Session disappeared between merge and read
    #[error("Session state missing for token")]
    MissingSession,
}

/// Interprets envelope actions and drives the session state machine.
pub struct ActionDispatcher {
    sessions: Arc<SessionManager>,
    metadata: Arc<dyn TokenMetadataStore>,
    sink: Arc<dyn CompletionSink>,
    onboarding_prefix: String,
}

impl ActionDispatcher {
    /// Create a dispatcher over the given session store and ports.
    pub fn new(
        sessions: Arc<SessionManager>,
        metadata: Arc<dyn TokenMetadataStore>,
        sink: Arc<dyn CompletionSink>,
        onboarding_prefix: String,
    ) -> Self {
        Self {
            sessions,
            metadata,
            sink,
            onboarding_prefix,
        }
    }

    /// Dispatch one decrypted envelope.
    ///
    /// Never fails: internal errors become the protocol error envelope so
    /// the encrypted channel itself stays valid.
    pub async fn dispatch(&self, request: &FlowRequest) -> FlowResponse {
        match self.try_dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    token = request.token(),
                    action = %request.action,
                    error = %e,
                    "Dispatch failed; returning error envelope"
                );
                FlowResponse::internal_error()
            }
        }
    }

    async fn try_dispatch(&self, request: &FlowRequest) -> Result<FlowResponse, DispatchError> {
        match request.action() {
            Action::Ping => Ok(self.handle_ping(request)),
            Action::Init => Ok(self.handle_init(request).await),
            Action::DataExchange => self.handle_data_exchange(request),
            Action::CalculatePricing => self.handle_calculate_pricing(request),
            Action::Complete => self.handle_complete(request),
            Action::Other(name) => {
                debug!(action = %name, "Unrecognized action, treating as data exchange");
                self.handle_data_exchange(request)
            }
        }
    }

    /// Liveness probe; never touches the session store.
    fn handle_ping(&self, request: &FlowRequest) -> FlowResponse {
        let mut data = Map::new();
        data.insert("status".into(), Value::String("active".into()));
        FlowResponse::stay(request.version(), data)
    }

    /// Create or reset the session and answer with the welcome screen.
    ///
    /// Onboarding-invitation tokens get their welcome data hydrated from
    /// the token-metadata store. A failed or empty lookup never aborts the
    /// handshake: it is logged and hydration proceeds empty.
    async fn handle_init(&self, request: &FlowRequest) -> FlowResponse {
        let token = request.token();
        self.sessions.reset(token);

        let mut data = Map::new();
        if token.starts_with(&self.onboarding_prefix) {
            let metadata = match self.metadata.fetch(token).await {
                Ok(found) => found.unwrap_or_default(),
                Err(e) => {
                    warn!(token, error = %e, "Token metadata lookup failed; hydrating empty");
                    Default::default()
                }
            };
            if let Some(trainer_name) = metadata.trainer_name {
                data.insert("trainer_name".into(), Value::String(trainer_name));
            }
            let price = metadata
                .selected_price
                .unwrap_or_else(|| FALLBACK_DEFAULT_PRICE.to_string());
            data.insert("selected_price".into(), Value::String(price));
            self.sessions.merge(token, &data);
        }

        FlowResponse::navigate(request.version(), SCREEN_WELCOME, data)
    }

    /// Merge incoming data; on the HEALTH_NOTES screen a
    /// `calculate_pricing` operation additionally prices the session and
    /// navigates to confirmation.
    fn handle_data_exchange(&self, request: &FlowRequest) -> Result<FlowResponse, DispatchError> {
        let token = request.token();
        self.sessions.merge(token, &request.data);

        let wants_pricing = request.screen.as_deref() == Some(SCREEN_HEALTH_NOTES)
            && request.data.get("operation").and_then(Value::as_str) == Some(OP_CALCULATE_PRICING);

        if wants_pricing {
            let response = self.price_session(token, request, PriceFormat::CurrencyPrefixed)?;
            return Ok(response);
        }

        Ok(FlowResponse::stay(request.version(), Map::new()))
    }

    /// Merge every non-control envelope field, then price unconditionally.
    fn handle_calculate_pricing(
        &self,
        request: &FlowRequest,
    ) -> Result<FlowResponse, DispatchError> {
        let token = request.token();
        self.sessions.merge(token, &request.form_fields());
        self.price_session(token, request, PriceFormat::Bare)
    }

    /// Run the pricing rule over the accumulated session fields, store the
    /// result, and navigate to the confirmation screen with the incoming
    /// fields plus `calculated_price`.
    fn price_session(
        &self,
        token: &str,
        request: &FlowRequest,
        format: PriceFormat,
    ) -> Result<FlowResponse, DispatchError> {
        let session_fields = self
            .sessions
            .fields(token)
            .ok_or(DispatchError::MissingSession)?;
        let price = price_from_fields(&session_fields, format);

        let mut stored = Map::new();
        stored.insert("calculated_price".into(), Value::String(price.clone()));
        self.sessions.merge(token, &stored);

        let mut data = request.form_fields();
        data.insert("calculated_price".into(), Value::String(price));
        Ok(FlowResponse::navigate(
            request.version(),
            SCREEN_CONFIRMATION,
            data,
        ))
    }

    /// Final submission: merge any remaining fields, surface the full
    /// collected set, and hand it to the downstream consumer.
    fn handle_complete(&self, request: &FlowRequest) -> Result<FlowResponse, DispatchError> {
        let token = request.token();
        self.sessions.merge(token, &request.form_fields());

        let fields = self
            .sessions
            .fields(token)
            .ok_or(DispatchError::MissingSession)?;
        self.sink.record(token, fields.clone());
        debug!(token, field_count = fields.len(), "Flow completed");

        Ok(FlowResponse::stay(request.version(), fields))
    }
}
