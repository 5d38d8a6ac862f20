//! Decrypted request/response envelope models.
//!
//! The request carries three control fields (`action`, `screen`,
//! `flow_token`) plus a protocol `version`; form content arrives under
//! `data` and, for some actions, as extra top-level fields. The response
//! signals navigation by including or omitting `screen`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version stamped on responses when the request carries none.
pub const DEFAULT_VERSION: &str = "3.0";

/// Closed vocabulary of protocol actions.
///
/// Parsed case-insensitively; anything outside the known set is carried as
/// `Other` and dispatched as a plain data exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Liveness probe; never touches the session store
    Ping,
    /// Create or reset the session for a flow token
    Init,
    /// Merge incoming form data into the session
    DataExchange,
    /// Merge fields and run the pricing rule unconditionally
    CalculatePricing,
    /// Final submission; surfaces the full collected field set
    Complete,
    /// Unrecognized action, treated as a data exchange
    Other(String),
}

impl Action {
    /// Parse an action name, case-insensitively.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "ping" => Action::Ping,
            "init" => Action::Init,
            "data_exchange" => Action::DataExchange,
            "calculate_pricing" => Action::CalculatePricing,
            "complete" => Action::Complete,
            other => Action::Other(other.to_string()),
        }
    }
}

/// A decrypted inbound envelope.
///
/// `extra` captures every top-level field outside the modeled ones; the
/// `calculate_pricing` and `complete` actions treat those as form content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowRequest {
    /// Protocol action name as sent on the wire
    #[serde(default)]
    pub action: String,
    /// Screen the remote client is currently on
    #[serde(default)]
    pub screen: Option<String>,
    /// Opaque identifier for one in-progress form instance
    #[serde(default)]
    pub flow_token: Option<String>,
    /// Protocol version
    #[serde(default)]
    pub version: Option<String>,
    /// Form field values attached to this exchange
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Non-control top-level fields (form content for some actions)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlowRequest {
    /// The parsed protocol action.
    pub fn action(&self) -> Action {
        Action::parse(&self.action)
    }

    /// Version to stamp on the response.
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_VERSION)
    }

    /// The flow token, defaulting to empty for malformed envelopes.
    pub fn token(&self) -> &str {
        self.flow_token.as_deref().unwrap_or("")
    }

    /// All form content of this envelope: extra top-level fields overlaid
    /// with the nested `data` fields (nested wins on conflict).
    pub fn form_fields(&self) -> Map<String, Value> {
        let mut fields = self.extra.clone();
        for (k, v) in &self.data {
            fields.insert(k.clone(), v.clone());
        }
        fields
    }
}

/// An outbound envelope, encrypted before it leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowResponse {
    /// Protocol version echoed back to the client
    pub version: String,
    /// Present when the client should navigate to this screen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    /// Response data for the current or next screen
    pub data: Map<String, Value>,
}

impl FlowResponse {
    /// Response that stays on the current screen.
    pub fn stay(version: &str, data: Map<String, Value>) -> Self {
        Self {
            version: version.to_string(),
            screen: None,
            data,
        }
    }

    /// Response instructing the client to navigate.
    pub fn navigate(version: &str, screen: &str, data: Map<String, Value>) -> Self {
        Self {
            version: version.to_string(),
            screen: Some(screen.to_string()),
            data,
        }
    }

    /// Well-formed error envelope sent when dispatch fails internally.
    ///
    /// Keeps the encrypted channel valid so the remote client does not
    /// treat an internal fault as a transport fault.
    pub fn internal_error() -> Self {
        let mut data = Map::new();
        data.insert("error".into(), Value::String("Internal server error".into()));
        Self {
            version: DEFAULT_VERSION.to_string(),
            screen: None,
            data,
        }
    }
}
