//! Outbound ports for the flow gateway.
//!
//! The gateway touches exactly two external collaborators: a token-metadata
//! lookup used once per onboarding `init`, and the downstream consumer that
//! receives the collected field set when a flow completes. Both are traits
//! so tests and the runtime can inject in-memory implementations.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use thiserror::Error;

/// Prefabricated fields attached to an onboarding invitation token.
#[derive(Debug, Clone, Default)]
pub struct TokenMetadata {
    /// Trainer display name shown on the welcome screen
    pub trainer_name: Option<String>,
    /// Price the trainer pre-selected for this client
    pub selected_price: Option<String>,
}

/// Token-metadata lookup errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The backing store could not be reached
    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value lookup consulted once, at session initialization, to hydrate
/// pre-filled fields for onboarding-invitation flows.
///
/// A failed lookup must never abort the handshake; the dispatcher logs it
/// and proceeds with empty hydration.
#[async_trait]
pub trait TokenMetadataStore: Send + Sync {
    /// Fetch metadata for a token, `None` when unknown.
    async fn fetch(&self, token: &str) -> Result<Option<TokenMetadata>, MetadataError>;
}

/// In-memory token metadata, for the runtime default and for tests.
#[derive(Default)]
pub struct InMemoryTokenMetadata {
    entries: DashMap<String, TokenMetadata>,
}

impl InMemoryTokenMetadata {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert metadata for a token.
    pub fn insert(&self, token: &str, metadata: TokenMetadata) {
        self.entries.insert(token.to_string(), metadata);
    }
}

#[async_trait]
impl TokenMetadataStore for InMemoryTokenMetadata {
    async fn fetch(&self, token: &str) -> Result<Option<TokenMetadata>, MetadataError> {
        Ok(self.entries.get(token).map(|e| e.clone()))
    }
}

/// Downstream consumer of completed flows.
///
/// When the `complete` action fires, the full merged field set for the
/// token is recorded here and stays retrievable for whatever registers
/// clients and bookings.
pub trait CompletionSink: Send + Sync {
    /// Record the final field set for a completed flow.
    fn record(&self, token: &str, fields: Map<String, Value>);

    /// Retrieve the collected fields for a completed flow token.
    fn collected_fields(&self, token: &str) -> Option<Map<String, Value>>;
}

/// In-memory completion sink.
#[derive(Default)]
pub struct InMemoryCompletionSink {
    completed: DashMap<String, Map<String, Value>>,
}

impl InMemoryCompletionSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompletionSink for InMemoryCompletionSink {
    fn record(&self, token: &str, fields: Map<String, Value>) {
        self.completed.insert(token.to_string(), fields);
    }

    fn collected_fields(&self, token: &str) -> Option<Map<String, Value>> {
        self.completed.get(token).map(|e| e.clone())
    }
}
