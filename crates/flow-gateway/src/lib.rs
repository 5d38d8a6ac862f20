//! Flow Gateway - encrypted interactive-form exchange endpoint.
//!
//! This crate drives the chat platform's multi-screen data-collection
//! "Flow" feature for the CoachFlow assistant.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      WEBHOOK ENTRYPOINT                      │
//! │        GET: verification challenge / liveness probe          │
//! │        POST: encrypted exchange / legacy fallback            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  raw body ──→ SignatureValidator ──→ CryptoChannel.decrypt   │
//! │                                            │                 │
//! │                                            ▼                 │
//! │                                     ActionDispatcher         │
//! │                                      │           │           │
//! │                              SessionManager  CompletionSink  │
//! │                                            │                 │
//! │                                            ▼                 │
//! │              HTTP 200 ◀── CryptoChannel.encrypt              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol status codes
//!
//! - **200** `text/plain`: base64 ciphertext of the response envelope
//! - **401**: request signature mismatch (when a secret is configured)
//! - **421**: decryption or processing failure inside the encrypted
//!   region; the remote client re-establishes the channel
//!
//! # Usage
//!
//! ```ignore
//! use flow_gateway::{FlowGatewayService, GatewayConfig};
//!
//! let config = GatewayConfig::from_env()?;
//! let service = FlowGatewayService::new(config, metadata_store, sink)?;
//! service.serve().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod dispatch;
pub mod domain;
pub mod ports;
pub mod service;
pub mod session;

pub use dispatch::ActionDispatcher;
pub use domain::config::GatewayConfig;
pub use domain::envelope::{Action, FlowRequest, FlowResponse};
pub use domain::error::GatewayError;
pub use ports::{CompletionSink, InMemoryCompletionSink, InMemoryTokenMetadata, TokenMetadataStore};
pub use service::FlowGatewayService;
pub use session::{SessionInfo, SessionManager};
