//! Gateway error types.
//!
//! These cover startup and wiring only. Request handlers never surface an
//! `Err` to the framework: every protocol failure maps to a status code
//! (401, 421) or a well-formed error envelope so the channel stays intact.

use crate::domain::config::ConfigError;
use thiserror::Error;

/// Fatal gateway errors (startup/shutdown only).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration rejected by validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// RSA private key could not be loaded
    #[error("Crypto setup error: {0}")]
    Crypto(#[from] flow_crypto::CryptoError),

    /// Listener could not bind
    #[error("Bind error: {0}")]
    Bind(#[from] std::io::Error),
}
