//! # Flow Crypto - Encrypted Exchange Primitives
//!
//! Per-request cryptography for the interactive-form exchange channel.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `channel` | RSA-OAEP + AES-GCM | Envelope decrypt/encrypt |
//! | `signature` | HMAC-SHA256 | Request body authentication |
//!
//! ## Security Properties
//!
//! - **RSA-OAEP**: SHA-256 digest and MGF1, empty label
//! - **AES-GCM**: 16-byte trailing authentication tag, tamper-evident
//! - **Response IV**: every byte of the request IV XORed with `0xFF`;
//!   the request IV is never reused for the response direction
//! - **HMAC**: constant-time comparison via `Mac::verify_slice`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod errors;
pub mod signature;

// Re-exports
pub use channel::{flip_iv, CryptoChannel, EncryptedPayload, ExchangeKeys};
pub use errors::CryptoError;
pub use signature::validate_signature;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
