//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// RSA private key could not be parsed
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Asymmetric unwrap of the session key failed
    #[error("Key unwrap failed: {0}")]
    KeyUnwrapFailed(String),

    /// Symmetric decryption failed (tag mismatch or corrupt ciphertext)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Symmetric encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Unwrapped AES key has an unsupported length
    #[error("Invalid key length: expected 16 or 32, got {actual}")]
    InvalidKeyLength {
        /// Actual key length in bytes
        actual: usize,
    },

    /// Initialization vector has an unsupported length
    #[error("Invalid IV length: expected 12 or 16, got {actual}")]
    InvalidIvLength {
        /// Actual IV length in bytes
        actual: usize,
    },

    /// Encrypted body too short to carry an authentication tag
    #[error("Ciphertext too short: {actual} bytes")]
    CiphertextTooShort {
        /// Actual body length in bytes
        actual: usize,
    },

    /// Base64 decoding of a payload field failed
    #[error("Invalid base64 encoding: {0}")]
    InvalidEncoding(String),

    /// Decrypted bytes were not a valid UTF-8 JSON envelope
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),
}
