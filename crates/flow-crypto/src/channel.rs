//! # Crypto Channel
//!
//! Per-request envelope decryption and response encryption.
//!
//! Each inbound exchange carries three base64 fields: the AES session key
//! wrapped with the gateway's RSA public key, the encrypted envelope body,
//! and the initialization vector. The unwrapped key and IV live only for the
//! duration of one request; nothing is cached between calls.
//!
//! The response direction MUST NOT reuse the request IV. The protocol
//! mandates the response IV be the request IV with every byte XORed with
//! `0xFF` (see [`flip_iv`]).

use crate::CryptoError;
use aes_gcm::{
    aead::{
        generic_array::{
            typenum::{U12, U16},
            GenericArray,
        },
        Aead, KeyInit,
    },
    aes::{Aes128, Aes256},
    AesGcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::{pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, Oaep, RsaPrivateKey};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the trailing GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypted exchange payload as it appears on the wire.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct EncryptedPayload {
    /// Base64 AES-GCM ciphertext plus trailing tag
    pub encrypted_flow_data: String,
    /// Base64 RSA-OAEP wrapped AES session key
    pub encrypted_aes_key: String,
    /// Base64 initialization vector
    pub initial_vector: String,
}

/// Per-request symmetric key material.
///
/// Dropped (and zeroized) at the end of the request; never reused across
/// exchanges.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ExchangeKeys {
    /// Unwrapped AES session key (128- or 256-bit)
    pub key: Vec<u8>,
    /// Request initialization vector (12 or 16 bytes)
    pub iv: Vec<u8>,
}

/// Compute the response IV by flipping every bit of the request IV.
///
/// The transform is an involution: applying it twice returns the original
/// IV. For any non-empty IV the result differs from the input in every byte.
pub fn flip_iv(iv: &[u8]) -> Vec<u8> {
    iv.iter().map(|b| b ^ 0xFF).collect()
}

/// Asymmetric-then-symmetric channel for one form exchange endpoint.
///
/// Holds only the long-lived RSA private key; all symmetric material is
/// per-request and passed back to the caller via [`ExchangeKeys`].
pub struct CryptoChannel {
    private_key: RsaPrivateKey,
}

impl CryptoChannel {
    /// Load the channel's RSA private key from a PEM string.
    ///
    /// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) with a PKCS#1
    /// (`BEGIN RSA PRIVATE KEY`) fallback. The key must not be passphrase
    /// protected.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidPrivateKey` if neither format parses.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { private_key })
    }

    /// Construct from an already-parsed private key.
    pub fn from_key(private_key: RsaPrivateKey) -> Self {
        Self { private_key }
    }

    /// Decrypt one inbound exchange.
    ///
    /// Base64-decodes the three payload fields, unwraps the AES session key
    /// with RSA-OAEP (SHA-256 digest and MGF1, empty label), AES-GCM
    /// decrypts the body (ciphertext with a 16-byte trailing tag) and parses
    /// the plaintext as a UTF-8 JSON envelope.
    ///
    /// # Errors
    ///
    /// Any failure (bad encoding, unwrap failure, tag mismatch, malformed
    /// JSON) is fatal for the request; the caller signals the remote client
    /// to re-establish the channel.
    pub fn decrypt(
        &self,
        payload: &EncryptedPayload,
    ) -> Result<(serde_json::Value, ExchangeKeys), CryptoError> {
        let wrapped_key = BASE64
            .decode(&payload.encrypted_aes_key)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        let body = BASE64
            .decode(&payload.encrypted_flow_data)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        let iv = BASE64
            .decode(&payload.initial_vector)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;

        if body.len() < TAG_LEN {
            return Err(CryptoError::CiphertextTooShort { actual: body.len() });
        }

        let key = self
            .private_key
            .decrypt(Oaep::new::<Sha256>(), &wrapped_key)
            .map_err(|e| CryptoError::KeyUnwrapFailed(e.to_string()))?;

        let plaintext = open(&key, &iv, &body)?;

        let envelope = serde_json::from_slice(&plaintext)
            .map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))?;

        Ok((envelope, ExchangeKeys { key, iv }))
    }

    /// Encrypt one outbound response envelope.
    ///
    /// Serializes the envelope to JSON, AES-GCM encrypts it under the same
    /// session key with the flipped IV, and returns base64 of
    /// `ciphertext || tag`, the literal HTTP response body for a
    /// successful exchange.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EncryptionFailed` if sealing fails.
    pub fn encrypt(
        &self,
        envelope: &serde_json::Value,
        keys: &ExchangeKeys,
    ) -> Result<String, CryptoError> {
        let response_iv = flip_iv(&keys.iv);
        let plaintext = serde_json::to_vec(envelope)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let sealed = seal(&keys.key, &response_iv, &plaintext)?;
        Ok(BASE64.encode(sealed))
    }
}

/// AES-GCM decrypt dispatching on key and IV length.
///
/// `body` is ciphertext with the 16-byte tag appended, the combined-buffer
/// convention of the `aead` traits.
fn open(key: &[u8], iv: &[u8], body: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match (key.len(), iv.len()) {
        (16, 12) => open_with::<AesGcm<Aes128, U12>>(key, iv, body),
        (16, 16) => open_with::<AesGcm<Aes128, U16>>(key, iv, body),
        (32, 12) => open_with::<AesGcm<Aes256, U12>>(key, iv, body),
        (32, 16) => open_with::<AesGcm<Aes256, U16>>(key, iv, body),
        (16 | 32, actual) => Err(CryptoError::InvalidIvLength { actual }),
        (actual, _) => Err(CryptoError::InvalidKeyLength { actual }),
    }
}

/// AES-GCM encrypt dispatching on key and IV length.
fn seal(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match (key.len(), iv.len()) {
        (16, 12) => seal_with::<AesGcm<Aes128, U12>>(key, iv, plaintext),
        (16, 16) => seal_with::<AesGcm<Aes128, U16>>(key, iv, plaintext),
        (32, 12) => seal_with::<AesGcm<Aes256, U12>>(key, iv, plaintext),
        (32, 16) => seal_with::<AesGcm<Aes256, U16>>(key, iv, plaintext),
        (16 | 32, actual) => Err(CryptoError::InvalidIvLength { actual }),
        (actual, _) => Err(CryptoError::InvalidKeyLength { actual }),
    }
}

fn open_with<C: Aead + KeyInit>(key: &[u8], iv: &[u8], body: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength { actual: key.len() })?;
    cipher
        .decrypt(GenericArray::from_slice(iv), body)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

fn seal_with<C: Aead + KeyInit>(
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength { actual: key.len() })?;
    cipher
        .encrypt(GenericArray::from_slice(iv), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}
