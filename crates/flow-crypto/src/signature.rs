//! Request signature validation.
//!
//! The platform signs every POST body with HMAC-SHA256 keyed by the shared
//! app secret and sends the hex digest in `X-Hub-Signature-256`, prefixed
//! with `sha256=`. Comparison is constant-time via `Mac::verify_slice`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Validate an HMAC-SHA256 signature over a raw request body.
///
/// Strips an optional `sha256=` prefix from the header value before hex
/// decoding. Returns `false` for malformed hex rather than erroring: an
/// unparseable signature is a failed signature.
pub fn validate_signature(raw_body: &[u8], signature_header: &str, shared_secret: &str) -> bool {
    let hex_digest = signature_header
        .strip_prefix("sha256=")
        .unwrap_or(signature_header);

    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(shared_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(raw_body);
    mac.verify_slice(&expected).is_ok()
}
