//! CSRF state generation
//!
//! The state parameter round-trips through the authorization redirect and
//! must be unguessable. Callers that already have their own session tokens
//! can use those instead; this is a convenience.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

/// Generate a random state value.
///
/// 32 random bytes as URL-safe base64 without padding (43 characters), so
/// the value can be embedded in a query string without escaping.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
