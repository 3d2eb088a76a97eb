use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

/// The size of the anti-CSRF state in bytes.
const STATE_SIZE: usize = 32;

/// Generates a new random OAuth `state` value.
///
/// # Returns
///
/// A URL-safe base64-encoded token, safe to put in a query string unescaped.
pub fn generate_state() -> String {
    let mut token = [0u8; STATE_SIZE];
    OsRng.fill_bytes(&mut token);

    general_purpose::URL_SAFE_NO_PAD.encode(token)
}

/// Compares two state values in constant time.
pub fn states_match(expected: &str, received: &str) -> bool {
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

/// A random hex nonce, as used by OAuth 1.0a request signing.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
