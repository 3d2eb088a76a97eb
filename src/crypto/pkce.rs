use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Characters allowed in a code verifier (RFC 7636 unreserved set).
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
const VERIFIER_LEN: usize = 64;

/// A PKCE verifier and its S256 challenge.
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let verifier = generate_code_verifier();
        let challenge = code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

pub fn generate_code_verifier() -> String {
    (0..VERIFIER_LEN)
        .map(|_| VERIFIER_CHARSET[OsRng.gen_range(0..VERIFIER_CHARSET.len())] as char)
        .collect()
}

/// base64url(SHA-256(verifier)), no padding.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_matches_rfc7636_vector() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn generated_pair_is_consistent() {
        let pair = PkcePair::generate();
        assert_eq!(pair.verifier.len(), VERIFIER_LEN);
        assert!(pair.verifier.bytes().all(|b| VERIFIER_CHARSET.contains(&b)));
        assert_eq!(pair.challenge, code_challenge(&pair.verifier));
        assert_ne!(pair.verifier, PkcePair::generate().verifier);
    }
}
