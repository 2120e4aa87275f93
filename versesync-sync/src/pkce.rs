//! PKCE verifier and challenge generation for the OAuth code flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::digest::{SHA256, digest};
use ring::rand::{SecureRandom, SystemRandom};
use versesync_core::SyncError;

/// Challenge method sent with every authorization request.
pub const CHALLENGE_METHOD: &str = "S256";

/// Bytes of entropy behind a verifier.
const VERIFIER_BYTES: usize = 64;

/// A verifier and the challenge derived from it.
#[derive(Clone)]
pub struct PkcePair {
    /// Secret kept on the device until the code exchange.
    pub code_verifier: String,
    /// `BASE64URL(SHA256(verifier))`, sent with the authorization request.
    pub code_challenge: String,
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}

impl PkcePair {
    /// Generates a fresh pair from the system CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if the system random source fails.
    pub fn generate() -> Result<Self, SyncError> {
        let mut random = [0u8; VERIFIER_BYTES];
        SystemRandom::new()
            .fill(&mut random)
            .map_err(|_| SyncError::Storage("system random source unavailable".to_string()))?;

        let code_verifier = URL_SAFE_NO_PAD.encode(random);
        let code_challenge = challenge_for(&code_verifier);
        Ok(Self {
            code_verifier,
            code_challenge,
        })
    }
}

/// Derives the S256 challenge for `verifier`.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(digest(&SHA256, verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7636_vector() {
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_generated_pair_is_consistent() {
        let pair = PkcePair::generate().unwrap();
        assert_eq!(pair.code_verifier.len(), 86);
        assert!(!pair.code_verifier.contains('='));
        assert_eq!(pair.code_challenge, challenge_for(&pair.code_verifier));
    }

    #[test]
    fn test_verifiers_differ() {
        let a = PkcePair::generate().unwrap();
        let b = PkcePair::generate().unwrap();
        assert_ne!(a.code_verifier, b.code_verifier);
    }

    #[test]
    fn test_debug_redacts_verifier() {
        let pair = PkcePair::generate().unwrap();
        assert!(!format!("{pair:?}").contains(&pair.code_verifier));
    }
}
