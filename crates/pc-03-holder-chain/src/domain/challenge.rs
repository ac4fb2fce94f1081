//! Liveness challenge codes
//!
//! The plain code is shown once on the holder's screen and read aloud to the
//! scanner. Only a keyed hash bound to the hop (chain id and sequence) is ever
//! persisted, so a refreshed token at the same position keeps its challenge.

use crate::error::{ChainError, ChainResult};
use rand::Rng;
use shared_crypto::{blake3_derive_key, blake3_keyed_hash, keyed_hash_matches, SecretKey};
use shared_types::{ChainId, LivenessChallenge, ParticipantId, Timestamp, Token};

/// Number of digits in a challenge code.
pub const CHALLENGE_CODE_DIGITS: usize = 6;

/// BLAKE3 derive-key context for challenge hashing.
const CHALLENGE_KEY_CONTEXT: &str = "presence-chain 2026 liveness challenge hash key";

/// Hashes and checks challenge codes with a key derived from the process secret.
#[derive(Clone)]
pub struct ChallengeHasher {
    key: [u8; 32],
}

impl ChallengeHasher {
    pub fn new(secret: &SecretKey) -> Self {
        Self {
            key: blake3_derive_key(CHALLENGE_KEY_CONTEXT, secret.as_bytes()),
        }
    }

    /// Random zero-padded 6-digit code.
    pub fn generate_code() -> String {
        let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
        format!("{:06}", n)
    }

    fn material(chain_id: &ChainId, sequence: u64, code: &str) -> Vec<u8> {
        let mut material = chain_id.as_uuid().as_bytes().to_vec();
        material.extend_from_slice(&sequence.to_be_bytes());
        material.extend_from_slice(code.as_bytes());
        material
    }

    pub fn hash(&self, chain_id: &ChainId, sequence: u64, code: &str) -> [u8; 32] {
        blake3_keyed_hash(&self.key, &Self::material(chain_id, sequence, code))
    }

    /// Build the challenge record for `token`'s hop.
    pub fn challenge_for(
        &self,
        token: &Token,
        code: &str,
        requester_id: ParticipantId,
        expires_at: Timestamp,
    ) -> LivenessChallenge {
        LivenessChallenge {
            code_hash: self.hash(&token.chain_id, token.sequence, code),
            requester_id,
            expires_at,
        }
    }

    /// Check a scan against the token's pending challenge, if any.
    ///
    /// Passes trivially when nothing is pending. Otherwise the scanner must be
    /// the requester, the window must still be open and the code must match.
    pub fn check(
        &self,
        token: &Token,
        scanner: &ParticipantId,
        code: Option<&str>,
        now: Timestamp,
    ) -> ChainResult<()> {
        let Some(challenge) = token.pending_challenge() else {
            return Ok(());
        };

        let failed = ChainError::ChallengeFailed {
            chain_id: token.chain_id,
        };
        if &challenge.requester_id != scanner || challenge.is_expired(now) {
            return Err(failed);
        }
        let Some(code) = code else {
            return Err(failed);
        };
        let code = code.trim();
        if code.len() != CHALLENGE_CODE_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(failed);
        }
        let material = Self::material(&token.chain_id, token.sequence, code);
        if !keyed_hash_matches(&self.key, &material, &challenge.code_hash) {
            return Err(failed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{SessionId, TokenId, TokenStatus};

    fn token_with(hasher: &ChallengeHasher, code: &str) -> Token {
        let mut token = Token {
            id: TokenId::generate(),
            chain_id: ChainId::generate(),
            session_id: SessionId::from("s1"),
            holder_id: ParticipantId::from("alice"),
            sequence: 0,
            issued_at: 0,
            expires_at: 10_000,
            status: TokenStatus::Live,
            challenge: None,
        };
        token.challenge = Some(hasher.challenge_for(&token, code, ParticipantId::from("bob"), 30_000));
        token
    }

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..50 {
            let code = ChallengeHasher::generate_code();
            assert_eq!(code.len(), CHALLENGE_CODE_DIGITS);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_matching_code_passes() {
        let hasher = ChallengeHasher::new(&SecretKey::from_bytes([9; 32]));
        let token = token_with(&hasher, "004213");
        let bob = ParticipantId::from("bob");

        assert!(hasher.check(&token, &bob, Some("004213"), 1_000).is_ok());
        assert!(hasher.check(&token, &bob, Some(" 004213 "), 1_000).is_ok());
    }

    #[test]
    fn test_wrong_code_or_scanner_fails() {
        let hasher = ChallengeHasher::new(&SecretKey::from_bytes([9; 32]));
        let token = token_with(&hasher, "004213");

        let bob = ParticipantId::from("bob");
        let carol = ParticipantId::from("carol");
        assert!(hasher.check(&token, &bob, Some("004214"), 1_000).is_err());
        assert!(hasher.check(&token, &bob, None, 1_000).is_err());
        assert!(hasher.check(&token, &carol, Some("004213"), 1_000).is_err());
    }

    #[test]
    fn test_expired_challenge_is_unmet() {
        let hasher = ChallengeHasher::new(&SecretKey::from_bytes([9; 32]));
        let token = token_with(&hasher, "111111");
        let bob = ParticipantId::from("bob");
        assert!(hasher.check(&token, &bob, Some("111111"), 30_000).is_err());
    }

    #[test]
    fn test_hash_is_bound_to_hop() {
        let hasher = ChallengeHasher::new(&SecretKey::from_bytes([9; 32]));
        let chain = ChainId::generate();
        assert_ne!(hasher.hash(&chain, 0, "123456"), hasher.hash(&chain, 1, "123456"));
        assert_ne!(
            hasher.hash(&chain, 0, "123456"),
            hasher.hash(&ChainId::generate(), 0, "123456")
        );
    }

    #[test]
    fn test_challenge_survives_same_position_reissue() {
        let hasher = ChallengeHasher::new(&SecretKey::from_bytes([9; 32]));
        let mut token = token_with(&hasher, "555000");
        token.id = TokenId::generate();
        assert!(hasher
            .check(&token, &ParticipantId::from("bob"), Some("555000"), 1_000)
            .is_ok());
    }

    #[test]
    fn test_no_challenge_passes() {
        let hasher = ChallengeHasher::new(&SecretKey::from_bytes([9; 32]));
        let mut token = token_with(&hasher, "123456");
        token.challenge = None;
        assert!(hasher
            .check(&token, &ParticipantId::from("anyone"), None, 0)
            .is_ok());
    }
}
