//! Threshold / weighted vote counting over a single proposal.

use std::collections::HashMap;

use data_encoding::HEXLOWER;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use crate::error::{ByzantineError, ByzantineResult};
use crate::model::{Tally, Vote};

const DEFAULT_FAULT_THRESHOLD: f64 = 0.33;

/// Byzantine-threshold vote aggregator.
///
/// Tallies `{voter, vote, weight?}` ballots over a proposal and reports
/// whether the yes-ratio strictly exceeds `1 - fault_threshold`. Signature
/// verification is advisory: [`Self::verify_signature`] records presented
/// public keys and checks Ed25519 validity, but does not itself gate
/// [`Self::aggregate_votes`] — callers that need signed votes must check
/// both independently.
pub struct ByzantineAggregator {
    fault_threshold: f64,
    weighted_voting: bool,
    presented_keys: RwLock<HashMap<String, [u8; 32]>>,
}

impl ByzantineAggregator {
    /// Construct an aggregator with the given fault threshold and whether
    /// per-vote weights are honored.
    ///
    /// # Errors
    ///
    /// Returns [`ByzantineError::InvalidFaultThreshold`] unless
    /// `0 <= fault_threshold < 1`.
    pub fn new(fault_threshold: f64, weighted_voting: bool) -> ByzantineResult<Self> {
        if !(0.0..1.0).contains(&fault_threshold) {
            return Err(ByzantineError::InvalidFaultThreshold { value: fault_threshold });
        }
        Ok(Self {
            fault_threshold,
            weighted_voting,
            presented_keys: RwLock::new(HashMap::new()),
        })
    }

    /// Construct an aggregator using the default 0.33 fault threshold.
    ///
    /// # Errors
    ///
    /// Never returns an error; present for symmetry with [`Self::new`].
    pub fn with_default_threshold(weighted_voting: bool) -> ByzantineResult<Self> {
        Self::new(DEFAULT_FAULT_THRESHOLD, weighted_voting)
    }

    /// The configured fault threshold.
    #[must_use]
    pub const fn fault_threshold(&self) -> f64 {
        self.fault_threshold
    }

    /// Tally `votes` for a single proposal.
    ///
    /// When weighted voting is disabled (the default), per-vote weights are
    /// ignored entirely and every ballot counts as 1 — this matches the
    /// original implementation's behavior and requires explicit opt-in via
    /// `weighted_voting = true` to avoid accidental weight-stuffing.
    ///
    /// # Errors
    ///
    /// Returns [`ByzantineError::InvalidWeight`] if weighted voting is
    /// enabled and any vote carries a negative weight.
    #[instrument(name = "byzantine.aggregate_votes", skip(self, votes), fields(count = votes.len()))]
    pub fn aggregate_votes(&self, votes: &[Vote]) -> ByzantineResult<Tally> {
        if votes.is_empty() {
            return Ok(Tally { reached: false, ratio: 0.0 });
        }

        let ratio = if self.weighted_voting {
            let mut yes_weight = 0.0;
            let mut total_weight = 0.0;
            for vote in votes {
                let weight = vote.weight.unwrap_or(1.0);
                if weight < 0.0 {
                    return Err(ByzantineError::InvalidWeight { value: weight });
                }
                total_weight += weight;
                if vote.vote {
                    yes_weight += weight;
                }
            }
            if total_weight <= 0.0 {
                0.0
            } else {
                yes_weight / total_weight
            }
        } else {
            let yes = votes.iter().filter(|v| v.vote).count();
            yes as f64 / votes.len() as f64
        };

        let required = 1.0 - self.fault_threshold;
        let reached = ratio > required;
        Ok(Tally { reached, ratio })
    }

    /// Record `pk` as the presenter's public key and verify that `sig` is a
    /// well-formed Ed25519 signature over `msg` under it.
    ///
    /// This does not gate [`Self::aggregate_votes`]; it is a separate,
    /// advisory check callers may use to authenticate ballots before
    /// tallying them.
    #[instrument(name = "byzantine.verify_signature", skip(self, msg, sig, pk))]
    pub async fn verify_signature(&self, msg: &[u8], sig: &[u8], pk: &[u8], peer: &str) -> bool {
        self.presented_keys.write().await.insert(peer.to_string(), {
            let mut buf = [0u8; 32];
            let len = pk.len().min(32);
            buf[..len].copy_from_slice(&pk[..len]);
            buf
        });

        let Ok(key_bytes): Result<[u8; 32], _> = pk.try_into() else {
            warn!(peer, "public key is not 32 bytes");
            return false;
        };
        let Ok(sig_bytes): Result<[u8; 64], _> = sig.try_into() else {
            warn!(peer, "signature is not 64 bytes");
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);
        verifying_key.verify(msg, &signature).is_ok()
    }

    /// Public keys presented so far via [`Self::verify_signature`], keyed by
    /// peer id and rendered as lowercase hex.
    pub async fn presented_keys_hex(&self) -> HashMap<String, String> {
        self.presented_keys
            .read()
            .await
            .iter()
            .map(|(peer, key)| (peer.clone(), HEXLOWER.encode(key)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_threshold() {
        assert!(ByzantineAggregator::new(1.0, false).is_err());
        assert!(ByzantineAggregator::new(-0.1, false).is_err());
        assert!(ByzantineAggregator::new(0.99, false).is_ok());
    }

    #[test]
    fn unweighted_unanimous_yes_reaches_consensus() {
        let agg = ByzantineAggregator::new(0.33, false).unwrap();
        let votes: Vec<Vote> = (0..4).map(|i| Vote::new(format!("peer-{i}"), true)).collect();
        let tally = agg.aggregate_votes(&votes).unwrap();
        assert!(tally.reached);
        assert!((tally.ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unweighted_even_split_fails() {
        let agg = ByzantineAggregator::new(0.33, false).unwrap();
        let votes = vec![Vote::new("a", true), Vote::new("b", true), Vote::new("c", false), Vote::new("d", false)];
        let tally = agg.aggregate_votes(&votes).unwrap();
        assert!(!tally.reached);
        assert!((tally.ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unweighted_three_of_four_reaches() {
        let agg = ByzantineAggregator::new(0.33, false).unwrap();
        let votes = vec![Vote::new("a", true), Vote::new("b", true), Vote::new("c", true), Vote::new("d", false)];
        let tally = agg.aggregate_votes(&votes).unwrap();
        assert!(tally.reached);
        assert!((tally.ratio - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn weights_ignored_unless_weighted_voting_enabled() {
        let agg = ByzantineAggregator::new(0.33, false).unwrap();
        let votes = vec![Vote::weighted("a", true, 100.0), Vote::weighted("b", false, 1.0)];
        let tally = agg.aggregate_votes(&votes).unwrap();
        assert!((tally.ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn weighted_voting_honors_weights() {
        let agg = ByzantineAggregator::new(0.33, true).unwrap();
        let votes = vec![Vote::weighted("a", true, 9.0), Vote::weighted("b", false, 1.0)];
        let tally = agg.aggregate_votes(&votes).unwrap();
        assert!(tally.reached);
        assert!((tally.ratio - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let agg = ByzantineAggregator::new(0.33, true).unwrap();
        let votes = vec![Vote::weighted("a", true, -1.0)];
        assert!(agg.aggregate_votes(&votes).is_err());
    }

    #[tokio::test]
    async fn verify_signature_round_trip() {
        use aes_gcm::aead::OsRng;
        use ed25519_dalek::{Signer, SigningKey};

        let signing_key = SigningKey::generate(&mut OsRng);
        let pk = signing_key.verifying_key().to_bytes();
        let msg = b"proposal-42";
        let sig = signing_key.sign(msg);

        let agg = ByzantineAggregator::with_default_threshold(false).unwrap();
        assert!(agg.verify_signature(msg, &sig.to_bytes(), &pk, "peer-a").await);
        assert!(!agg.verify_signature(b"tampered", &sig.to_bytes(), &pk, "peer-a").await);
        assert_eq!(agg.presented_keys_hex().await.len(), 1);
    }
}
