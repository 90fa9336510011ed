//! Designated-source peer scoring and election.

use std::collections::HashMap;

use crate::model::PeerSyncState;

/// Default interval (seconds) between source-election passes.
pub const DEFAULT_SOURCE_ELECTION_INTERVAL_SECS: u64 = 300;

const UPTIME_WEIGHT: f64 = 0.3;
const AVAILABILITY_WEIGHT: f64 = 0.4;
const PROGRESS_WEIGHT: f64 = 0.3;
const PROMOTION_THRESHOLD: f64 = 0.5;
const UPTIME_SATURATION_SECS: f64 = 3600.0;
const AVAILABILITY_SATURATION_CHUNKS: f64 = 100.0;

/// Score a single peer for designated-source promotion.
///
/// `0.3 * uptime_factor + 0.4 * chunk_availability_factor + 0.3 * sync_progress`,
/// where `uptime_factor = min(1, (now - last_contact) / 3600)` and
/// `chunk_availability_factor = min(1, |chunk_hashes| / 100)`.
#[must_use]
pub fn score_peer(peer: &PeerSyncState, now: i64) -> f64 {
    let uptime_factor = ((now - peer.last_contact).max(0) as f64 / UPTIME_SATURATION_SECS).min(1.0);
    let availability_factor = (peer.chunk_hashes.len() as f64 / AVAILABILITY_SATURATION_CHUNKS).min(1.0);
    let progress = peer.sync_progress.clamp(0.0, 1.0);
    UPTIME_WEIGHT * uptime_factor + AVAILABILITY_WEIGHT * availability_factor + PROGRESS_WEIGHT * progress
}

/// Pick the highest-scoring peer, if its score exceeds the 0.5 promotion
/// threshold. Ties are broken by peer id for determinism.
#[must_use]
pub fn elect_source(peers: &HashMap<String, PeerSyncState>, now: i64) -> Option<String> {
    peers
        .values()
        .map(|peer| (peer.peer_id.clone(), score_peer(peer, now)))
        .filter(|(_, score)| *score > PROMOTION_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| b.0.cmp(&a.0)))
        .map(|(peer_id, _)| peer_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: &str, last_contact: i64, chunks: usize, progress: f64) -> PeerSyncState {
        let mut state = PeerSyncState::new(id, last_contact);
        state.chunk_hashes = (0..chunks).map(|i| [i as u8; 32]).collect();
        state.sync_progress = progress;
        state
    }

    #[test]
    fn fully_idle_stale_peer_scores_near_one() {
        let p = peer("a", 0, 200, 1.0);
        let score = score_peer(&p, 4000);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fresh_contact_with_no_chunks_scores_low() {
        let p = peer("a", 1000, 0, 0.0);
        let score = score_peer(&p, 1000);
        assert!(score < 0.01);
    }

    #[test]
    fn election_requires_exceeding_threshold() {
        let mut peers = HashMap::new();
        peers.insert("low".to_string(), peer("low", 1000, 0, 0.0));
        assert_eq!(elect_source(&peers, 1000), None);
    }

    #[test]
    fn election_picks_highest_scorer() {
        let mut peers = HashMap::new();
        peers.insert("weak".to_string(), peer("weak", 3000, 10, 0.2));
        peers.insert("strong".to_string(), peer("strong", 0, 100, 1.0));
        assert_eq!(elect_source(&peers, 4000), Some("strong".to_string()));
    }
}
