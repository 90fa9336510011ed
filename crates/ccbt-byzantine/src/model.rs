//! Vote records and aggregation outcomes.

/// A single voter's ballot on a proposal.
#[derive(Debug, Clone)]
pub struct Vote {
    /// Identity of the voting peer.
    pub voter: String,
    /// `true` for yes, `false` for no.
    pub vote: bool,
    /// Optional weight; ignored unless the aggregator has weighted voting
    /// enabled (see [`crate::ByzantineAggregator::new`]).
    pub weight: Option<f64>,
}

impl Vote {
    /// Construct an unweighted vote.
    #[must_use]
    pub fn new(voter: impl Into<String>, vote: bool) -> Self {
        Self { voter: voter.into(), vote, weight: None }
    }

    /// Construct a vote carrying an explicit weight.
    #[must_use]
    pub fn weighted(voter: impl Into<String>, vote: bool, weight: f64) -> Self {
        Self { voter: voter.into(), vote, weight: Some(weight) }
    }
}

/// Result of tallying votes on a single proposal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tally {
    /// Whether the yes-ratio strictly exceeds `1 - fault_threshold`.
    pub reached: bool,
    /// The computed yes-ratio (weighted if weighted voting is enabled).
    pub ratio: f64,
}
