pub mod overlap;

use crate::core::{ProfileSnapshot, RankedMatch};

pub use overlap::{rank_candidates, score_match, OverlapRanker};

/// Trait for candidate ranking implementations
pub trait Ranker: Send + Sync {
    /// Score candidates against the current profile, sorted by score (highest first)
    fn rank(&self, current: &ProfileSnapshot, candidates: &[ProfileSnapshot]) -> Vec<RankedMatch>;

    /// Get ranker name for logging
    fn name(&self) -> &str;
}
