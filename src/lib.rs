//! # SkillSwap Match Engine
//!
//! Partner matching for a skill-exchange marketplace:
//! - Profile snapshots with offered/wanted skill claims
//! - Compatibility scoring (mutual skills, level proximity, city, availability)
//! - Stable ranking of candidate partners
//! - SQLite store with directory search and moderation
//! - Swap requests between users, with ratings of finished exchanges
//! - Admin announcements and skill review
//! - Multiple interfaces: Rust library, HTTP API, CLI
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use skillswap_match_engine::{MatchEngine, MatchQuery};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = MatchEngine::new("skillswap.db").await?;
//!
//!     let response = engine.find_matches(MatchQuery::new("user-42")).await?;
//!
//!     for m in &response.matches {
//!         println!("{} - {}", m.profile.id, m.match_result.score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod ranking;
pub mod store;

// Re-export primary types
pub use config::EngineConfig;
pub use core::{
    AdminMessage, ClaimKind, MatchResult, MatchedSkill, NewAdminMessage, NewRating,
    NewSwapRequest, ProficiencyLevel, ProfileRecord, ProfileSnapshot, PublicProfile, RankedMatch,
    Rating, RequestDirection, SkillClaim, SkillRef, SwapDecision, SwapRequest, SwapRequestStatus,
};
pub use engine::{ImportReport, MatchEngine, MatchOptions, MatchQuery, MatchResponse};
pub use error::{MatchEngineError, Result};
pub use metrics::MetricsCollector;
pub use ranking::{rank_candidates, score_match, OverlapRanker, Ranker};
pub use store::{
    MessageStore, ProfileStore, RequestFilters, RequestPage, SearchFilters, SearchPage,
    SqliteStore, Store, SwapStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
