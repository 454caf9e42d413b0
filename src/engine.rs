use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::{
    AdminMessage, MatchResult, NewAdminMessage, NewRating, NewSwapRequest, ProfileRecord,
    RankedMatch, Rating, SwapDecision, SwapRequest,
};
use crate::error::{MatchEngineError, Result};
use crate::metrics::{MetricSummary, MetricsCollector};
use crate::ranking::{score_match, OverlapRanker, Ranker};
use crate::store::{
    MessageStore, ProfileStore, RequestFilters, RequestPage, SearchFilters, SearchPage,
    SkillEntry, SqliteStore, Store, StoreStats, SwapStore,
};

/// Main match engine orchestrator
pub struct MatchEngine {
    store: Arc<dyn Store>,
    ranker: Arc<dyn Ranker>,
    metrics: Arc<MetricsCollector>,
    options: MatchOptions,
}

/// Match query parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchQuery {
    pub user_id: String,

    /// Cap on returned matches; `None` uses the engine default, `Some(0)` means all
    #[serde(default)]
    pub max_results: Option<usize>,

    /// Override of the engine's minimum score
    #[serde(default)]
    pub min_score: Option<u32>,
}

impl MatchQuery {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            max_results: None,
            min_score: None,
        }
    }
}

/// Match options/configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub default_max_results: usize,
    pub min_score: u32,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            default_max_results: 10,
            min_score: 0,
        }
    }
}

/// Outcome of a bulk profile import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,

    /// (profile id, reason) for each record the store refused
    pub rejected: Vec<(String, String)>,
}

/// Ranked swap partners for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub user_id: String,

    /// Best first
    pub matches: Vec<RankedMatch>,

    /// Candidates scored before filtering and truncation
    pub total_candidates: usize,

    pub latency_ms: f64,

    /// Ranker used (skill-overlap, ...)
    pub ranking_method: String,
}

impl MatchEngine {
    /// Create new match engine backed by a SQLite profile store
    pub async fn new(db_path: impl AsRef<str>) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(db_path.as_ref()).await?);
        Ok(Self::with_components(
            store,
            Arc::new(OverlapRanker::new()),
            Arc::new(MetricsCollector::new()),
        ))
    }

    pub fn with_components(
        store: Arc<dyn Store>,
        ranker: Arc<dyn Ranker>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            ranker,
            metrics,
            options: MatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    /// Rank every eligible candidate for `query.user_id`
    pub async fn find_matches(&self, query: MatchQuery) -> Result<MatchResponse> {
        let timer = self.metrics.start_timer("find_matches");

        let current = self
            .store
            .get_snapshot(&query.user_id)
            .await?
            .ok_or_else(|| MatchEngineError::ProfileNotFound(query.user_id.clone()))?;

        let candidates = self.store.candidates_for(&query.user_id).await?;
        let total_candidates = candidates.len();

        let min_score = query.min_score.unwrap_or(self.options.min_score);
        let max_results = query.max_results.unwrap_or(self.options.default_max_results);

        let mut matches: Vec<RankedMatch> = self
            .ranker
            .rank(&current, &candidates)
            .into_iter()
            .filter(|m| m.score() >= min_score)
            .collect();
        if max_results > 0 {
            matches.truncate(max_results);
        }

        tracing::debug!(
            "Ranked {} candidates for {} with {}, kept {}",
            total_candidates,
            query.user_id,
            self.ranker.name(),
            matches.len()
        );

        Ok(MatchResponse {
            user_id: query.user_id,
            matches,
            total_candidates,
            latency_ms: timer.elapsed_ms(),
            ranking_method: self.ranker.name().to_string(),
        })
    }

    /// Score a single pair of stored profiles
    pub async fn score_pair(&self, user_id: &str, other_id: &str) -> Result<MatchResult> {
        let _timer = self.metrics.start_timer("score_pair");

        let current = self
            .store
            .get_snapshot(user_id)
            .await?
            .ok_or_else(|| MatchEngineError::ProfileNotFound(user_id.to_string()))?;
        let other = self
            .store
            .get_snapshot(other_id)
            .await?
            .ok_or_else(|| MatchEngineError::ProfileNotFound(other_id.to_string()))?;

        Ok(score_match(&current, &other))
    }

    /// Browse the public directory
    pub async fn search(&self, filters: &SearchFilters) -> Result<SearchPage> {
        let _timer = self.metrics.start_timer("search");
        self.store.search(filters).await
    }

    pub async fn upsert_profile(&self, record: &ProfileRecord) -> Result<()> {
        let _timer = self.metrics.start_timer("upsert_profile");
        self.store.upsert_profile(record).await?;
        tracing::info!("👤 Profile {} saved", record.id());
        Ok(())
    }

    pub async fn set_banned(&self, user_id: &str, banned: bool) -> Result<()> {
        if !self.store.set_banned(user_id, banned).await? {
            return Err(MatchEngineError::ProfileNotFound(user_id.to_string()));
        }
        tracing::info!("🔨 User {} {}", user_id, if banned { "banned" } else { "unbanned" });
        Ok(())
    }

    pub async fn delete_profile(&self, user_id: &str) -> Result<()> {
        if !self.store.delete_profile(user_id).await? {
            return Err(MatchEngineError::ProfileNotFound(user_id.to_string()));
        }
        tracing::info!("🗑️ User {} deleted", user_id);
        Ok(())
    }

    /// Parse a JSON array of profile records and upsert each one.
    ///
    /// Malformed JSON fails the whole import; records that fail validation
    /// are reported and skipped.
    pub async fn import_profiles(&self, json: &str) -> Result<ImportReport> {
        let records: Vec<ProfileRecord> = serde_json::from_str(json)?;

        let mut report = ImportReport::default();
        for record in &records {
            match self.upsert_profile(record).await {
                Ok(()) => report.imported += 1,
                Err(e @ MatchEngineError::Validation(_)) => {
                    tracing::warn!("⚠️ Skipping profile {}: {}", record.id(), e);
                    report.rejected.push((record.id().to_string(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "📥 Imported {} profiles ({} rejected)",
            report.imported,
            report.rejected.len()
        );
        Ok(report)
    }

    pub async fn list_skills(&self, pending_only: bool) -> Result<Vec<SkillEntry>> {
        self.store.list_skills(pending_only).await
    }

    /// Approve a skill, or reject it and drop it from every profile
    pub async fn review_skill(&self, name: &str, approved: bool) -> Result<()> {
        if !self.store.set_skill_approval(name, approved).await? {
            return Err(MatchEngineError::not_found(format!("skill '{}'", name)));
        }
        tracing::info!("🏷️ Skill {} {}", name, if approved { "approved" } else { "rejected" });
        Ok(())
    }

    pub async fn create_request(&self, request: &NewSwapRequest) -> Result<SwapRequest> {
        let _timer = self.metrics.start_timer("create_request");
        let created = self.store.create_request(request).await?;
        tracing::info!(
            "📨 Request {}: {} offers {} to {} for {}",
            created.id,
            created.sender_id,
            created.sender_skill,
            created.receiver_id,
            created.receiver_skill
        );
        Ok(created)
    }

    pub async fn get_request(&self, id: i64) -> Result<SwapRequest> {
        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| MatchEngineError::not_found(format!("swap request {}", id)))
    }

    pub async fn list_requests(&self, user_id: &str, filters: &RequestFilters) -> Result<RequestPage> {
        let _timer = self.metrics.start_timer("list_requests");
        self.store.list_requests(user_id, filters).await
    }

    pub async fn respond_to_request(
        &self,
        actor_id: &str,
        id: i64,
        decision: SwapDecision,
    ) -> Result<SwapRequest> {
        let updated = self.store.respond_to_request(actor_id, id, decision).await?;
        tracing::info!("📬 Request {} {} by {}", id, updated.status, actor_id);
        Ok(updated)
    }

    pub async fn delete_request(&self, actor_id: &str, id: i64) -> Result<()> {
        self.store.delete_request(actor_id, id).await?;
        tracing::info!("🗑️ Request {} withdrawn by {}", id, actor_id);
        Ok(())
    }

    pub async fn rate_request(&self, rating: &NewRating) -> Result<Rating> {
        let stored = self.store.rate_request(rating).await?;
        tracing::info!(
            "⭐ {} rated {} with {} (request {})",
            stored.giver_id,
            stored.receiver_id,
            stored.rating,
            stored.request_id
        );
        Ok(stored)
    }

    pub async fn post_message(&self, message: &NewAdminMessage) -> Result<AdminMessage> {
        let stored = self.store.create_message(message).await?;
        tracing::info!("📢 Message {} posted: {}", stored.id, stored.title);
        Ok(stored)
    }

    /// Active messages only unless `include_inactive`
    pub async fn messages(&self, include_inactive: bool) -> Result<Vec<AdminMessage>> {
        self.store.list_messages(!include_inactive).await
    }

    pub async fn set_message_active(&self, id: i64, active: bool) -> Result<()> {
        if !self.store.set_message_active(id, active).await? {
            return Err(MatchEngineError::not_found(format!("message {}", id)));
        }
        tracing::info!("📢 Message {} {}", id, if active { "activated" } else { "deactivated" });
        Ok(())
    }

    /// Get store statistics
    pub async fn store_stats(&self) -> Result<StoreStats> {
        self.store.stats().await
    }

    /// Average timings per operation
    pub fn metrics_snapshot(&self) -> BTreeMap<String, MetricSummary> {
        self.metrics.snapshot()
    }

    pub fn ranking_method(&self) -> &str {
        self.ranker.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ProfileSnapshot, ProficiencyLevel::*, SkillClaim, SwapRequestStatus};

    async fn engine_with(records: Vec<ProfileRecord>) -> MatchEngine {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        for record in &records {
            engine.upsert_profile(record).await.unwrap();
        }
        engine
    }

    fn record(id: &str, snapshot: ProfileSnapshot) -> ProfileRecord {
        ProfileRecord::new(format!("User {}", id), snapshot)
    }

    #[tokio::test]
    async fn test_engine_creation() {
        let result = MatchEngine::new(":memory:").await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap().ranking_method(), "skill-overlap");
    }

    #[tokio::test]
    async fn test_find_matches_unknown_user() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        let err = engine.find_matches(MatchQuery::new("ghost")).await.unwrap_err();
        assert!(matches!(err, MatchEngineError::ProfileNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_find_matches_ranks_and_filters() {
        let engine = engine_with(vec![
            record("me", ProfileSnapshot::new("me").with_claim(SkillClaim::offered("Python", Advanced))),
            record("a", ProfileSnapshot::new("a").with_claim(SkillClaim::wanted("Python", Beginner))),
            record("b", ProfileSnapshot::new("b").with_claim(SkillClaim::wanted("Python", Advanced))),
            record("c", ProfileSnapshot::new("c")),
        ])
        .await;

        let response = engine.find_matches(MatchQuery::new("me")).await.unwrap();
        let scores: Vec<(&str, u32)> = response
            .matches
            .iter()
            .map(|m| (m.profile.id.as_str(), m.score()))
            .collect();

        assert_eq!(response.total_candidates, 3);
        assert_eq!(scores, vec![("b", 25), ("a", 15), ("c", 0)]);
        assert_eq!(response.ranking_method, "skill-overlap");

        let filtered = engine
            .find_matches(MatchQuery {
                min_score: Some(20),
                ..MatchQuery::new("me")
            })
            .await
            .unwrap();
        assert_eq!(filtered.matches.len(), 1);

        let truncated = engine
            .find_matches(MatchQuery {
                max_results: Some(2),
                ..MatchQuery::new("me")
            })
            .await
            .unwrap();
        assert_eq!(truncated.matches.len(), 2);
        assert_eq!(truncated.total_candidates, 3);
    }

    #[tokio::test]
    async fn test_engine_options_apply() {
        let engine = engine_with(vec![
            record("me", ProfileSnapshot::new("me").with_availability(["weekends"])),
            record("a", ProfileSnapshot::new("a").with_availability(["weekends"])),
            record("b", ProfileSnapshot::new("b")),
        ])
        .await
        .with_options(MatchOptions {
            default_max_results: 0,
            min_score: 5,
        });

        let response = engine.find_matches(MatchQuery::new("me")).await.unwrap();
        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.matches[0].profile.id, "a");
    }

    #[tokio::test]
    async fn test_score_pair() {
        let engine = engine_with(vec![
            record("me", ProfileSnapshot::new("me").with_claim(SkillClaim::wanted("Guitar", Beginner))),
            record("a", ProfileSnapshot::new("a").with_claim(SkillClaim::offered("Guitar", Beginner))),
        ])
        .await;

        let result = engine.score_pair("me", "a").await.unwrap();
        assert_eq!(result.score, 25);
        assert!(result.matched_skills.is_empty());

        assert!(matches!(
            engine.score_pair("me", "zz").await,
            Err(MatchEngineError::ProfileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_moderation_unknown_user() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        assert!(matches!(
            engine.set_banned("ghost", true).await,
            Err(MatchEngineError::ProfileNotFound(_))
        ));
        assert!(matches!(
            engine.delete_profile("ghost").await,
            Err(MatchEngineError::ProfileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_operations_are_timed() {
        let engine = engine_with(vec![record("me", ProfileSnapshot::new("me"))]).await;
        engine.find_matches(MatchQuery::new("me")).await.unwrap();
        engine.search(&SearchFilters::default()).await.unwrap();

        let metrics = engine.metrics_snapshot();
        assert_eq!(metrics["find_matches"].count, 1);
        assert_eq!(metrics["search"].count, 1);
        assert_eq!(metrics["upsert_profile"].count, 1);
    }

    #[tokio::test]
    async fn test_profile_edit_does_not_lift_ban() {
        let engine = engine_with(vec![
            record("me", ProfileSnapshot::new("me").with_claim(SkillClaim::offered("Python", Advanced))),
            record("spam", ProfileSnapshot::new("spam").with_claim(SkillClaim::wanted("Python", Advanced))),
        ])
        .await;
        engine.set_banned("spam", true).await.unwrap();

        engine
            .upsert_profile(&record("spam", ProfileSnapshot::new("spam").with_location("Paris")))
            .await
            .unwrap();

        let response = engine.find_matches(MatchQuery::new("me")).await.unwrap();
        assert_eq!(response.total_candidates, 0);
        assert!(response.matches.is_empty());
    }

    #[tokio::test]
    async fn test_import_profiles() {
        let engine = MatchEngine::new(":memory:").await.unwrap();

        let report = engine
            .import_profiles(
                r#"[
                    {"id": "a", "name": "Anna"},
                    {"id": "b", "name": "B"},
                    {"id": "c", "name": "Chris", "availability": ["weekends"]}
                ]"#,
            )
            .await
            .unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, "b");

        let err = engine.import_profiles("[{\"id\": ").await.unwrap_err();
        assert!(matches!(err, MatchEngineError::Json(_)));
        assert_eq!(engine.store_stats().await.unwrap().total_profiles, 2);
    }

    #[tokio::test]
    async fn test_request_flow_through_engine() {
        let engine = engine_with(vec![
            record("me", ProfileSnapshot::new("me").with_claim(SkillClaim::offered("Python", Advanced))),
            record("a", ProfileSnapshot::new("a").with_claim(SkillClaim::offered("Guitar", Expert))),
        ])
        .await;

        let request = engine
            .create_request(&NewSwapRequest::new("me", "a", "Python", "Guitar"))
            .await
            .unwrap();
        engine
            .respond_to_request("a", request.id, SwapDecision::Accept)
            .await
            .unwrap();
        engine
            .rate_request(&NewRating::new(request.id, "a", 5))
            .await
            .unwrap();

        let done = engine.get_request(request.id).await.unwrap();
        assert_eq!(done.status, SwapRequestStatus::Completed);
        assert_eq!(done.rating.map(|r| r.receiver_id), Some("me".to_string()));

        assert!(matches!(
            engine.get_request(request.id + 1).await,
            Err(MatchEngineError::NotFound(_))
        ));
        assert_eq!(engine.metrics_snapshot()["create_request"].count, 1);
    }

    #[tokio::test]
    async fn test_admin_operations_unknown_targets() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        assert!(matches!(
            engine.review_skill("Cobol", true).await,
            Err(MatchEngineError::NotFound(_))
        ));
        assert!(matches!(
            engine.set_message_active(3, false).await,
            Err(MatchEngineError::NotFound(_))
        ));

        let message = engine
            .post_message(&NewAdminMessage::new("Hello", "Welcome to the exchange"))
            .await
            .unwrap();
        engine.set_message_active(message.id, false).await.unwrap();
        assert!(engine.messages(false).await.unwrap().is_empty());
        assert_eq!(engine.messages(true).await.unwrap().len(), 1);
    }

    #[test]
    fn test_blocking_use_from_sync_code() {
        let engine = tokio_test::block_on(MatchEngine::new(":memory:")).unwrap();
        let stats = tokio_test::block_on(engine.store_stats()).unwrap();
        assert_eq!(stats.total_profiles, 0);
    }
}
