pub mod exchange;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{
    AdminMessage, NewAdminMessage, NewRating, NewSwapRequest, ProficiencyLevel, ProfileRecord,
    ProfileSnapshot, PublicProfile, Rating, RequestDirection, SwapDecision, SwapRequest,
    SwapRequestStatus,
};
use crate::error::{MatchEngineError, Result};

pub use sqlite::SqliteStore;

/// Largest page a directory search may ask for
pub const MAX_PAGE_LIMIT: u32 = 50;
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Trait for profile snapshot providers
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Validate and insert or replace a profile with its claims and availability
    async fn upsert_profile(&self, record: &ProfileRecord) -> Result<()>;

    /// Load a profile snapshot by user id
    async fn get_snapshot(&self, id: &str) -> Result<Option<ProfileSnapshot>>;

    /// Public, non-banned profiles other than `id`, newest first
    async fn candidates_for(&self, id: &str) -> Result<Vec<ProfileSnapshot>>;

    /// Filtered, paginated directory of public profiles
    async fn search(&self, filters: &SearchFilters) -> Result<SearchPage>;

    /// Ban or unban a user; false if the user does not exist
    async fn set_banned(&self, id: &str, banned: bool) -> Result<bool>;

    /// Remove a user and everything attached to it
    async fn delete_profile(&self, id: &str) -> Result<bool>;

    /// Skill catalog with how many profiles claim each skill
    async fn list_skills(&self, pending_only: bool) -> Result<Vec<SkillEntry>>;

    /// Approve a skill, or reject it: a rejected skill is removed from the
    /// catalog and from every profile claiming it. False if unknown.
    async fn set_skill_approval(&self, name: &str, approved: bool) -> Result<bool>;

    /// Get store statistics
    async fn stats(&self) -> Result<StoreStats>;
}

/// Trait for the swap-request lifecycle and the ratings anchored to it
#[async_trait]
pub trait SwapStore: Send + Sync {
    /// Open a PENDING request; both skills must be offered by their owners
    async fn create_request(&self, request: &NewSwapRequest) -> Result<SwapRequest>;

    async fn get_request(&self, id: i64) -> Result<Option<SwapRequest>>;

    /// Requests `user_id` sent and/or received, newest first
    async fn list_requests(&self, user_id: &str, filters: &RequestFilters) -> Result<RequestPage>;

    /// Receiver accepts or rejects a PENDING request
    async fn respond_to_request(
        &self,
        actor_id: &str,
        id: i64,
        decision: SwapDecision,
    ) -> Result<SwapRequest>;

    /// Sender withdraws a PENDING request
    async fn delete_request(&self, actor_id: &str, id: i64) -> Result<()>;

    /// A participant rates an ACCEPTED or COMPLETED request, once
    async fn rate_request(&self, rating: &NewRating) -> Result<Rating>;
}

/// Trait for admin announcements
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_message(&self, message: &NewAdminMessage) -> Result<AdminMessage>;

    /// Newest first; `active_only` is the user-facing view
    async fn list_messages(&self, active_only: bool) -> Result<Vec<AdminMessage>>;

    /// False if the message does not exist
    async fn set_message_active(&self, id: i64, active: bool) -> Result<bool>;
}

/// Everything the engine needs from its backing store
pub trait Store: ProfileStore + SwapStore + MessageStore {}

impl<T: ProfileStore + SwapStore + MessageStore> Store for T {}

fn validate_page(page: u32, limit: u32) -> Result<()> {
    if page < 1 {
        return Err(MatchEngineError::validation("page: must be at least 1"));
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(MatchEngineError::validation(format!(
            "limit: must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    Ok(())
}

fn page_offset(page: u32, limit: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(limit)
}

/// Directory search filters; empty strings count as unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Substring of name, location or any skill name
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub skill_category: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub skill_level: Option<ProficiencyLevel>,

    #[serde(default)]
    pub availability: Option<String>,

    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            query: None,
            skill_category: None,
            location: None,
            skill_level: None,
            availability: None,
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl SearchFilters {
    pub fn validate(&self) -> Result<()> {
        validate_page(self.page, self.limit)
    }

    pub fn offset(&self) -> u64 {
        page_offset(self.page, self.limit)
    }

    pub(crate) fn query(&self) -> Option<&str> {
        non_empty(&self.query)
    }

    pub(crate) fn skill_category(&self) -> Option<&str> {
        non_empty(&self.skill_category)
    }

    pub(crate) fn location(&self) -> Option<&str> {
        non_empty(&self.location)
    }

    pub(crate) fn availability(&self) -> Option<&str> {
        non_empty(&self.availability)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Page position of a search result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total_count: u64) -> Self {
        let limit = u64::from(limit.max(1));
        let total_pages = u32::try_from(total_count.div_ceil(limit)).unwrap_or(u32::MAX);
        Self {
            current_page: page,
            total_pages,
            total_count,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// One page of directory results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub profiles: Vec<PublicProfile>,
    pub pagination: Pagination,
    pub filters: SearchFilters,
}

/// Filters for a user's request list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFilters {
    #[serde(default)]
    pub direction: RequestDirection,

    /// `None` lists every status
    #[serde(default)]
    pub status: Option<SwapRequestStatus>,

    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for RequestFilters {
    fn default() -> Self {
        Self {
            direction: RequestDirection::All,
            status: None,
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl RequestFilters {
    pub fn validate(&self) -> Result<()> {
        validate_page(self.page, self.limit)
    }

    pub fn offset(&self) -> u64 {
        page_offset(self.page, self.limit)
    }
}

/// One page of swap requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPage {
    pub requests: Vec<SwapRequest>,
    pub pagination: Pagination,
}

/// Catalog entry for the admin skill review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    pub is_approved: bool,

    /// Profiles currently claiming the skill
    pub claimed_by: u64,
}

/// Store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_profiles: u64,
    pub public_profiles: u64,
    pub banned_profiles: u64,

    /// Distinct skills claimed by at least one profile
    pub total_skills: u64,

    pub total_requests: u64,
    pub pending_requests: u64,
    pub total_ratings: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults() {
        let filters = SearchFilters::default();
        assert_eq!(filters.page, 1);
        assert_eq!(filters.limit, 10);
        assert_eq!(filters.offset(), 0);
        assert!(filters.validate().is_ok());
    }

    #[test]
    fn test_filter_bounds() {
        let mut filters = SearchFilters { page: 0, ..Default::default() };
        assert!(filters.validate().is_err());

        filters.page = 3;
        filters.limit = 51;
        assert!(filters.validate().is_err());

        filters.limit = 0;
        assert!(filters.validate().is_err());

        filters.limit = 20;
        assert!(filters.validate().is_ok());
        assert_eq!(filters.offset(), 40);
    }

    #[test]
    fn test_blank_filters_are_unset() {
        let filters = SearchFilters {
            query: Some("   ".to_string()),
            location: Some(" Paris ".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.query(), None);
        assert_eq!(filters.location(), Some("Paris"));
    }

    #[test]
    fn test_request_filter_bounds() {
        let filters = RequestFilters::default();
        assert_eq!(filters.direction, RequestDirection::All);
        assert!(filters.validate().is_ok());

        let filters = RequestFilters { page: 2, limit: 5, ..Default::default() };
        assert_eq!(filters.offset(), 5);

        let filters = RequestFilters { limit: 51, ..Default::default() };
        assert!(matches!(filters.validate(), Err(MatchEngineError::Validation(_))));
    }

    #[test]
    fn test_request_filters_from_json() {
        let filters: RequestFilters =
            serde_json::from_str(r#"{"direction": "received", "status": "PENDING"}"#).unwrap();
        assert_eq!(filters.direction, RequestDirection::Received);
        assert_eq!(filters.status, Some(SwapRequestStatus::Pending));
        assert_eq!(filters.limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_prev);

        let p = Pagination::new(2, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let p = Pagination::new(3, 10, 30);
        assert_eq!(p.total_pages, 3);
        assert!(!p.has_next);
    }
}
