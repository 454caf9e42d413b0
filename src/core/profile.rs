use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::skill::{ClaimKind, SkillClaim, AVAILABILITY_OPTIONS};
use crate::error::{MatchEngineError, Result};

const NAME_LEN: std::ops::RangeInclusive<usize> = 2..=50;
const SKILL_NAME_LEN: std::ops::RangeInclusive<usize> = 2..=50;

fn default_true() -> bool {
    true
}

/// Read-only view of a user's public attributes, used as scoring input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub id: String,

    /// Free text, e.g. "New York, NY"
    #[serde(default)]
    pub location: Option<String>,

    /// Availability tokens (weekdays, evenings, ...)
    #[serde(default)]
    pub availability: Vec<String>,

    /// Offered and wanted claims, in the order the provider listed them
    #[serde(default)]
    pub claims: Vec<SkillClaim>,
}

impl ProfileSnapshot {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: None,
            availability: Vec::new(),
            claims: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_availability<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.availability = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_claim(mut self, claim: SkillClaim) -> Self {
        self.claims.push(claim);
        self
    }

    /// Claims the holder can teach
    pub fn offered(&self) -> impl Iterator<Item = &SkillClaim> {
        self.claims.iter().filter(|c| c.kind == ClaimKind::Offered)
    }

    /// Claims the holder wants to learn
    pub fn wanted(&self) -> impl Iterator<Item = &SkillClaim> {
        self.claims.iter().filter(|c| c.kind == ClaimKind::Wanted)
    }
}

/// A profile as handed over by the data provider (import file, HTTP body).
///
/// Everything the provider owns about a user. The ban flag is not part of
/// it: only moderation changes that. [`ProfileRecord::validate`] is the
/// single place where provider input is checked; snapshots loaded back from
/// the store are trusted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub name: String,

    #[serde(flatten)]
    pub snapshot: ProfileSnapshot,

    #[serde(default = "default_true")]
    pub is_public: bool,
}

impl ProfileRecord {
    pub fn new(name: impl Into<String>, snapshot: ProfileSnapshot) -> Self {
        Self {
            name: name.into(),
            snapshot,
            is_public: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.snapshot.id
    }

    pub fn validate(&self) -> Result<()> {
        if self.snapshot.id.trim().is_empty() {
            return Err(MatchEngineError::validation("id: must not be empty"));
        }

        let name_len = self.name.trim().chars().count();
        if !NAME_LEN.contains(&name_len) {
            return Err(MatchEngineError::validation(format!(
                "name: must be between {} and {} characters",
                NAME_LEN.start(),
                NAME_LEN.end()
            )));
        }

        let mut seen_tokens = HashSet::new();
        for token in &self.snapshot.availability {
            if !AVAILABILITY_OPTIONS.contains(&token.as_str()) {
                return Err(MatchEngineError::validation(format!(
                    "availability: unknown option '{}'",
                    token
                )));
            }
            if !seen_tokens.insert(token.as_str()) {
                return Err(MatchEngineError::validation(format!(
                    "availability: '{}' listed twice",
                    token
                )));
            }
        }

        let mut seen_claims = HashSet::new();
        for claim in &self.snapshot.claims {
            let len = claim.name().trim().chars().count();
            if !SKILL_NAME_LEN.contains(&len) {
                return Err(MatchEngineError::validation(format!(
                    "skill name '{}': must be between {} and {} characters",
                    claim.name(),
                    SKILL_NAME_LEN.start(),
                    SKILL_NAME_LEN.end()
                )));
            }
            if !seen_claims.insert((claim.kind, claim.name())) {
                return Err(MatchEngineError::validation(format!(
                    "skills: '{}' is already {}",
                    claim.name(),
                    claim.kind.as_str().to_lowercase()
                )));
            }
        }

        Ok(())
    }
}

/// Directory entry returned by profile search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub name: String,

    #[serde(flatten)]
    pub snapshot: ProfileSnapshot,

    /// Mean of received ratings, one decimal, 0 when unrated
    pub average_rating: f64,

    pub total_ratings: u32,
}
