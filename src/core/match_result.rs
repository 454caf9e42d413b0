use serde::{Deserialize, Serialize};

use crate::core::ProfileSnapshot;

/// One forward skill pair: current user offers what the other user wants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedSkill {
    /// Skill name on the offering side
    pub user_offered: String,

    /// Skill name on the wanting side (same name by construction)
    pub other_wanted: String,

    /// Absolute rank distance between the two levels
    pub level_difference: u8,
}

/// Compatibility of one candidate with the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Candidate's user id
    pub user_id: String,

    pub score: u32,

    #[serde(default)]
    pub matched_skills: Vec<MatchedSkill>,
}

impl MatchResult {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            score: 0,
            matched_skills: Vec::new(),
        }
    }

    pub fn display(&self) -> String {
        let skills: Vec<&str> = self
            .matched_skills
            .iter()
            .map(|m| m.user_offered.as_str())
            .collect();
        format!("{} - {} [{}]", self.user_id, self.score, skills.join(", "))
    }
}

/// A candidate paired with its match result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub profile: ProfileSnapshot,
    pub match_result: MatchResult,
}

impl RankedMatch {
    pub fn new(profile: ProfileSnapshot, match_result: MatchResult) -> Self {
        Self {
            profile,
            match_result,
        }
    }

    pub fn score(&self) -> u32 {
        self.match_result.score
    }
}
