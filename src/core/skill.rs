use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MatchEngineError;

/// Skill categories offered by the directory filters
pub const SKILL_CATEGORIES: [&str; 6] = [
    "Programming",
    "Design",
    "Office",
    "Language",
    "Creative",
    "Business",
];

/// Availability vocabulary accepted on profiles
pub const AVAILABILITY_OPTIONS: [&str; 6] = [
    "weekdays",
    "weekends",
    "evenings",
    "mornings",
    "afternoons",
    "flexible",
];

/// How well someone knows a skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

/// Level → rank table used for level distances.
const LEVEL_RANKS: [(ProficiencyLevel, u8); 4] = [
    (ProficiencyLevel::Beginner, 1),
    (ProficiencyLevel::Intermediate, 2),
    (ProficiencyLevel::Advanced, 3),
    (ProficiencyLevel::Expert, 4),
];

impl ProficiencyLevel {
    pub const ALL: [ProficiencyLevel; 4] = [
        ProficiencyLevel::Beginner,
        ProficiencyLevel::Intermediate,
        ProficiencyLevel::Advanced,
        ProficiencyLevel::Expert,
    ];

    /// Rank 1 (beginner) through 4 (expert)
    pub fn rank(self) -> u8 {
        LEVEL_RANKS
            .iter()
            .find(|(level, _)| *level == self)
            .map(|(_, rank)| *rank)
            .unwrap_or(1)
    }

    /// Absolute rank difference between two levels
    pub fn distance(self, other: ProficiencyLevel) -> u8 {
        self.rank().abs_diff(other.rank())
    }

    /// Wire name, as stored and serialized
    pub fn as_str(self) -> &'static str {
        match self {
            ProficiencyLevel::Beginner => "BEGINNER",
            ProficiencyLevel::Intermediate => "INTERMEDIATE",
            ProficiencyLevel::Advanced => "ADVANCED",
            ProficiencyLevel::Expert => "EXPERT",
        }
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProficiencyLevel {
    type Err = MatchEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MatchEngineError::validation(format!("unknown skill level '{}'", s)))
    }
}

/// Whether a claim is something the holder teaches or wants to learn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClaimKind {
    Offered,
    Wanted,
}

impl ClaimKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimKind::Offered => "OFFERED",
            ClaimKind::Wanted => "WANTED",
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimKind {
    type Err = MatchEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OFFERED" => Ok(ClaimKind::Offered),
            "WANTED" => Ok(ClaimKind::Wanted),
            other => Err(MatchEngineError::validation(format!(
                "unknown claim kind '{}'",
                other
            ))),
        }
    }
}

/// A named capability; the name is its identity for matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl SkillRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
        }
    }
}

/// A skill tagged as offered or wanted, at a given level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillClaim {
    #[serde(flatten)]
    pub skill: SkillRef,
    pub level: ProficiencyLevel,
    pub kind: ClaimKind,
}

impl SkillClaim {
    pub fn new(name: impl Into<String>, level: ProficiencyLevel, kind: ClaimKind) -> Self {
        Self {
            skill: SkillRef::new(name),
            level,
            kind,
        }
    }

    pub fn offered(name: impl Into<String>, level: ProficiencyLevel) -> Self {
        Self::new(name, level, ClaimKind::Offered)
    }

    pub fn wanted(name: impl Into<String>, level: ProficiencyLevel) -> Self {
        Self::new(name, level, ClaimKind::Wanted)
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.skill.category = Some(category.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.skill.name
    }
}
