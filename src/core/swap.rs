use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MatchEngineError, Result};

/// Lifecycle of a swap request
///
/// Requests start `Pending`. The receiver moves them to `Accepted` or
/// `Rejected`; the first rating on an accepted request moves it to
/// `Completed`. `Cancelled` is accepted from stored data and filters but
/// nothing in the engine produces it: a sender withdraws a pending request by
/// deleting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwapRequestStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl SwapRequestStatus {
    pub const ALL: [SwapRequestStatus; 5] = [
        SwapRequestStatus::Pending,
        SwapRequestStatus::Accepted,
        SwapRequestStatus::Rejected,
        SwapRequestStatus::Completed,
        SwapRequestStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SwapRequestStatus::Pending => "PENDING",
            SwapRequestStatus::Accepted => "ACCEPTED",
            SwapRequestStatus::Rejected => "REJECTED",
            SwapRequestStatus::Completed => "COMPLETED",
            SwapRequestStatus::Cancelled => "CANCELLED",
        }
    }

    /// Only exchanges that actually took place can be rated
    pub fn is_rateable(self) -> bool {
        matches!(self, SwapRequestStatus::Accepted | SwapRequestStatus::Completed)
    }
}

impl fmt::Display for SwapRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwapRequestStatus {
    type Err = MatchEngineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MatchEngineError::validation(format!("unknown request status '{}'", s)))
    }
}

/// The receiver's answer to a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDecision {
    #[serde(rename = "ACCEPTED")]
    Accept,
    #[serde(rename = "REJECTED")]
    Reject,
}

impl SwapDecision {
    pub fn status(self) -> SwapRequestStatus {
        match self {
            SwapDecision::Accept => SwapRequestStatus::Accepted,
            SwapDecision::Reject => SwapRequestStatus::Rejected,
        }
    }
}

/// Which side of a request the listing user is on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDirection {
    Sent,
    Received,
    #[default]
    All,
}

impl FromStr for RequestDirection {
    type Err = MatchEngineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sent" => Ok(RequestDirection::Sent),
            "received" => Ok(RequestDirection::Received),
            "all" | "" => Ok(RequestDirection::All),
            other => Err(MatchEngineError::validation(format!(
                "unknown request direction '{}'",
                other
            ))),
        }
    }
}

/// Proposal to trade one offered skill for another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSwapRequest {
    pub sender_id: String,
    pub receiver_id: String,

    /// Skill the sender offers in exchange
    pub sender_skill: String,

    /// Skill the sender wants from the receiver
    pub receiver_skill: String,

    #[serde(default)]
    pub message: Option<String>,
}

impl NewSwapRequest {
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        sender_skill: impl Into<String>,
        receiver_skill: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            sender_skill: sender_skill.into(),
            receiver_skill: receiver_skill.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Shape checks; ownership of the skills is checked by the store
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("sender_id", &self.sender_id),
            ("receiver_id", &self.receiver_id),
            ("sender_skill", &self.sender_skill),
            ("receiver_skill", &self.receiver_skill),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(MatchEngineError::validation(format!("{}: is required", field)));
            }
        }
        if self.sender_id == self.receiver_id {
            return Err(MatchEngineError::validation(
                "receiver_id: cannot send a request to yourself",
            ));
        }
        Ok(())
    }

    /// Message with blanks dropped
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }
}

/// A stored swap request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub sender_skill: String,
    pub receiver_skill: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub status: SwapRequestStatus,
    pub created_at: String,
    pub updated_at: String,

    /// Set when the receiver accepts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

impl SwapRequest {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// The other side of the exchange, if `user_id` takes part in it
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        if self.sender_id == user_id {
            Some(&self.receiver_id)
        } else if self.receiver_id == user_id {
            Some(&self.sender_id)
        } else {
            None
        }
    }
}

/// A participant's rating of a finished exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRating {
    pub request_id: i64,
    pub rater_id: String,
    pub rating: u8,

    #[serde(default)]
    pub feedback: Option<String>,
}

impl NewRating {
    pub fn new(request_id: i64, rater_id: impl Into<String>, rating: u8) -> Self {
        Self {
            request_id,
            rater_id: rater_id.into(),
            rating,
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(MatchEngineError::validation("rating: must be between 1 and 5"));
        }
        if self.rater_id.trim().is_empty() {
            return Err(MatchEngineError::validation("rater_id: is required"));
        }
        Ok(())
    }

    /// Trimmed feedback; blank feedback is not stored
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }
}

/// A stored rating, one per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: i64,
    pub request_id: i64,

    /// Who rated
    pub giver_id: String,

    /// Who was rated
    pub receiver_id: String,

    pub rating: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,

    pub created_at: String,
}
