use serde::{Deserialize, Serialize};

use crate::error::{MatchEngineError, Result};

/// Announcement posted by an admin to every user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminMessage {
    pub id: i64,
    pub title: String,
    pub content: String,

    /// Inactive messages stay stored but are not shown to users
    pub is_active: bool,

    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdminMessage {
    pub title: String,
    pub content: String,
}

impl NewAdminMessage {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(MatchEngineError::validation("title: is required"));
        }
        if self.content.trim().is_empty() {
            return Err(MatchEngineError::validation("content: is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_validation() {
        assert!(NewAdminMessage::new("Maintenance", "Down at 2am").validate().is_ok());
        assert!(NewAdminMessage::new("  ", "body").validate().is_err());
        assert!(NewAdminMessage::new("Title", "").validate().is_err());
    }
}
