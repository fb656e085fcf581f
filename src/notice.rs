//! Transient user notices
//!
//! Every outcome a page shows as a short-lived banner is a [`Notice`]. Errors
//! never terminate the process; they are turned into a destructive notice.

use crate::error::FrontdeskError;
use serde::{Deserialize, Serialize};

/// Visual weight of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// A title plus one line of detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Default,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }

    pub fn is_error(&self) -> bool {
        self.variant == NoticeVariant::Destructive
    }

    pub fn call_started() -> Self {
        Self::info("Call Started", "AI Agent is now active")
    }

    pub fn call_ended() -> Self {
        Self::info("Call Ended", "AI Agent conversation closed")
    }

    pub fn help_requested() -> Self {
        Self::info("Help Requested", "Question sent to supervisor")
    }

    pub fn answer_submitted() -> Self {
        Self::info(
            "Success",
            "Answer submitted and caller notified (simulated)",
        )
    }

    /// Destructive notice for a failure, using `fallback` when the error
    /// carries no message worth showing to the user
    pub fn from_error(err: &FrontdeskError, fallback: &str) -> Self {
        match err {
            FrontdeskError::Validation(msg)
            | FrontdeskError::NotFound(msg)
            | FrontdeskError::InvalidOperation(msg) => Self::error(msg.clone()),
            _ => Self::error(fallback),
        }
    }
}
