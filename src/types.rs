//! Core data types for the Frontdesk help desk
//!
//! Rows of the three backend tables (help requests, supervisor responses and
//! learned knowledge), plus the identifiers that tie them together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an ID from a string
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a help request
    RequestId
);
uuid_id!(
    /// Identifier of a supervisor response
    ResponseId
);
uuid_id!(
    /// Identifier of a learned knowledge base entry
    EntryId
);
uuid_id!(
    /// Identifier of a simulated call session
    CallId
);

/// Lifecycle of a help request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for a supervisor answer
    Pending,
    /// Answered; has exactly one response and one knowledge entry
    Resolved,
}

impl RequestStatus {
    /// Database / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "resolved" => Ok(RequestStatus::Resolved),
            other => Err(format!("Unknown request status: {}", other)),
        }
    }
}

/// A caller question the automated matcher could not answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpRequest {
    pub id: RequestId,
    pub question: String,
    /// Free-form caller metadata
    pub caller_info: serde_json::Value,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl HelpRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Insert payload for a new help request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHelpRequest {
    pub question: String,
    #[serde(default)]
    pub caller_info: serde_json::Value,
}

impl NewHelpRequest {
    pub fn new(question: impl Into<String>, caller_info: serde_json::Value) -> Self {
        Self {
            question: question.into(),
            caller_info,
        }
    }
}

/// A supervisor's answer to one help request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorResponse {
    pub id: ResponseId,
    pub request_id: RequestId,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// A durable Q&A pair learned from a resolved request
///
/// Used for display and search only; the automated matcher never reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseEntry {
    pub id: EntryId,
    pub question: String,
    pub answer: String,
    pub source_request_id: RequestId,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeBaseEntry {
    /// Case-insensitive substring match over question and answer
    ///
    /// An empty term matches every entry.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.question.to_lowercase().contains(&term) || self.answer.to_lowercase().contains(&term)
    }
}

/// A help request joined with its resolution answer (history row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestWithResponse {
    #[serde(flatten)]
    pub request: HelpRequest,
    pub answer: Option<String>,
    pub answered_at: Option<DateTime<Utc>>,
}

/// Rows written by resolving a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub request: HelpRequest,
    pub response: SupervisorResponse,
    pub entry: KnowledgeBaseEntry,
}
