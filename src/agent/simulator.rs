//! Simulated phone call between a caller and the AI receptionist
//!
//! A [`CallSession`] is the whole per-call state: whether the line is open and
//! the conversation so far. Unknown questions are escalated to the help desk
//! as pending help requests.

use super::knowledge::find_known_answer;
use crate::desk::HelpDesk;
use crate::error::{FrontdeskError, Result};
use crate::notice::Notice;
use crate::types::{CallId, HelpRequest, NewHelpRequest};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Said when the agent has to ask a human
pub const DEFERRAL_MESSAGE: &str = "Let me check with my supervisor and get back to you.";

/// Who said a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Agent,
    Caller,
}

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Speaker,
    pub message: String,
}

impl ChatMessage {
    pub fn agent(message: impl Into<String>) -> Self {
        Self {
            role: Speaker::Agent,
            message: message.into(),
        }
    }

    pub fn caller(message: impl Into<String>) -> Self {
        Self {
            role: Speaker::Caller,
            message: message.into(),
        }
    }
}

/// Result of asking a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AskOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// The keyword table had an answer
    Answered { answer: String },
    /// Escalated to a supervisor
    Escalated { request: HelpRequest },
}

impl AskOutcome {
    /// Notice to show for this outcome, if any
    pub fn notice(&self) -> Option<Notice> {
        match self {
            AskOutcome::Escalated { .. } => Some(Notice::help_requested()),
            _ => None,
        }
    }
}

/// State of one simulated call
#[derive(Debug, Clone, Serialize)]
pub struct CallSession {
    id: CallId,
    business_name: String,
    #[serde(skip)]
    reply_delay: Duration,
    active: bool,
    conversation: Vec<ChatMessage>,
}

impl CallSession {
    pub fn new(business_name: impl Into<String>) -> Self {
        Self {
            id: CallId::new(),
            business_name: business_name.into(),
            reply_delay: Duration::ZERO,
            active: false,
            conversation: Vec::new(),
        }
    }

    /// Pause before each agent reply
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn conversation(&self) -> &[ChatMessage] {
        &self.conversation
    }

    pub fn greeting(&self) -> String {
        format!(
            "Hello! Thank you for calling {}. How can I help you today?",
            self.business_name
        )
    }

    /// Open the line and greet the caller
    pub fn start_call(&mut self) -> Notice {
        self.active = true;
        self.conversation = vec![ChatMessage::agent(self.greeting())];
        debug!("Call {} started", self.id);
        Notice::call_started()
    }

    /// Handle one caller question
    ///
    /// The deferral line is appended before the help request is written and
    /// stays in the conversation even if the write fails.
    pub async fn ask_question(&mut self, desk: &HelpDesk, text: &str) -> Result<AskOutcome> {
        let question = text.trim();
        if question.is_empty() {
            return Ok(AskOutcome::Ignored);
        }

        if !self.active {
            return Err(FrontdeskError::InvalidOperation(
                "No active call".to_string(),
            ));
        }

        self.conversation.push(ChatMessage::caller(question));
        let known = find_known_answer(question);

        if !self.reply_delay.is_zero() {
            tokio::time::sleep(self.reply_delay).await;
        }

        if let Some(answer) = known {
            self.conversation.push(ChatMessage::agent(answer));
            return Ok(AskOutcome::Answered {
                answer: answer.to_string(),
            });
        }

        self.conversation.push(ChatMessage::agent(DEFERRAL_MESSAGE));

        let caller_info = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "simulated": true,
            "call_id": self.id,
        });

        match desk
            .request_help(NewHelpRequest::new(question, caller_info))
            .await
        {
            Ok(request) => Ok(AskOutcome::Escalated { request }),
            Err(e) => {
                warn!("Call {}: failed to create help request: {}", self.id, e);
                Err(e)
            }
        }
    }

    /// Hang up and forget the conversation
    pub fn end_call(&mut self) -> Notice {
        self.active = false;
        self.conversation.clear();
        debug!("Call {} ended", self.id);
        Notice::call_ended()
    }
}
