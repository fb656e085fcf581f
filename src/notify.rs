//! Simulated SMS notifications
//!
//! A real deployment would text the supervisor when a question is escalated
//! and text the caller once it is answered. The demo only logs those messages.

use crate::types::HelpRequest;
use async_trait::async_trait;
use tracing::info;

/// Outbound notification hooks
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A new help request is waiting for a supervisor
    async fn supervisor_alerted(&self, request: &HelpRequest);

    /// A supervisor answered the caller's question
    async fn caller_answered(&self, request: &HelpRequest, answer: &str);
}

/// Notifier that writes the would-be SMS to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn supervisor_alerted(&self, request: &HelpRequest) {
        info!(
            request_id = %request.id,
            "SMS simulation: notifying supervisor about new help request"
        );
    }

    async fn caller_answered(&self, request: &HelpRequest, answer: &str) {
        info!(
            request_id = %request.id,
            "SMS simulation: sending answer to caller: {}",
            answer
        );
    }
}
