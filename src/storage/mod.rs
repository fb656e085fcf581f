//! Storage layer for the Frontdesk help desk
//!
//! Holds the three backend tables: `help_requests`, `supervisor_responses`
//! and `knowledge_base`.

pub mod libsql;

use crate::error::Result;
use crate::types::{
    HelpRequest, KnowledgeBaseEntry, NewHelpRequest, RequestId, RequestStatus,
    RequestWithResponse, Resolution,
};
use async_trait::async_trait;

/// Storage backend trait defining all required operations
#[async_trait]
pub trait HelpDeskStore: Send + Sync {
    /// Insert a new pending help request
    async fn create_help_request(&self, request: NewHelpRequest) -> Result<HelpRequest>;

    /// Retrieve a help request by ID
    async fn get_help_request(&self, id: RequestId) -> Result<HelpRequest>;

    /// List help requests newest-first, optionally restricted to one status
    async fn list_help_requests(&self, status: Option<RequestStatus>) -> Result<Vec<HelpRequest>>;

    /// List every request joined with its answer, newest-first
    async fn list_request_history(&self) -> Result<Vec<RequestWithResponse>>;

    /// Answer a pending request
    ///
    /// Inserts the response, inserts the derived knowledge entry and marks the
    /// request resolved in a single transaction.
    async fn resolve_request(&self, id: RequestId, answer: &str) -> Result<Resolution>;

    /// List learned knowledge newest-first
    async fn list_knowledge(&self) -> Result<Vec<KnowledgeBaseEntry>>;

    /// Count help requests, optionally restricted to one status
    async fn count_requests(&self, status: Option<RequestStatus>) -> Result<usize>;
}
