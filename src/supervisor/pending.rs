//! Pending help requests and answer submission

use crate::desk::HelpDesk;
use crate::error::{FrontdeskError, Result};
use crate::events::{ChangeFilter, Table, TableWatcher};
use crate::types::{HelpRequest, RequestId, RequestStatus, Resolution};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Supervisor's queue of unanswered questions
pub struct PendingRequestsView {
    desk: HelpDesk,
    requests: Vec<HelpRequest>,
    drafts: HashMap<RequestId, String>,
    submitting: HashSet<RequestId>,
}

impl PendingRequestsView {
    pub fn new(desk: HelpDesk) -> Self {
        Self {
            desk,
            requests: Vec::new(),
            drafts: HashMap::new(),
            submitting: HashSet::new(),
        }
    }

    /// Changes that make this view stale
    pub fn watch_filter() -> ChangeFilter {
        ChangeFilter::table(Table::HelpRequests).with_status(RequestStatus::Pending)
    }

    /// Subscribe with [`Self::watch_filter`]
    pub fn watch(&self) -> TableWatcher {
        self.desk.watch(Self::watch_filter())
    }

    /// Reload pending requests, newest first
    pub async fn refresh(&mut self) -> Result<()> {
        self.requests = self.desk.pending_requests().await?;

        // Drafts for requests resolved elsewhere are dead
        let live: HashSet<RequestId> = self.requests.iter().map(|r| r.id).collect();
        self.drafts.retain(|id, _| live.contains(id));

        debug!("Pending view refreshed: {} requests", self.requests.len());
        Ok(())
    }

    /// Wait for the next relevant change and reload
    ///
    /// Returns `false` when the change channel has closed.
    pub async fn follow(&mut self, watcher: &mut TableWatcher) -> Result<bool> {
        match watcher.next().await {
            Some(_) => {
                self.refresh().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn requests(&self) -> &[HelpRequest] {
        &self.requests
    }

    pub fn count(&self) -> usize {
        self.requests.len()
    }

    pub fn set_draft(&mut self, id: RequestId, text: impl Into<String>) {
        self.drafts.insert(id, text.into());
    }

    pub fn draft(&self, id: RequestId) -> &str {
        self.drafts.get(&id).map(String::as_str).unwrap_or("")
    }

    pub fn is_submitting(&self, id: RequestId) -> bool {
        self.submitting.contains(&id)
    }

    /// Submit the stored draft for `id`
    pub async fn submit_draft(&mut self, id: RequestId) -> Result<Resolution> {
        let text = self.draft(id).to_string();
        self.submit_answer(id, &text).await
    }

    /// Answer a pending request
    ///
    /// Blank answers fail validation without touching the backend. The request
    /// must be in the currently loaded list.
    pub async fn submit_answer(&mut self, id: RequestId, answer: &str) -> Result<Resolution> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(FrontdeskError::Validation(
                "Please provide an answer".to_string(),
            ));
        }

        if !self.requests.iter().any(|r| r.id == id) {
            return Err(FrontdeskError::NotFound(format!(
                "pending help request {}",
                id
            )));
        }

        if !self.submitting.insert(id) {
            return Err(FrontdeskError::InvalidOperation(format!(
                "Answer for {} is already being submitted",
                id
            )));
        }

        let result = self.desk.resolve(id, answer).await;
        self.submitting.remove(&id);

        let resolution = result?;
        self.drafts.remove(&id);

        if let Err(e) = self.refresh().await {
            warn!("Pending view refresh after submit failed: {}", e);
            self.requests.retain(|r| r.id != id);
        }

        Ok(resolution)
    }
}
