//! Request history: every request with its answer

use crate::desk::HelpDesk;
use crate::error::Result;
use crate::events::{ChangeFilter, ChangeKind, Table, TableWatcher};
use crate::types::{RequestStatus, RequestWithResponse};

/// Read-only list of all requests, newest first
pub struct RequestHistoryView {
    desk: HelpDesk,
    rows: Vec<RequestWithResponse>,
}

impl RequestHistoryView {
    pub fn new(desk: HelpDesk) -> Self {
        Self {
            desk,
            rows: Vec::new(),
        }
    }

    /// Refresh on request updates only
    pub fn watch_filter() -> ChangeFilter {
        ChangeFilter::table(Table::HelpRequests).with_kind(ChangeKind::Update)
    }

    pub fn watch(&self) -> TableWatcher {
        self.desk.watch(Self::watch_filter())
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.rows = self.desk.request_history().await?;
        Ok(())
    }

    /// Wait for the next relevant change and reload; `false` once closed
    pub async fn follow(&mut self, watcher: &mut TableWatcher) -> Result<bool> {
        match watcher.next().await {
            Some(_) => {
                self.refresh().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn rows(&self) -> &[RequestWithResponse] {
        &self.rows
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn resolved_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.request.status == RequestStatus::Resolved)
            .count()
    }
}
