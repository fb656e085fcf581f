//! The help desk backend facade
//!
//! [`HelpDesk`] bundles the table store, the change channel and the outbound
//! notifier. Writes go through here so that every committed change is
//! published exactly once and only after it is durable.

use crate::error::Result;
use crate::events::{ChangeEvent, ChangeFilter, EventBroadcaster, TableWatcher};
use crate::notify::{LogNotifier, Notifier};
use crate::storage::HelpDeskStore;
use crate::types::{
    HelpRequest, KnowledgeBaseEntry, NewHelpRequest, RequestId, RequestStatus,
    RequestWithResponse, Resolution,
};
use std::sync::Arc;
use tracing::debug;

/// Shared handle to the help desk backend
#[derive(Clone)]
pub struct HelpDesk {
    store: Arc<dyn HelpDeskStore>,
    events: EventBroadcaster,
    notifier: Arc<dyn Notifier>,
}

impl HelpDesk {
    pub fn new(store: Arc<dyn HelpDeskStore>, events: EventBroadcaster) -> Self {
        Self {
            store,
            events,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    /// Subscribe to changes matching `filter`
    pub fn watch(&self, filter: ChangeFilter) -> TableWatcher {
        self.events.watch(filter)
    }

    /// Escalate a caller question to the supervisors
    pub async fn request_help(&self, request: NewHelpRequest) -> Result<HelpRequest> {
        let created = self.store.create_help_request(request).await?;

        self.events.broadcast(ChangeEvent::request_inserted(
            created.id.to_string(),
            created.status,
        ));
        self.notifier.supervisor_alerted(&created).await;

        debug!("Help request {} escalated", created.id);
        Ok(created)
    }

    pub async fn get_request(&self, id: RequestId) -> Result<HelpRequest> {
        self.store.get_help_request(id).await
    }

    pub async fn pending_requests(&self) -> Result<Vec<HelpRequest>> {
        self.store
            .list_help_requests(Some(RequestStatus::Pending))
            .await
    }

    pub async fn request_history(&self) -> Result<Vec<RequestWithResponse>> {
        self.store.list_request_history().await
    }

    pub async fn knowledge(&self) -> Result<Vec<KnowledgeBaseEntry>> {
        self.store.list_knowledge().await
    }

    pub async fn count_requests(&self, status: Option<RequestStatus>) -> Result<usize> {
        self.store.count_requests(status).await
    }

    /// Answer a pending request
    ///
    /// The response, knowledge entry and status change commit together; the
    /// three change events are published afterwards.
    pub async fn resolve(&self, id: RequestId, answer: &str) -> Result<Resolution> {
        let resolution = self.store.resolve_request(id, answer).await?;

        self.events
            .broadcast(ChangeEvent::response_inserted(resolution.response.id.to_string()));
        self.events
            .broadcast(ChangeEvent::knowledge_inserted(resolution.entry.id.to_string()));
        self.events.broadcast(ChangeEvent::request_updated(
            id.to_string(),
            RequestStatus::Pending,
            RequestStatus::Resolved,
        ));

        self.notifier
            .caller_answered(&resolution.request, &resolution.response.answer)
            .await;

        Ok(resolution)
    }
}
