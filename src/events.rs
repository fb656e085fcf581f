//! Change notifications for the help desk tables
//!
//! Every committed write publishes a [`ChangeEvent`] on a tokio broadcast
//! channel. Views subscribe through a [`TableWatcher`], which applies a
//! [`ChangeFilter`] and reports lag so the subscriber can resynchronise.

use crate::types::RequestStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Backend table a change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    HelpRequests,
    SupervisorResponses,
    KnowledgeBase,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::HelpRequests => "help_requests",
            Table::SupervisorResponses => "supervisor_responses",
            Table::KnowledgeBase => "knowledge_base",
        }
    }
}

impl std::str::FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "help_requests" => Ok(Table::HelpRequests),
            "supervisor_responses" => Ok(Table::SupervisorResponses),
            "knowledge_base" => Ok(Table::KnowledgeBase),
            other => Err(format!("Unknown table: {}", other)),
        }
    }
}

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl std::str::FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "insert" => Ok(ChangeKind::Insert),
            "update" => Ok(ChangeKind::Update),
            "delete" => Ok(ChangeKind::Delete),
            other => Err(format!("Unknown change kind: {}", other)),
        }
    }
}

/// One committed row change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Event ID (for deduplication)
    pub id: String,
    pub table: Table,
    pub kind: ChangeKind,
    /// Primary key of the changed row
    pub row_id: String,
    /// Request status after the change (help_requests only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
    /// Request status before the change (help_requests updates only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<RequestStatus>,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    fn new(table: Table, kind: ChangeKind, row_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            table,
            kind,
            row_id,
            status: None,
            previous_status: None,
            timestamp: Utc::now(),
        }
    }

    /// A help request row was inserted
    pub fn request_inserted(row_id: String, status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::new(Table::HelpRequests, ChangeKind::Insert, row_id)
        }
    }

    /// A help request row changed status
    pub fn request_updated(row_id: String, from: RequestStatus, to: RequestStatus) -> Self {
        Self {
            status: Some(to),
            previous_status: Some(from),
            ..Self::new(Table::HelpRequests, ChangeKind::Update, row_id)
        }
    }

    /// A supervisor response row was inserted
    pub fn response_inserted(row_id: String) -> Self {
        Self::new(Table::SupervisorResponses, ChangeKind::Insert, row_id)
    }

    /// A knowledge base row was inserted
    pub fn knowledge_inserted(row_id: String) -> Self {
        Self::new(Table::KnowledgeBase, ChangeKind::Insert, row_id)
    }

    /// Convert to SSE data format
    pub fn to_sse(&self) -> String {
        format!(
            "id: {}\ndata: {}\n\n",
            self.id,
            serde_json::to_string(&self).unwrap_or_else(|_| "{}".to_string())
        )
    }
}

/// Subscription predicate over change events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub table: Table,
    /// Only this kind of change; any kind when `None`
    #[serde(default)]
    pub kind: Option<ChangeKind>,
    /// Only rows whose status was or became this value
    #[serde(default)]
    pub status: Option<RequestStatus>,
}

impl ChangeFilter {
    /// Every change to one table
    pub fn table(table: Table) -> Self {
        Self {
            table,
            kind: None,
            status: None,
        }
    }

    pub fn with_kind(mut self, kind: ChangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Does `event` pass this filter
    ///
    /// A status filter matches on either side of an update, so a request that
    /// leaves `pending` is still reported to pending-only subscribers.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }

        if let Some(kind) = self.kind {
            if event.kind != kind {
                return false;
            }
        }

        match self.status {
            Some(status) => event.status == Some(status) || event.previous_status == Some(status),
            None => true,
        }
    }
}

/// Event broadcaster using tokio broadcast channel
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventBroadcaster {
    /// Create new broadcaster with channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast event to all subscribers
    ///
    /// Returns the number of receivers; zero when nobody is listening.
    pub fn broadcast(&self, event: ChangeEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(broadcast::error::SendError(event)) => {
                debug!(
                    "No subscribers for {} on {}",
                    event.kind.as_str(),
                    event.table.as_str()
                );
                0
            }
        }
    }

    /// Subscribe to every event
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Subscribe to events matching `filter`
    pub fn watch(&self, filter: ChangeFilter) -> TableWatcher {
        TableWatcher {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    /// Get subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// What a watcher observed
#[derive(Debug, Clone, PartialEq)]
pub enum WatchSignal {
    /// A matching change
    Changed(ChangeEvent),
    /// The receiver fell behind and dropped `missed` events; refetch everything
    Resync { missed: u64 },
}

/// Filtered subscription to the change channel
pub struct TableWatcher {
    rx: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
}

impl TableWatcher {
    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    /// Wait for the next matching change
    ///
    /// Returns `None` once every broadcaster handle is gone.
    pub async fn next(&mut self) -> Option<WatchSignal> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(WatchSignal::Changed(event));
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!("Table watcher lagged by {} events", missed);
                    return Some(WatchSignal::Resync { missed });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pending_filter_sees_resolution() {
        let filter = ChangeFilter::table(Table::HelpRequests).with_status(RequestStatus::Pending);

        let inserted = ChangeEvent::request_inserted("r1".into(), RequestStatus::Pending);
        let resolved =
            ChangeEvent::request_updated("r1".into(), RequestStatus::Pending, RequestStatus::Resolved);
        let knowledge = ChangeEvent::knowledge_inserted("k1".into());

        assert!(filter.matches(&inserted));
        assert!(filter.matches(&resolved));
        assert!(!filter.matches(&knowledge));
    }

    #[test]
    fn test_kind_filter() {
        let filter = ChangeFilter::table(Table::HelpRequests).with_kind(ChangeKind::Update);
        let inserted = ChangeEvent::request_inserted("r1".into(), RequestStatus::Pending);
        let updated =
            ChangeEvent::request_updated("r1".into(), RequestStatus::Pending, RequestStatus::Resolved);

        assert!(!filter.matches(&inserted));
        assert!(filter.matches(&updated));
    }

    #[test]
    fn test_sse_format() {
        let event = ChangeEvent::knowledge_inserted("entry-123".into());
        let sse = event.to_sse();
        assert!(sse.contains("id:"));
        assert!(sse.contains("data:"));
        assert!(sse.contains("knowledge_base"));
    }

    #[test]
    fn test_parse_table_and_kind() {
        assert_eq!("knowledge_base".parse::<Table>(), Ok(Table::KnowledgeBase));
        assert_eq!("UPDATE".parse::<ChangeKind>(), Ok(ChangeKind::Update));
        assert!("users".parse::<Table>().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers() {
        let broadcaster = EventBroadcaster::new(4);
        assert_eq!(broadcaster.broadcast(ChangeEvent::response_inserted("s1".into())), 0);
    }

    #[tokio::test]
    async fn test_watcher_skips_unmatched_events() {
        let broadcaster = EventBroadcaster::new(10);
        let mut watcher = broadcaster.watch(ChangeFilter::table(Table::KnowledgeBase));

        broadcaster.broadcast(ChangeEvent::response_inserted("s1".into()));
        let wanted = ChangeEvent::knowledge_inserted("k1".into());
        broadcaster.broadcast(wanted.clone());

        let signal = tokio::time::timeout(Duration::from_millis(100), watcher.next())
            .await
            .unwrap();
        assert_eq!(signal, Some(WatchSignal::Changed(wanted)));
    }

    #[tokio::test]
    async fn test_watcher_reports_lag() {
        let broadcaster = EventBroadcaster::new(2);
        let mut watcher = broadcaster.watch(ChangeFilter::table(Table::KnowledgeBase));

        for i in 0..5 {
            broadcaster.broadcast(ChangeEvent::knowledge_inserted(format!("k{}", i)));
        }

        match watcher.next().await {
            Some(WatchSignal::Resync { missed }) => assert!(missed > 0),
            other => panic!("expected resync, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_watcher_ends_when_channel_closes() {
        let broadcaster = EventBroadcaster::new(2);
        let mut watcher = broadcaster.watch(ChangeFilter::table(Table::HelpRequests));
        drop(broadcaster);
        assert_eq!(watcher.next().await, None);
    }
}
