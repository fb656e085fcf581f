//! Common test utilities and helpers

use async_trait::async_trait;
use frontdesk_core::{
    ConnectionMode, EventBroadcaster, FrontdeskError, HelpDesk, HelpDeskStore, HelpRequest,
    KnowledgeBaseEntry, LibsqlStorage, NewHelpRequest, Notifier, RequestId, RequestStatus,
    RequestWithResponse, Resolution, Result,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a file-backed libSQL store in a temporary directory
///
/// libSQL's `:memory:` databases are private to one connection, so every test
/// gets a real file instead. Keep the `TempDir` alive for the whole test.
pub async fn create_test_storage() -> (Arc<LibsqlStorage>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("frontdesk.db");

    let storage = LibsqlStorage::new_with_validation(
        ConnectionMode::Local(db_path.to_str().unwrap().to_string()),
        true,
    )
    .await
    .expect("Failed to create test storage");

    (Arc::new(storage), temp_dir)
}

/// Help desk over a fresh temporary database
pub async fn create_test_desk() -> (HelpDesk, TempDir) {
    let (storage, temp_dir) = create_test_storage().await;
    (HelpDesk::new(storage, EventBroadcaster::default()), temp_dir)
}

/// Notifier that remembers every simulated SMS
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn supervisor_alerted(&self, request: &HelpRequest) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("supervisor: {}", request.question));
    }

    async fn caller_answered(&self, request: &HelpRequest, answer: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("caller: {} -> {}", request.question, answer));
    }
}

/// Store whose every call fails, standing in for an unreachable backend
pub struct UnreachableStore;

fn offline<T>() -> Result<T> {
    Err(FrontdeskError::Database("connection refused".to_string()))
}

#[async_trait]
impl HelpDeskStore for UnreachableStore {
    async fn create_help_request(&self, _request: NewHelpRequest) -> Result<HelpRequest> {
        offline()
    }

    async fn get_help_request(&self, _id: RequestId) -> Result<HelpRequest> {
        offline()
    }

    async fn list_help_requests(&self, _status: Option<RequestStatus>) -> Result<Vec<HelpRequest>> {
        offline()
    }

    async fn list_request_history(&self) -> Result<Vec<RequestWithResponse>> {
        offline()
    }

    async fn resolve_request(&self, _id: RequestId, _answer: &str) -> Result<Resolution> {
        offline()
    }

    async fn list_knowledge(&self) -> Result<Vec<KnowledgeBaseEntry>> {
        offline()
    }

    async fn count_requests(&self, _status: Option<RequestStatus>) -> Result<usize> {
        offline()
    }
}

/// Help desk whose backend is down
pub fn create_offline_desk() -> HelpDesk {
    HelpDesk::new(Arc::new(UnreachableStore), EventBroadcaster::default())
}
