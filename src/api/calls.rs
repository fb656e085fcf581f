//! Registry of simulated calls held by the HTTP server

use crate::agent::CallSession;
use crate::types::CallId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Shared handle to one call; held across the agent's reply delay
pub type SharedCall = Arc<Mutex<CallSession>>;

/// Open calls keyed by id
#[derive(Clone, Default)]
pub struct CallRegistry {
    calls: Arc<RwLock<HashMap<CallId, SharedCall>>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new call and register it
    pub async fn start(&self, business_name: &str, reply_delay: Duration) -> CallSession {
        let mut session = CallSession::new(business_name).with_reply_delay(reply_delay);
        session.start_call();

        let snapshot = session.clone();
        let mut calls = self.calls.write().await;
        calls.insert(session.id(), Arc::new(Mutex::new(session)));
        debug!("Registered call {} ({} open)", snapshot.id(), calls.len());

        snapshot
    }

    pub async fn get(&self, id: CallId) -> Option<SharedCall> {
        let calls = self.calls.read().await;
        calls.get(&id).cloned()
    }

    /// End a call and forget it; `false` if it was unknown
    pub async fn end(&self, id: CallId) -> bool {
        let removed = {
            let mut calls = self.calls.write().await;
            calls.remove(&id)
        };

        match removed {
            Some(call) => {
                call.lock().await.end_call();
                true
            }
            None => false,
        }
    }

    pub async fn count(&self) -> usize {
        self.calls.read().await.len()
    }
}
