//! Frontdesk - AI receptionist simulator with a human supervisor loop
//!
//! A simulated phone agent answers salon callers from a fixed keyword table.
//! Questions it cannot answer become help requests; a supervisor answers them
//! from the dashboard, and every answer is kept as a learned knowledge entry.
//!
//! # Architecture
//!
//! - **Types**: Core rows (HelpRequest, SupervisorResponse, KnowledgeBaseEntry)
//! - **Storage**: libSQL backend behind the [`HelpDeskStore`] trait
//! - **Events**: change-notification channel with filtered table watchers
//! - **Desk**: [`HelpDesk`] facade tying storage, events and notifications together
//! - **Agent**: the caller simulator
//! - **Supervisor**: pending, history and knowledge base views
//! - **API**: axum server with pages, JSON endpoints and an SSE change feed
//!
//! # Example
//!
//! ```ignore
//! use frontdesk_core::{CallSession, EventBroadcaster, HelpDesk, LibsqlStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> frontdesk_core::Result<()> {
//!     let storage = LibsqlStorage::from_path("frontdesk.db", true).await?;
//!     let desk = HelpDesk::new(Arc::new(storage), EventBroadcaster::default());
//!
//!     let mut call = CallSession::new("Beauty Salon");
//!     call.start_call();
//!     call.ask_question(&desk, "Do you do eyebrow threading?").await?;
//!
//!     let pending = desk.pending_requests().await?;
//!     desk.resolve(pending[0].id, "Yes, $15 per session.").await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod desk;
pub mod error;
pub mod events;
pub mod notice;
pub mod notify;
pub mod storage;
pub mod supervisor;
pub mod types;

// Re-export commonly used types
pub use agent::{find_known_answer, AskOutcome, CallSession, ChatMessage, Speaker};
pub use config::FrontdeskConfig;
pub use desk::HelpDesk;
pub use error::{FrontdeskError, Result};
pub use events::{ChangeEvent, ChangeFilter, ChangeKind, EventBroadcaster, Table, TableWatcher, WatchSignal};
pub use notice::{Notice, NoticeVariant};
pub use notify::{LogNotifier, Notifier};
pub use storage::{
    libsql::{ConnectionMode, LibsqlStorage},
    HelpDeskStore,
};
pub use supervisor::{KnowledgeBaseView, PendingRequestsView, RequestHistoryView};
pub use types::{
    CallId, EntryId, HelpRequest, KnowledgeBaseEntry, NewHelpRequest, RequestId, RequestStatus,
    RequestWithResponse, Resolution, ResponseId, SupervisorResponse,
};
