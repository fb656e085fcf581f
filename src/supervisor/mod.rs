//! Supervisor dashboard views
//!
//! Each view caches one query result and knows which change events make it
//! stale. A view refreshes through `&mut self`, so two fetches of the same
//! view never race each other.

pub mod history;
pub mod knowledge;
pub mod pending;

pub use history::RequestHistoryView;
pub use knowledge::{filter_entries, KnowledgeBaseView};
pub use pending::PendingRequestsView;
