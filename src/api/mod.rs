//! HTTP surface
//!
//! Provides:
//! - Caller simulator and supervisor dashboard pages
//! - JSON API for calls, help requests and the knowledge base
//! - Server-Sent Events (SSE) change feed

pub mod calls;
pub mod error;
pub mod pages;
pub mod server;

pub use calls::CallRegistry;
pub use error::{ApiError, ApiResult};
pub use server::{router, ApiServer, ApiServerConfig, AppState, HealthResponse};
