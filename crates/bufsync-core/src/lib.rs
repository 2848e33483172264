//! Core abstractions for bufsync.
//!
//! This crate provides the pieces the per-buffer parse state machine is
//! built from, independent of any editor:
//!
//! # Architecture
//!
//! bufsync-core defines:
//! - **Traits**: `ChangeTickOracle`, `FiletypeClassifier`, `ParseBackend`, `RequestHandle`, `ParseService`
//! - **Requests**: `ParseRequest`, the lazily-resolved handle of one backend call
//! - **Payloads**: `ParseResponse`, decoded once from the backend's JSON
//! - **Task backend**: `TaskBackend`, running each request on a tokio runtime
//! - **Error Types**: `BufsyncError` and the `Result` alias
//!
//! # Examples
//!
//! Starting a request through a backend that answers immediately:
//!
//! ```
//! use bufsync_core::{
//!     EventNotification, ParseBackend, ParseRequest, ParseResponse, RequestHandle,
//! };
//! use serde_json::json;
//!
//! struct Ready(ParseResponse);
//!
//! impl RequestHandle for Ready {
//!     fn is_done(&self) -> bool {
//!         true
//!     }
//!
//!     fn response(&mut self) -> bufsync_core::Result<ParseResponse> {
//!         Ok(self.0.clone())
//!     }
//!
//!     fn should_resend(&self) -> bool {
//!         false
//!     }
//! }
//!
//! struct Instant;
//!
//! impl ParseBackend for Instant {
//!     fn start(&self, _event: &EventNotification) -> Box<dyn RequestHandle> {
//!         Box::new(Ready(ParseResponse::from_value(json!([]))))
//!     }
//! }
//!
//! let mut request = ParseRequest::new(EventNotification::new("FileReadyToParse", json!({})));
//! request.start(&Instant);
//! assert!(request.is_done());
//! assert!(request.response().unwrap().is_empty());
//! ```

pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod task_backend;
pub mod tick;

// Re-export commonly used types
pub use config::{BackendConfig, BufsyncConfig, DiagnosticsConfig, HighlightsConfig};
pub use error::{BufsyncError, Result};
pub use request::{Completion, EventNotification, ParseBackend, ParseRequest, RequestHandle};
pub use response::{Diagnostic, Highlight, ParseResponse, Severity};
pub use task_backend::{ParseService, ServiceReply, TaskBackend};
pub use tick::{BufferId, ChangeTickOracle, FiletypeClassifier};
