//! Per-buffer parse request coordination.
//!
//! Each editor buffer owns a [`BufferState`] that sends parse requests to a
//! completion backend, coalesces requests issued while one is in flight,
//! and applies finished responses to the buffer's diagnostics and
//! highlights. [`BufferRegistry`] holds the states, and
//! [`ParseCoordinator`] maps editor events onto them.
//!
//! # Examples
//!
//! ```
//! use bufsync::replay::{Scenario, run_scenario};
//!
//! let scenario: Scenario = serde_json::from_str(r#"{
//!     "buffers": [{ "id": 1, "filetypes": ["cpp"], "tick": 1 }],
//!     "replies": [{ "payload": [
//!         { "line": 2, "column": 5, "severity": "ERROR", "message": "unknown type" }
//!     ] }],
//!     "steps": [
//!         { "action": "ready_to_parse", "buffer": 1 },
//!         { "action": "poll", "buffer": 1, "block": true }
//!     ]
//! }"#).unwrap();
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let report = run_scenario(&scenario, runtime.handle()).unwrap();
//! assert_eq!(report.buffers[0].error_count, 1);
//! ```

pub mod buffer;
pub mod coordinator;
pub mod replay;
mod test_utils;

pub use buffer::{BufferRegistry, BufferServices, BufferState, EditorServices, Readiness};
pub use coordinator::{ParseCoordinator, PollOutcome};
