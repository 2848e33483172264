//! Buffer state management.
//!
//! This module provides the per-buffer parse request machinery:
//! - `state`: request dispatch, readiness, and response consumption for one buffer
//! - `registry`: lazily created states for every buffer the editor mentions

mod registry;
mod state;

// Re-export all public items from submodules
pub use registry::{BufferRegistry, EditorServices};
pub use state::{BufferServices, BufferState, Readiness};
