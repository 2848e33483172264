//! Scenario replay against an in-memory editor.
//!
//! A scenario lists buffers, windows, scripted backend replies, and a
//! sequence of editor events. Replaying it drives a real
//! [`ParseCoordinator`](crate::ParseCoordinator) over a
//! [`TaskBackend`](bufsync_core::TaskBackend) and reports what the editor
//! would show afterwards.

mod editor;
mod script;

pub use editor::MemoryEditor;
pub use script::{
    BufferReport, BufferSpec, ReplySpec, Report, Scenario, ScriptedService, Step, StepReport,
    WindowSpec, run_scenario,
};
