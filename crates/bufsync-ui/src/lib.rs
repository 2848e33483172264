//! Diagnostic and highlight stores for bufsync.
//!
//! Both stores belong to one buffer. `DiagnosticStore` only keeps data
//! (counts, location list, per-line lookup); `HighlightStore` also paints
//! through the [`WindowEnv`] capability it is constructed with.

pub mod diagnostics;
pub mod highlights;
pub mod window;

pub use diagnostics::{DiagnosticStore, LocationEntry};
pub use highlights::HighlightStore;
pub use window::{LineRange, MatchGroup, MatchSpan, WindowEnv, WindowId};
