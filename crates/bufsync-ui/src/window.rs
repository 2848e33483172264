//! Editor window capability.
//!
//! Painting needs to enumerate windows, read their visible line ranges and
//! place matches. None of that is reachable through globals: each store gets
//! a [`WindowEnv`] at construction.

use bufsync_core::BufferId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Editor window identifier, unique for the lifetime of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive range of 1-based buffer lines.
///
/// # Examples
///
/// ```
/// use bufsync_ui::LineRange;
///
/// let range = LineRange::new(10, 40);
/// assert!(range.contains(10));
/// assert!(range.contains(40));
/// assert!(!range.contains(41));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub first: u32,
    pub last: u32,
}

impl LineRange {
    pub const fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    pub const fn contains(&self, line: u32) -> bool {
        line >= self.first && line <= self.last
    }
}

/// Name under which the matches of one buffer in one window are grouped.
///
/// Rendered as `"<buffer>.<window>"`, so clearing a group never touches the
/// matches another buffer placed in the same window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchGroup {
    pub buffer: BufferId,
    pub window: WindowId,
}

impl fmt::Display for MatchGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.buffer, self.window)
    }
}

/// One painted span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSpan {
    /// Highlight group, e.g. `Member`.
    pub kind: String,
    pub line: u32,
    pub column: u32,
    /// Length in bytes.
    pub length: usize,
}

/// Editor operations the highlight store paints through.
///
/// Methods take `&self`; implementations talk to the editor (or record calls)
/// with whatever interior mutability they need.
pub trait WindowEnv: Send + Sync {
    /// Windows currently displaying `buffer`, in editor order.
    fn windows_showing(&self, buffer: BufferId) -> Vec<WindowId>;

    fn current_window(&self) -> WindowId;

    /// Lines of the buffer visible in `window`.
    fn visible_range(&self, window: WindowId) -> LineRange;

    /// Removes every match placed under `group`.
    fn clear_matches(&self, group: MatchGroup);

    fn add_match(&self, group: MatchGroup, span: MatchSpan);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_group_name() {
        let group = MatchGroup {
            buffer: BufferId(3),
            window: WindowId(1001),
        };
        assert_eq!(group.to_string(), "3.1001");
    }

    #[test]
    fn test_line_range_bounds() {
        let range = LineRange::new(5, 5);
        assert!(range.contains(5));
        assert!(!range.contains(4));
        assert!(!range.contains(6));
    }
}
