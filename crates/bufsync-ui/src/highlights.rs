//! Semantic highlight painting.

use crate::window::{LineRange, MatchGroup, MatchSpan, WindowEnv, WindowId};
use bufsync_core::{BufferId, Highlight};
use std::collections::HashMap;
use std::sync::Arc;

/// Highlights of one buffer and where they are currently painted.
///
/// Only the lines visible in a window are painted, so scrolling repaints
/// from the stored list instead of asking the backend again.
pub struct HighlightStore {
    buffer: BufferId,
    env: Arc<dyn WindowEnv>,
    highlights: Vec<Highlight>,
    ranges: HashMap<WindowId, LineRange>,
}

impl HighlightStore {
    pub fn new(buffer: BufferId, env: Arc<dyn WindowEnv>) -> Self {
        Self {
            buffer,
            env,
            highlights: Vec::new(),
            ranges: HashMap::new(),
        }
    }

    /// Replaces the stored highlights and repaints every window showing the
    /// buffer, each clipped to its visible range.
    pub fn update(&mut self, highlights: Vec<Highlight>) {
        self.highlights = highlights;
        let windows = self.showing_windows();
        for window in windows {
            let range = self.env.visible_range(window);
            self.paint(window, range);
        }
    }

    /// Repaints the current window for a new visible range without fetching
    /// new highlights.
    pub fn move_or_resize(&mut self, range: LineRange) {
        let window = self.env.current_window();
        self.paint(window, range);
    }

    /// Repaints the windows showing the buffer from the stored list, reusing
    /// the range each window was last painted with.
    pub fn refresh(&mut self) {
        let windows = self.showing_windows();
        for window in windows {
            let range = match self.ranges.get(&window) {
                Some(range) => *range,
                None => self.env.visible_range(window),
            };
            self.paint(window, range);
        }
    }

    /// Removes this buffer's marks from the current window only.
    pub fn clear_for_window(&mut self) {
        let window = self.env.current_window();
        self.env.clear_matches(self.group(window));
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    /// Range `window` was last painted with.
    pub fn painted_range(&self, window: WindowId) -> Option<LineRange> {
        self.ranges.get(&window).copied()
    }

    /// Windows currently showing the buffer. Ranges recorded for any other
    /// window are forgotten.
    fn showing_windows(&mut self) -> Vec<WindowId> {
        let windows = self.env.windows_showing(self.buffer);
        self.ranges.retain(|window, _| windows.contains(window));
        windows
    }

    const fn group(&self, window: WindowId) -> MatchGroup {
        MatchGroup {
            buffer: self.buffer,
            window,
        }
    }

    fn paint(&mut self, window: WindowId, range: LineRange) {
        let group = self.group(window);
        self.ranges.insert(window, range);
        self.env.clear_matches(group);

        let mut painted = 0usize;
        for highlight in self.highlights.iter().filter(|h| range.contains(h.line)) {
            self.env.add_match(
                group,
                MatchSpan {
                    kind: highlight.kind.clone(),
                    line: highlight.line,
                    column: highlight.column,
                    length: highlight.span_len(),
                },
            );
            painted += 1;
        }

        tracing::trace!(
            "Painted {} highlights in {} (lines {}-{})",
            painted,
            group,
            range.first,
            range.last
        );
    }
}

impl std::fmt::Debug for HighlightStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightStore")
            .field("buffer", &self.buffer)
            .field("highlights_count", &self.highlights.len())
            .field("ranges", &self.ranges)
            .finish_non_exhaustive()
    }
}
