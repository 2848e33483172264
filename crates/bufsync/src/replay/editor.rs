//! In-memory editor model.

use bufsync_core::{BufferId, ChangeTickOracle, FiletypeClassifier};
use bufsync_ui::{LineRange, MatchGroup, MatchSpan, WindowEnv, WindowId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct BufferModel {
    tick: u64,
    filetypes: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct WindowModel {
    buffer: BufferId,
    range: LineRange,
}

#[derive(Debug, Default)]
struct EditorModel {
    buffers: HashMap<BufferId, BufferModel>,
    windows: BTreeMap<WindowId, WindowModel>,
    current: Option<WindowId>,
    matches: BTreeMap<String, Vec<MatchSpan>>,
}

/// Editor stand-in holding buffers, windows, and painted matches.
///
/// Implements every editor-facing trait so a registry can run against it
/// without a real editor.
///
/// # Examples
///
/// ```
/// use bufsync::replay::MemoryEditor;
/// use bufsync_core::{BufferId, ChangeTickOracle};
///
/// let editor = MemoryEditor::default();
/// editor.open_buffer(BufferId(1), vec!["cpp".into()], 1);
/// editor.edit(BufferId(1));
/// assert_eq!(editor.change_tick(BufferId(1)), 2);
/// ```
#[derive(Debug, Default)]
pub struct MemoryEditor {
    model: Mutex<EditorModel>,
}

impl MemoryEditor {
    fn model(&self) -> MutexGuard<'_, EditorModel> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn open_buffer(&self, buffer: BufferId, filetypes: Vec<String>, tick: u64) {
        self.model()
            .buffers
            .insert(buffer, BufferModel { tick, filetypes });
    }

    /// Simulates a modification; returns the new tick.
    pub fn edit(&self, buffer: BufferId) -> u64 {
        let mut model = self.model();
        let entry = model.buffers.entry(buffer).or_default();
        entry.tick += 1;
        entry.tick
    }

    /// Opens `window` on `buffer`. The first window opened becomes current.
    pub fn open_window(&self, window: WindowId, buffer: BufferId, range: LineRange) {
        let mut model = self.model();
        model.windows.insert(window, WindowModel { buffer, range });
        model.current.get_or_insert(window);
    }

    pub fn focus(&self, window: WindowId) {
        self.model().current = Some(window);
    }

    pub fn scroll(&self, window: WindowId, range: LineRange) {
        if let Some(model) = self.model().windows.get_mut(&window) {
            model.range = range;
        }
    }

    /// Buffer displayed in `window`.
    pub fn buffer_in(&self, window: WindowId) -> Option<BufferId> {
        self.model().windows.get(&window).map(|w| w.buffer)
    }

    /// Painted matches keyed by match group name.
    pub fn painted(&self) -> BTreeMap<String, Vec<MatchSpan>> {
        self.model().matches.clone()
    }
}

impl ChangeTickOracle for MemoryEditor {
    fn change_tick(&self, buffer: BufferId) -> u64 {
        self.model().buffers.get(&buffer).map_or(0, |b| b.tick)
    }
}

impl FiletypeClassifier for MemoryEditor {
    fn filetypes(&self, buffer: BufferId) -> Vec<String> {
        self.model()
            .buffers
            .get(&buffer)
            .map(|b| b.filetypes.clone())
            .unwrap_or_default()
    }
}

impl WindowEnv for MemoryEditor {
    fn windows_showing(&self, buffer: BufferId) -> Vec<WindowId> {
        self.model()
            .windows
            .iter()
            .filter(|(_, w)| w.buffer == buffer)
            .map(|(id, _)| *id)
            .collect()
    }

    fn current_window(&self) -> WindowId {
        let model = self.model();
        model
            .current
            .or_else(|| model.windows.keys().next().copied())
            .unwrap_or(WindowId(1000))
    }

    fn visible_range(&self, window: WindowId) -> LineRange {
        self.model()
            .windows
            .get(&window)
            .map_or(LineRange::new(1, 1), |w| w.range)
    }

    fn clear_matches(&self, group: MatchGroup) {
        self.model().matches.remove(&group.to_string());
    }

    fn add_match(&self, group: MatchGroup, span: MatchSpan) {
        self.model()
            .matches
            .entry(group.to_string())
            .or_default()
            .push(span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_buffer_defaults() {
        let editor = MemoryEditor::default();
        assert_eq!(editor.change_tick(BufferId(5)), 0);
        assert!(editor.filetypes(BufferId(5)).is_empty());
    }

    #[test]
    fn test_first_window_is_current() {
        let editor = MemoryEditor::default();
        editor.open_window(WindowId(1001), BufferId(1), LineRange::new(1, 10));
        editor.open_window(WindowId(1002), BufferId(1), LineRange::new(11, 20));
        assert_eq!(editor.current_window(), WindowId(1001));

        editor.focus(WindowId(1002));
        assert_eq!(editor.current_window(), WindowId(1002));
        assert_eq!(
            editor.windows_showing(BufferId(1)),
            vec![WindowId(1001), WindowId(1002)]
        );
    }

    #[test]
    fn test_scroll_changes_visible_range() {
        let editor = MemoryEditor::default();
        editor.open_window(WindowId(1001), BufferId(1), LineRange::new(1, 10));
        editor.scroll(WindowId(1001), LineRange::new(30, 40));
        assert_eq!(
            editor.visible_range(WindowId(1001)),
            LineRange::new(30, 40)
        );
        assert_eq!(editor.buffer_in(WindowId(1001)), Some(BufferId(1)));
    }

    #[test]
    fn test_matches_grouped_by_name() {
        let editor = MemoryEditor::default();
        let group = MatchGroup {
            buffer: BufferId(1),
            window: WindowId(1001),
        };
        editor.add_match(
            group,
            MatchSpan {
                kind: "Member".into(),
                line: 1,
                column: 1,
                length: 3,
            },
        );
        assert_eq!(editor.painted()["1.1001"].len(), 1);

        editor.clear_matches(group);
        assert!(editor.painted().is_empty());
    }
}
