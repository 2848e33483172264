//! Per-buffer diagnostic store.

use bufsync_core::{BufferId, Diagnostic, Severity};
use serde::Serialize;

/// Location list entry, as the editor's `setloclist()` expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationEntry {
    pub bufnr: BufferId,
    pub lnum: u32,
    pub col: u32,
    #[serde(rename = "type")]
    pub kind: char,
    pub text: String,
    pub valid: bool,
}

/// Diagnostics most recently reported for one buffer.
///
/// Entries are kept sorted by position and capped at `max_to_display`
/// (`0` disables the cap). Counts and location list entries are computed
/// over what is kept.
///
/// # Examples
///
/// ```
/// use bufsync_core::{BufferId, Diagnostic, Severity};
/// use bufsync_ui::DiagnosticStore;
///
/// let mut store = DiagnosticStore::new(BufferId(1), 30);
/// store.update(vec![Diagnostic {
///     line: 2,
///     column: 1,
///     severity: Severity::Error,
///     message: "unknown type name".into(),
/// }]);
///
/// assert_eq!(store.error_count(), 1);
/// assert_eq!(store.location_list_entries()[0].kind, 'E');
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticStore {
    buffer: BufferId,
    max_to_display: usize,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticStore {
    pub const fn new(buffer: BufferId, max_to_display: usize) -> Self {
        Self {
            buffer,
            max_to_display,
            diagnostics: Vec::new(),
        }
    }

    /// Replaces the stored diagnostics.
    pub fn update(&mut self, mut diagnostics: Vec<Diagnostic>) {
        diagnostics.sort_by_key(|d| (d.line, d.column));
        if self.max_to_display > 0 && diagnostics.len() > self.max_to_display {
            tracing::debug!(
                "Buffer {}: keeping {} of {} diagnostics",
                self.buffer,
                self.max_to_display,
                diagnostics.len()
            );
            diagnostics.truncate(self.max_to_display);
        }
        self.diagnostics = diagnostics;
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Location list entries in buffer order.
    pub fn location_list_entries(&self) -> Vec<LocationEntry> {
        self.diagnostics
            .iter()
            .map(|d| LocationEntry {
                bufnr: self.buffer,
                lnum: d.line,
                col: d.column,
                kind: d.severity.letter(),
                text: d.message.clone(),
                valid: true,
            })
            .collect()
    }

    /// Left-most diagnostic on `line`, the one echoed when the cursor lands there.
    pub fn diagnostic_for_line(&self, line: u32) -> Option<&Diagnostic> {
        let start = self.diagnostics.partition_point(|d| d.line < line);
        self.diagnostics.get(start).filter(|d| d.line == line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(line: u32, column: u32, severity: Severity) -> Diagnostic {
        Diagnostic {
            line,
            column,
            severity,
            message: format!("{line}:{column}"),
        }
    }

    #[test]
    fn test_update_sorts_by_position() {
        let mut store = DiagnosticStore::new(BufferId(1), 0);
        store.update(vec![
            diag(9, 1, Severity::Error),
            diag(2, 8, Severity::Warning),
            diag(2, 3, Severity::Error),
        ]);

        let positions: Vec<(u32, u32)> = store
            .diagnostics()
            .iter()
            .map(|d| (d.line, d.column))
            .collect();
        assert_eq!(positions, vec![(2, 3), (2, 8), (9, 1)]);
    }

    #[test]
    fn test_counts_by_severity() {
        let mut store = DiagnosticStore::new(BufferId(1), 0);
        store.update(vec![
            diag(1, 1, Severity::Error),
            diag(2, 1, Severity::Warning),
            diag(3, 1, Severity::Warning),
            diag(4, 1, Severity::Hint),
        ]);
        assert_eq!(store.error_count(), 1);
        assert_eq!(store.warning_count(), 2);
    }

    #[test]
    fn test_max_to_display_caps_entries() {
        let mut store = DiagnosticStore::new(BufferId(1), 2);
        store.update(vec![
            diag(3, 1, Severity::Error),
            diag(1, 1, Severity::Error),
            diag(2, 1, Severity::Warning),
        ]);
        assert_eq!(store.diagnostics().len(), 2);
        assert_eq!(store.error_count(), 1);
        assert_eq!(store.warning_count(), 1);
    }

    #[test]
    fn test_update_replaces_previous() {
        let mut store = DiagnosticStore::new(BufferId(1), 0);
        store.update(vec![diag(1, 1, Severity::Error)]);
        store.update(Vec::new());
        assert_eq!(store.error_count(), 0);
        assert!(store.location_list_entries().is_empty());
    }

    #[test]
    fn test_location_list_entries() {
        let mut store = DiagnosticStore::new(BufferId(7), 0);
        store.update(vec![diag(4, 2, Severity::Warning)]);
        let entries = store.location_list_entries();
        assert_eq!(
            entries,
            vec![LocationEntry {
                bufnr: BufferId(7),
                lnum: 4,
                col: 2,
                kind: 'W',
                text: "4:2".into(),
                valid: true,
            }]
        );
    }

    #[test]
    fn test_location_entry_serializes_like_setloclist() {
        let mut store = DiagnosticStore::new(BufferId(2), 0);
        store.update(vec![diag(1, 5, Severity::Error)]);
        let json = serde_json::to_value(&store.location_list_entries()[0]).unwrap();
        assert_eq!(json["type"], "E");
        assert_eq!(json["bufnr"], 2);
        assert_eq!(json["lnum"], 1);
    }

    #[test]
    fn test_diagnostic_for_line_picks_leftmost() {
        let mut store = DiagnosticStore::new(BufferId(1), 0);
        store.update(vec![
            diag(5, 9, Severity::Error),
            diag(5, 2, Severity::Warning),
            diag(6, 1, Severity::Error),
        ]);
        assert_eq!(store.diagnostic_for_line(5).unwrap().column, 2);
        assert_eq!(store.diagnostic_for_line(6).unwrap().column, 1);
        assert!(store.diagnostic_for_line(4).is_none());
        assert!(store.diagnostic_for_line(7).is_none());
    }
}
