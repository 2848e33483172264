//! Editor event handling on top of the buffer registry.
//!
//! The editor calls these from its event-processing thread: on
//! "file ready to parse" (text changed, insert left), on a periodic poll,
//! and on scroll, cursor, and window events.

use crate::buffer::{BufferRegistry, BufferState, Readiness};
use bufsync_core::{BufferId, Result};
use bufsync_ui::{LineRange, LocationEntry};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// What a poll did with a buffer's parse request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    /// Nothing to consume yet.
    Idle,
    /// Response consumed and marked handled.
    Handled,
    /// Response consumed and the buffered request started.
    Redispatched,
    /// Response consumed, and the backend asked for the request again.
    Resent,
}

/// Drives buffer states from editor events.
pub struct ParseCoordinator {
    registry: Arc<BufferRegistry>,
}

impl ParseCoordinator {
    pub const fn new(registry: Arc<BufferRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &BufferRegistry {
        &self.registry
    }

    /// Sends a parse request when the buffer changed since the last one,
    /// when the backend asked for a resend, or when `force` is set.
    ///
    /// Returns whether a request was sent (or buffered).
    pub fn on_file_ready_to_parse(&self, buffer: BufferId, extra_data: Value, force: bool) -> bool {
        let mut state = self.registry.get_or_create(buffer);

        let reason = if force {
            "forced"
        } else if state.needs_reparse() {
            "buffer changed"
        } else if state.should_resend_request() {
            "resend requested"
        } else {
            return false;
        };

        tracing::debug!("Buffer {}: sending parse request ({})", buffer, reason);
        state.send_parse_request(extra_data);
        true
    }

    /// Entering a buffer always reparses it, even at an unchanged tick, and
    /// repaints highlights for the windows now showing it.
    pub fn on_buffer_visit(&self, buffer: BufferId, extra_data: Value) -> bool {
        let sent = self.on_file_ready_to_parse(buffer, extra_data, true);
        if self.highlights_enabled(buffer) {
            self.registry.get_or_create(buffer).refresh_highlights();
        }
        sent
    }

    /// Consumes a finished response of `buffer`, if there is one.
    ///
    /// With `block` set the call waits for a running request. The wait
    /// happens without holding the buffer's registry entry, so other buffers
    /// stay reachable from other threads meanwhile. Bookkeeping
    /// (handled marking, dispatch of the buffered request, resend) always
    /// completes before a consumption error is returned.
    ///
    /// # Errors
    ///
    /// Returns the backend error surfaced while fetching the response.
    pub fn handle_file_parse_request(&self, buffer: BufferId, block: bool) -> Result<PollOutcome> {
        let filetypes = self.registry.filetypes(buffer);
        let config = self.registry.config();
        let diagnostics_ui = config.diagnostic_ui_enabled(&filetypes);
        let highlights = config.highlights_enabled(&filetypes);

        if block {
            self.wait_for_active(buffer);
        }

        let mut state = self.registry.get_or_create(buffer);
        let readiness = state.parse_request_readiness(block);
        if !readiness.is_ready() {
            return Ok(PollOutcome::Idle);
        }

        let consumed = consume(&mut state, diagnostics_ui, highlights);
        let resend = state.should_resend_request();
        let extra_data = state.active_extra_data().cloned();
        let had_buffered = state.has_buffered_request();

        if readiness == Readiness::ReadyWithBuffer {
            state.try_dispatch_buffered_request();
        } else {
            state.mark_response_handled();
        }

        let outcome = match extra_data {
            Some(extra_data) if resend && !had_buffered => {
                tracing::debug!("Buffer {}: backend asked for a resend", buffer);
                state.send_parse_request(extra_data);
                PollOutcome::Resent
            }
            _ if had_buffered => PollOutcome::Redispatched,
            _ => PollOutcome::Handled,
        };

        if let Err(e) = consumed {
            tracing::warn!("Buffer {}: failed to consume parse response: {}", buffer, e);
            return Err(e);
        }
        Ok(outcome)
    }

    /// Repaints the current window for its new visible range.
    pub fn on_scroll(&self, buffer: BufferId, range: LineRange) {
        if self.highlights_enabled(buffer) {
            self.registry.get_or_create(buffer).move_highlights(range);
        }
    }

    /// Clears the buffer's highlights from the window being left.
    pub fn on_window_leave(&self, buffer: BufferId) {
        if let Some(mut state) = self.registry.get_mut(buffer) {
            state.clear_current_window_highlights();
        }
    }

    /// Message to echo for the diagnostic under the cursor.
    pub fn on_cursor_moved(&self, buffer: BufferId, line: u32) -> Option<String> {
        if !self.registry.config().diagnostics.echo_current {
            return None;
        }
        let state = self.registry.get(buffer)?;
        state
            .diagnostic_for_line(line)
            .map(|diagnostic| diagnostic.message.clone())
    }

    pub fn on_buffer_wipe(&self, buffer: BufferId) {
        self.registry.discard(buffer);
    }

    pub fn location_list(&self, buffer: BufferId) -> Vec<LocationEntry> {
        self.registry
            .get(buffer)
            .map(|state| state.location_list_entries())
            .unwrap_or_default()
    }

    pub fn error_count(&self, buffer: BufferId) -> usize {
        self.registry
            .get(buffer)
            .map_or(0, |state| state.error_count())
    }

    pub fn warning_count(&self, buffer: BufferId) -> usize {
        self.registry
            .get(buffer)
            .map_or(0, |state| state.warning_count())
    }

    fn wait_for_active(&self, buffer: BufferId) {
        let completion = self
            .registry
            .get(buffer)
            .and_then(|state| state.active_completion());
        if let Some(wait) = completion {
            tracing::debug!("Buffer {}: waiting for parse request", buffer);
            wait();
        }
    }

    fn highlights_enabled(&self, buffer: BufferId) -> bool {
        let filetypes = self.registry.filetypes(buffer);
        self.registry.config().highlights_enabled(&filetypes)
    }
}

fn consume(state: &mut BufferState, diagnostics_ui: bool, highlights: bool) -> Result<()> {
    let fetched = if diagnostics_ui {
        state.update_diagnostics(false)
    } else {
        // The fetch still has to happen: it carries backend errors and
        // confirmation requests.
        state.response().map(drop)
    };
    // A failed fetch leaves an empty response behind, which clears the
    // highlights of the previous one.
    let painted = if highlights {
        state.update_highlights()
    } else {
        Ok(())
    };
    fetched.and(painted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::EditorServices;
    use crate::test_utils::test_helpers::{ManualBackend, NoWindows, TickTable};
    use bufsync_core::{BufsyncConfig, BufsyncError, FiletypeClassifier};
    use serde_json::json;

    struct Cpp;

    impl FiletypeClassifier for Cpp {
        fn filetypes(&self, _buffer: BufferId) -> Vec<String> {
            vec!["cpp".to_string()]
        }
    }

    const BUF: BufferId = BufferId(1);

    fn coordinator() -> (ParseCoordinator, Arc<TickTable>, Arc<ManualBackend>) {
        let ticks = Arc::new(TickTable::default());
        let backend = Arc::new(ManualBackend::default());
        let services = EditorServices {
            ticks: ticks.clone(),
            filetypes: Arc::new(Cpp),
            windows: Arc::new(NoWindows),
            backend: backend.clone(),
        };
        let registry = BufferRegistry::new(Arc::new(BufsyncConfig::default()), services);
        (ParseCoordinator::new(Arc::new(registry)), ticks, backend)
    }

    fn keyed(line: u32) -> Value {
        json!({
            "diagnostics": [{"line": line, "column": 1, "severity": "ERROR", "message": "oops"}],
            "highlights": [{"line": line, "column": 1, "type": "Member", "text": "m"}]
        })
    }

    #[test]
    fn test_ready_to_parse_only_when_changed() {
        let (coordinator, ticks, backend) = coordinator();
        ticks.set(BUF, 1);

        assert!(coordinator.on_file_ready_to_parse(BUF, json!({}), false));
        assert!(!coordinator.on_file_ready_to_parse(BUF, json!({}), false));
        assert_eq!(backend.started_count(), 1);

        ticks.set(BUF, 2);
        assert!(coordinator.on_file_ready_to_parse(BUF, json!({}), false));
        assert!(coordinator.registry().get(BUF).unwrap().has_buffered_request());
    }

    #[test]
    fn test_forced_send_at_same_tick() {
        let (coordinator, _ticks, backend) = coordinator();
        assert!(coordinator.on_buffer_visit(BUF, json!({"visit": true})));
        assert_eq!(backend.started_count(), 1);
        assert_eq!(backend.started_extra_data(0), json!({"visit": true}));
    }

    #[test]
    fn test_poll_idle_while_running() {
        let (coordinator, ticks, _backend) = coordinator();
        assert_eq!(
            coordinator.handle_file_parse_request(BUF, false).unwrap(),
            PollOutcome::Idle
        );

        ticks.set(BUF, 1);
        coordinator.on_file_ready_to_parse(BUF, json!({}), false);
        assert_eq!(
            coordinator.handle_file_parse_request(BUF, false).unwrap(),
            PollOutcome::Idle
        );
    }

    #[test]
    fn test_poll_handles_response() {
        let (coordinator, ticks, backend) = coordinator();
        ticks.set(BUF, 1);
        coordinator.on_file_ready_to_parse(BUF, json!({}), false);
        backend.complete(0, keyed(3));

        let outcome = coordinator.handle_file_parse_request(BUF, false).unwrap();

        assert_eq!(outcome, PollOutcome::Handled);
        assert_eq!(coordinator.error_count(BUF), 1);
        assert_eq!(coordinator.location_list(BUF)[0].lnum, 3);
        assert_eq!(coordinator.on_cursor_moved(BUF, 3).as_deref(), Some("oops"));
        let state = coordinator.registry().get(BUF).unwrap();
        assert!(state.is_response_handled());
        assert_eq!(state.highlights().len(), 1);
    }

    #[test]
    fn test_poll_redispatches_buffered_request() {
        let (coordinator, ticks, backend) = coordinator();
        ticks.set(BUF, 1);
        coordinator.on_file_ready_to_parse(BUF, json!({"edit": 1}), false);
        ticks.set(BUF, 2);
        coordinator.on_file_ready_to_parse(BUF, json!({"edit": 2}), false);
        backend.complete(0, keyed(1));

        let outcome = coordinator.handle_file_parse_request(BUF, false).unwrap();

        assert_eq!(outcome, PollOutcome::Redispatched);
        assert_eq!(backend.started_count(), 2);
        assert_eq!(backend.started_extra_data(1), json!({"edit": 2}));
        let state = coordinator.registry().get(BUF).unwrap();
        assert!(!state.is_response_handled());
        assert_eq!(state.parse_tick(), 2);
        assert_eq!(state.error_count(), 1);
    }

    #[test]
    fn test_poll_resends_when_asked() {
        let (coordinator, ticks, backend) = coordinator();
        ticks.set(BUF, 1);
        coordinator.on_file_ready_to_parse(BUF, json!({"edit": 1}), false);
        backend.request_resend(0);
        backend.complete(0, json!([]));

        let outcome = coordinator.handle_file_parse_request(BUF, false).unwrap();

        assert_eq!(outcome, PollOutcome::Resent);
        assert_eq!(backend.started_count(), 2);
        assert_eq!(backend.started_extra_data(1), json!({"edit": 1}));
    }

    #[test]
    fn test_poll_error_still_completes_bookkeeping() {
        let (coordinator, ticks, backend) = coordinator();
        ticks.set(BUF, 1);
        coordinator.on_file_ready_to_parse(BUF, json!({}), false);
        backend.fail(0, "server crashed");

        let err = coordinator.handle_file_parse_request(BUF, false).unwrap_err();

        assert!(matches!(err, BufsyncError::Backend { .. }));
        let state = coordinator.registry().get(BUF).unwrap();
        assert!(state.is_response_handled());
        assert!(!state.has_active_request());
    }

    #[test]
    fn test_poll_error_still_dispatches_buffered_request() {
        let (coordinator, ticks, backend) = coordinator();
        ticks.set(BUF, 1);
        coordinator.on_file_ready_to_parse(BUF, json!({"edit": 1}), false);
        ticks.set(BUF, 2);
        coordinator.on_file_ready_to_parse(BUF, json!({"edit": 2}), false);
        backend.fail(0, "server crashed");

        let err = coordinator.handle_file_parse_request(BUF, false).unwrap_err();

        assert!(matches!(err, BufsyncError::Backend { .. }));
        assert_eq!(backend.started_count(), 2);
        assert_eq!(backend.started_extra_data(1), json!({"edit": 2}));
        let state = coordinator.registry().get(BUF).unwrap();
        assert!(state.has_active_request());
        assert!(!state.has_buffered_request());
        assert!(!state.is_response_handled());
        assert_eq!(state.parse_tick(), 2);
    }

    #[test]
    fn test_poll_error_clears_previous_highlights() {
        let (coordinator, ticks, backend) = coordinator();
        ticks.set(BUF, 1);
        coordinator.on_file_ready_to_parse(BUF, json!({}), false);
        backend.complete(0, keyed(3));
        coordinator.handle_file_parse_request(BUF, false).unwrap();
        assert_eq!(coordinator.registry().get(BUF).unwrap().highlights().len(), 1);

        ticks.set(BUF, 2);
        coordinator.on_file_ready_to_parse(BUF, json!({}), false);
        backend.fail(1, "server crashed");

        assert!(coordinator.handle_file_parse_request(BUF, false).is_err());
        let state = coordinator.registry().get(BUF).unwrap();
        assert!(state.highlights().is_empty());
        assert_eq!(state.error_count(), 1);
    }

    #[test]
    fn test_cursor_echo_can_be_disabled() {
        let ticks = Arc::new(TickTable::default());
        let backend = Arc::new(ManualBackend::default());
        let mut config = BufsyncConfig::default();
        config.diagnostics.echo_current = false;
        let registry = BufferRegistry::new(
            Arc::new(config),
            EditorServices {
                ticks,
                filetypes: Arc::new(Cpp),
                windows: Arc::new(NoWindows),
                backend: backend.clone(),
            },
        );
        let coordinator = ParseCoordinator::new(Arc::new(registry));

        coordinator.on_file_ready_to_parse(BUF, json!({}), true);
        backend.complete(0, keyed(2));
        coordinator.handle_file_parse_request(BUF, false).unwrap();

        assert_eq!(coordinator.on_cursor_moved(BUF, 2), None);
    }

    #[test]
    fn test_unknown_buffer_queries_are_empty() {
        let (coordinator, _ticks, _backend) = coordinator();
        assert_eq!(coordinator.error_count(BufferId(9)), 0);
        assert_eq!(coordinator.warning_count(BufferId(9)), 0);
        assert!(coordinator.location_list(BufferId(9)).is_empty());
        assert!(coordinator.on_cursor_moved(BufferId(9), 1).is_none());
        assert!(coordinator.registry().is_empty());
    }

    #[test]
    fn test_wipe_discards_state() {
        let (coordinator, _ticks, _backend) = coordinator();
        coordinator.on_file_ready_to_parse(BUF, json!({}), true);
        coordinator.on_buffer_wipe(BUF);
        assert!(coordinator.registry().get(BUF).is_none());
    }
}
