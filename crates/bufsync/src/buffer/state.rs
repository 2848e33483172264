use bufsync_core::{
    BufferId, BufsyncError, ChangeTickOracle, Completion, Diagnostic, EventNotification,
    Highlight, ParseBackend, ParseRequest, ParseResponse, Result,
};
use bufsync_ui::{DiagnosticStore, HighlightStore, LineRange, LocationEntry};
use serde_json::Value;
use std::sync::Arc;

/// Readiness of a buffer's active parse request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No request is active.
    None,
    /// The active request is still running.
    Pending,
    /// The caller asked to block; fetching the response will wait.
    Blocked,
    /// The active request finished and another one is buffered behind it.
    ReadyWithBuffer,
    /// The active request finished and nothing is buffered.
    Ready,
}

impl Readiness {
    /// Returns true when the active response may be consumed now.
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Blocked | Self::ReadyWithBuffer | Self::Ready)
    }
}

/// Collaborators a buffer talks to, shared by every buffer of a registry.
#[derive(Clone)]
pub struct BufferServices {
    pub ticks: Arc<dyn ChangeTickOracle>,
    pub backend: Arc<dyn ParseBackend>,
}

/// Parse request state of one editor buffer.
///
/// At most one request is in flight per buffer. A request sent while one is
/// active waits in a single buffered slot, newer sends overwriting older
/// ones, and is started once the active response has been consumed.
///
/// Ticks record *when* a request was sent; request sequence numbers record
/// *whether* the latest dispatch was handled, so re-sending at an unchanged
/// tick (e.g. on buffer visit) still leaves the buffer unhandled.
pub struct BufferState {
    id: BufferId,
    event_name: String,
    parse_tick: u64,
    handled_tick: u64,
    dispatched: u64,
    handled: u64,
    active: Option<ParseRequest>,
    buffered: Option<ParseRequest>,
    async_diagnostics: bool,
    diagnostics: DiagnosticStore,
    highlights: HighlightStore,
    services: BufferServices,
}

impl BufferState {
    pub fn new(
        id: BufferId,
        event_name: impl Into<String>,
        async_diagnostics: bool,
        diagnostics: DiagnosticStore,
        highlights: HighlightStore,
        services: BufferServices,
    ) -> Self {
        Self {
            id,
            event_name: event_name.into(),
            parse_tick: 0,
            handled_tick: 0,
            dispatched: 0,
            handled: 0,
            active: None,
            buffered: None,
            async_diagnostics,
            diagnostics,
            highlights,
            services,
        }
    }

    pub const fn id(&self) -> BufferId {
        self.id
    }

    /// Whether diagnostics for this buffer arrive outside parse responses.
    pub const fn async_diagnostics(&self) -> bool {
        self.async_diagnostics
    }

    /// Sends a parse request, or buffers it behind the active one.
    pub fn send_parse_request(&mut self, extra_data: Value) {
        let request = ParseRequest::new(EventNotification::new(&self.event_name, extra_data));

        if self.active.is_none() {
            self.dispatch(request);
            return;
        }

        if self.buffered.replace(request).is_some() {
            tracing::debug!("Buffer {}: replaced buffered parse request", self.id);
        } else {
            tracing::debug!("Buffer {}: buffered parse request", self.id);
        }
    }

    /// Promotes the buffered request, if any, to active and starts it.
    ///
    /// Does nothing while the active request is still running.
    pub fn try_dispatch_buffered_request(&mut self) {
        if self.buffered.is_none() {
            return;
        }
        if self.active.as_ref().is_some_and(|active| !active.is_done()) {
            tracing::debug!(
                "Buffer {}: active request still running, keeping buffered request",
                self.id
            );
            return;
        }
        if let Some(request) = self.buffered.take() {
            self.dispatch(request);
        }
    }

    fn dispatch(&mut self, mut request: ParseRequest) {
        request.start(self.services.backend.as_ref());
        self.dispatched = self.dispatched.wrapping_add(1);
        self.parse_tick = self.current_tick();
        self.active = Some(request);

        tracing::debug!(
            "Buffer {}: dispatched parse request #{} at tick {}",
            self.id,
            self.dispatched,
            self.parse_tick
        );
    }

    pub fn parse_request_readiness(&self, block: bool) -> Readiness {
        let Some(active) = &self.active else {
            return Readiness::None;
        };
        if block {
            Readiness::Blocked
        } else if !active.is_done() {
            Readiness::Pending
        } else if self.buffered.is_some() {
            Readiness::ReadyWithBuffer
        } else {
            Readiness::Ready
        }
    }

    /// Returns true when the buffer changed since the last dispatch.
    pub fn needs_reparse(&self) -> bool {
        self.current_tick() != self.parse_tick
    }

    pub fn should_resend_request(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(ParseRequest::should_resend)
    }

    /// Consumes the active response's diagnostics.
    ///
    /// For async-diagnostics buffers the response is still fetched unless
    /// `force` is set, so deferred backend errors surface, but its
    /// diagnostics are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BufsyncError::NoActiveRequest`] with nothing to consume, or
    /// the backend error carried by the response.
    pub fn update_diagnostics(&mut self, force: bool) -> Result<()> {
        let response = self.fetch_response()?;

        if force || !self.async_diagnostics {
            self.diagnostics.update(response.diagnostics().to_vec());
        } else {
            tracing::trace!(
                "Buffer {}: diagnostics arrive asynchronously, discarding response",
                self.id
            );
        }
        Ok(())
    }

    /// Consumes the active response's highlights, clearing old ones when the
    /// response has none.
    ///
    /// # Errors
    ///
    /// Same as [`update_diagnostics`](Self::update_diagnostics).
    pub fn update_highlights(&mut self) -> Result<()> {
        let response = self.fetch_response()?;
        self.highlights.update(response.highlights().to_vec());
        Ok(())
    }

    /// Fetches the active response without applying it.
    pub fn response(&mut self) -> Result<ParseResponse> {
        self.fetch_response()
    }

    fn fetch_response(&mut self) -> Result<ParseResponse> {
        self.active
            .as_mut()
            .ok_or(BufsyncError::NoActiveRequest(self.id))?
            .response()
    }

    /// Records the active response as handled and drops the request.
    ///
    /// A request still sitting in the buffered slot is started right away,
    /// since nothing would be left to buffer it behind.
    pub fn mark_response_handled(&mut self) {
        self.active = None;
        self.handled_tick = self.parse_tick;
        self.handled = self.dispatched;

        if let Some(request) = self.buffered.take() {
            tracing::debug!(
                "Buffer {}: starting buffered request after handling response",
                self.id
            );
            self.dispatch(request);
        }
    }

    pub const fn is_response_handled(&self) -> bool {
        self.handled == self.dispatched
    }

    pub const fn parse_tick(&self) -> u64 {
        self.parse_tick
    }

    pub const fn handled_tick(&self) -> u64 {
        self.handled_tick
    }

    pub const fn has_active_request(&self) -> bool {
        self.active.is_some()
    }

    pub const fn has_buffered_request(&self) -> bool {
        self.buffered.is_some()
    }

    /// Detached wait for the active request, if it is still running.
    pub fn active_completion(&self) -> Option<Completion> {
        self.active.as_ref().and_then(ParseRequest::completion)
    }

    /// Payload of the active request.
    pub fn active_extra_data(&self) -> Option<&Value> {
        self.active.as_ref().map(ParseRequest::extra_data)
    }

    /// Payload of the buffered request.
    pub fn buffered_extra_data(&self) -> Option<&Value> {
        self.buffered.as_ref().map(ParseRequest::extra_data)
    }

    pub fn move_highlights(&mut self, range: LineRange) {
        self.highlights.move_or_resize(range);
    }

    pub fn refresh_highlights(&mut self) {
        self.highlights.refresh();
    }

    pub fn clear_current_window_highlights(&mut self) {
        self.highlights.clear_for_window();
    }

    pub fn highlights(&self) -> &[Highlight] {
        self.highlights.highlights()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.warning_count()
    }

    pub fn location_list_entries(&self) -> Vec<LocationEntry> {
        self.diagnostics.location_list_entries()
    }

    pub fn diagnostic_for_line(&self, line: u32) -> Option<&Diagnostic> {
        self.diagnostics.diagnostic_for_line(line)
    }

    fn current_tick(&self) -> u64 {
        self.services.ticks.change_tick(self.id)
    }
}

impl std::fmt::Debug for BufferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferState")
            .field("id", &self.id)
            .field("parse_tick", &self.parse_tick)
            .field("handled_tick", &self.handled_tick)
            .field("dispatched", &self.dispatched)
            .field("handled", &self.handled)
            .field("active", &self.active)
            .field("buffered", &self.buffered)
            .field("async_diagnostics", &self.async_diagnostics)
            .field("diagnostics_count", &self.diagnostics.diagnostics().len())
            .field("highlights_count", &self.highlights.highlights().len())
            .finish_non_exhaustive()
    }
}
