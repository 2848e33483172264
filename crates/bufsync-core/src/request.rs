//! Parse requests and the backend seam they are started through.

use crate::error::{BufsyncError, Result};
use crate::response::ParseResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event sent to the completion backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNotification {
    pub event_name: String,
    /// Opaque request payload (file contents, cursor position, ...).
    pub extra_data: Value,
}

impl EventNotification {
    pub fn new(event_name: impl Into<String>, extra_data: Value) -> Self {
        Self {
            event_name: event_name.into(),
            extra_data,
        }
    }
}

/// Blocks the calling thread until the request it was taken from is done.
///
/// Detached from the handle, so the caller can wait without holding the lock
/// that guards the request.
pub type Completion = Box<dyn FnOnce() + Send>;

/// One started backend call.
///
/// Implementations complete asynchronously; the editor thread polls
/// [`is_done`](Self::is_done) and only calls [`response`](Self::response)
/// once it is done or when it is willing to block.
pub trait RequestHandle: Send + Sync {
    /// Returns true once the backend call finished, successfully or not.
    fn is_done(&self) -> bool;

    /// Resolves the call, blocking until it completes.
    ///
    /// Deferred backend failures surface here. Called at most once per
    /// handle by [`ParseRequest`].
    fn response(&mut self) -> Result<ParseResponse>;

    /// Returns true when the backend asked for the request to be sent again.
    fn should_resend(&self) -> bool;

    /// Detached wait for completion. Handles that cannot provide one return
    /// `None`, and callers fall back to blocking in
    /// [`response`](Self::response).
    fn completion(&self) -> Option<Completion> {
        None
    }
}

/// Starts backend calls.
pub trait ParseBackend: Send + Sync {
    fn start(&self, event: &EventNotification) -> Box<dyn RequestHandle>;
}

/// A parse request owned by a buffer.
///
/// Built unstarted so it can wait in a buffer's single buffered slot, then
/// started once it becomes the active request. The first response fetch
/// resolves the handle; the decoded response is cached so the diagnostics
/// and highlights consumers of one response share a single backend fetch.
/// A failed fetch returns its error once and leaves an empty response
/// behind.
pub struct ParseRequest {
    event: EventNotification,
    handle: Option<Box<dyn RequestHandle>>,
    cached: Option<ParseResponse>,
    fetches: usize,
}

impl ParseRequest {
    pub fn new(event: EventNotification) -> Self {
        Self {
            event,
            handle: None,
            cached: None,
            fetches: 0,
        }
    }

    pub fn event(&self) -> &EventNotification {
        &self.event
    }

    pub fn extra_data(&self) -> &Value {
        &self.event.extra_data
    }

    /// Starts the backend call. Starting twice is a no-op.
    pub fn start(&mut self, backend: &dyn ParseBackend) {
        if self.handle.is_some() {
            tracing::debug!("Parse request {} already started", self.event.event_name);
            return;
        }
        self.handle = Some(backend.start(&self.event));
    }

    pub fn is_started(&self) -> bool {
        self.handle.is_some()
    }

    /// Returns true once the backend call completed. Unstarted requests are
    /// never done.
    pub fn is_done(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.is_done())
    }

    pub fn should_resend(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| handle.should_resend())
    }

    /// Detached wait for a started call that is still running.
    pub fn completion(&self) -> Option<Completion> {
        self.handle
            .as_ref()
            .filter(|handle| !handle.is_done())
            .and_then(|handle| handle.completion())
    }

    /// Fetches the decoded response, blocking if the call is still running.
    ///
    /// # Errors
    ///
    /// Returns the backend's deferred error on the first fetch of a failed
    /// call, and [`BufsyncError::RequestNotStarted`] for unstarted requests.
    pub fn response(&mut self) -> Result<ParseResponse> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }

        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| BufsyncError::RequestNotStarted {
                event: self.event.event_name.clone(),
            })?;

        self.fetches += 1;
        match handle.response() {
            Ok(response) => {
                self.cached = Some(response.clone());
                Ok(response)
            }
            Err(e) => {
                self.cached = Some(ParseResponse::Unrecognized);
                Err(e)
            }
        }
    }

    /// Number of times the backend handle was actually resolved.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }
}

impl std::fmt::Debug for ParseRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseRequest")
            .field("event", &self.event)
            .field("started", &self.handle.is_some())
            .field("has_response", &self.cached.is_some())
            .field("fetches", &self.fetches)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Finished {
        outcome: Option<Result<ParseResponse>>,
        calls: Arc<AtomicUsize>,
        resend: bool,
    }

    impl RequestHandle for Finished {
        fn is_done(&self) -> bool {
            true
        }

        fn response(&mut self) -> Result<ParseResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.take().unwrap_or(Ok(ParseResponse::Unrecognized))
        }

        fn should_resend(&self) -> bool {
            self.resend
        }
    }

    struct OneShotBackend {
        payload: Value,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl ParseBackend for OneShotBackend {
        fn start(&self, _event: &EventNotification) -> Box<dyn RequestHandle> {
            let outcome = if self.fail {
                Err(BufsyncError::Backend {
                    event: "FileReadyToParse".into(),
                    message: "crashed".into(),
                })
            } else {
                Ok(ParseResponse::from_value(self.payload.clone()))
            };
            Box::new(Finished {
                outcome: Some(outcome),
                calls: Arc::clone(&self.calls),
                resend: self.fail,
            })
        }
    }

    fn backend(payload: Value, fail: bool) -> (OneShotBackend, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = OneShotBackend {
            payload,
            fail,
            calls: Arc::clone(&calls),
        };
        (backend, calls)
    }

    fn request() -> ParseRequest {
        ParseRequest::new(EventNotification::new("FileReadyToParse", json!({"n": 1})))
    }

    #[test]
    fn test_unstarted_request() {
        let mut request = request();
        assert!(!request.is_started());
        assert!(!request.is_done());
        assert!(!request.should_resend());
        assert!(request.completion().is_none());
        assert!(matches!(
            request.response(),
            Err(BufsyncError::RequestNotStarted { .. })
        ));
    }

    #[test]
    fn test_response_is_cached_after_first_fetch() {
        let (backend, calls) = backend(json!({"highlights": []}), false);
        let mut request = request();
        request.start(&backend);

        assert!(request.is_done());
        assert!(request.completion().is_none());
        request.response().unwrap();
        request.response().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(request.fetch_count(), 1);
    }

    #[test]
    fn test_failed_fetch_surfaces_once() {
        let (backend, calls) = backend(json!([]), true);
        let mut request = request();
        request.start(&backend);

        assert!(matches!(
            request.response(),
            Err(BufsyncError::Backend { .. })
        ));
        assert_eq!(request.response().unwrap(), ParseResponse::Unrecognized);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(request.should_resend());
    }

    #[test]
    fn test_double_start_keeps_first_handle() {
        let (backend, _calls) = backend(json!([]), false);
        let mut request = request();
        request.start(&backend);
        request.start(&backend);
        assert_eq!(request.extra_data(), &json!({"n": 1}));
        assert!(request.is_started());
    }
}
