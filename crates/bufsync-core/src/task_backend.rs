//! Backend that runs each parse request as a tokio task.
//!
//! The editor thread is not a runtime thread: it polls
//! `JoinHandle::is_finished` and, when a caller opts into blocking, waits on
//! the handle with `futures::executor::block_on`. A completion signal on a
//! `watch` channel lets callers wait without touching the handle. Never fetch a response
//! from inside a current-thread runtime that also drives the task.

use crate::error::{BufsyncError, Result};
use crate::request::{Completion, EventNotification, ParseBackend, RequestHandle};
use crate::response::ParseResponse;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Raw reply of a [`ParseService`].
#[derive(Debug, Clone)]
pub struct ServiceReply {
    pub payload: Value,
    /// Backend asks for the same request to be sent again.
    pub resend: bool,
}

impl ServiceReply {
    pub const fn new(payload: Value) -> Self {
        Self {
            payload,
            resend: false,
        }
    }
}

/// The asynchronous call that actually talks to the completion backend.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use bufsync_core::{EventNotification, ParseService, ServiceReply};
/// use serde_json::json;
///
/// struct Silent;
///
/// #[async_trait]
/// impl ParseService for Silent {
///     async fn parse(&self, _event: EventNotification) -> bufsync_core::Result<ServiceReply> {
///         Ok(ServiceReply::new(json!([])))
///     }
/// }
/// ```
#[async_trait]
pub trait ParseService: Send + Sync + 'static {
    async fn parse(&self, event: EventNotification) -> Result<ServiceReply>;
}

/// [`ParseBackend`] spawning one task per started request.
pub struct TaskBackend {
    service: Arc<dyn ParseService>,
    runtime: Handle,
    timeout: Option<Duration>,
}

impl TaskBackend {
    pub fn new(service: Arc<dyn ParseService>, runtime: Handle) -> Self {
        Self {
            service,
            runtime,
            timeout: None,
        }
    }

    /// Resolves requests that outlive `timeout` with [`BufsyncError::Timeout`]
    /// and marks them for resend.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ParseBackend for TaskBackend {
    fn start(&self, event: &EventNotification) -> Box<dyn RequestHandle> {
        let service = Arc::clone(&self.service);
        let timeout = self.timeout;
        let resend = Arc::new(AtomicBool::new(false));
        let resend_flag = Arc::clone(&resend);
        let event = event.clone();
        let event_name = event.event_name.clone();

        tracing::debug!("Starting backend task for {}", event_name);

        let (done_tx, done_rx) = watch::channel(false);

        let task = self.runtime.spawn(async move {
            let outcome = run(service, event, timeout, &resend_flag).await;
            let _ = done_tx.send(true);
            outcome
        });

        Box::new(TaskHandle {
            event_name,
            task: Some(task),
            resend,
            done: done_rx,
        })
    }
}

async fn run(
    service: Arc<dyn ParseService>,
    event: EventNotification,
    timeout: Option<Duration>,
    resend: &AtomicBool,
) -> Result<ParseResponse> {
    let name = event.event_name.clone();
    let call = service.parse(event);
    let reply = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(reply) => reply,
            Err(_) => {
                resend.store(true, Ordering::Release);
                return Err(BufsyncError::Timeout {
                    event: name,
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                });
            }
        },
        None => call.await,
    };

    match reply {
        Ok(reply) => {
            resend.store(reply.resend, Ordering::Release);
            Ok(ParseResponse::from_value(reply.payload))
        }
        Err(e) => {
            if matches!(e, BufsyncError::ConfirmationRequired(_)) {
                resend.store(true, Ordering::Release);
            }
            Err(e)
        }
    }
}

struct TaskHandle {
    event_name: String,
    task: Option<JoinHandle<Result<ParseResponse>>>,
    resend: Arc<AtomicBool>,
    done: watch::Receiver<bool>,
}

impl RequestHandle for TaskHandle {
    fn is_done(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    fn response(&mut self) -> Result<ParseResponse> {
        let task = self
            .task
            .take()
            .ok_or_else(|| BufsyncError::TaskAborted {
                event: self.event_name.clone(),
                reason: "response already taken".into(),
            })?;

        match futures::executor::block_on(task) {
            Ok(outcome) => outcome,
            Err(e) => Err(BufsyncError::TaskAborted {
                event: self.event_name.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn should_resend(&self) -> bool {
        self.resend.load(Ordering::Acquire)
    }

    fn completion(&self) -> Option<Completion> {
        let mut done = self.done.clone();
        Some(Box::new(move || {
            // A dropped sender means the task panicked or was cancelled.
            let _ = futures::executor::block_on(done.wait_for(|finished| *finished));
        }))
    }
}
