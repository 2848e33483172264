//! Scenario format, scripted backend, and the replay loop.

use super::editor::MemoryEditor;
use crate::buffer::{BufferRegistry, EditorServices, Readiness};
use crate::coordinator::{ParseCoordinator, PollOutcome};
use async_trait::async_trait;
use bufsync_core::{
    BufferId, BufsyncConfig, BufsyncError, EventNotification, ParseService, Result, ServiceReply,
    TaskBackend,
};
use bufsync_ui::{LineRange, LocationEntry, MatchSpan, WindowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// A recorded editor session.
///
/// # Examples
///
/// ```
/// use bufsync::replay::Scenario;
///
/// let scenario: Scenario = serde_json::from_str(r#"{
///     "buffers": [{ "id": 1, "filetypes": ["cpp"] }],
///     "replies": [{ "payload": [] }],
///     "steps": [
///         { "action": "edit", "buffer": 1 },
///         { "action": "ready_to_parse", "buffer": 1 },
///         { "action": "poll", "buffer": 1, "block": true }
///     ]
/// }"#).unwrap();
///
/// assert_eq!(scenario.steps.len(), 3);
/// assert_eq!(scenario.config.parse_event, "FileReadyToParse");
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: BufsyncConfig,
    pub buffers: Vec<BufferSpec>,
    #[serde(default)]
    pub windows: Vec<WindowSpec>,
    /// Backend replies, consumed in request start order.
    #[serde(default)]
    pub replies: Vec<ReplySpec>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BufferSpec {
    pub id: BufferId,
    #[serde(default)]
    pub filetypes: Vec<String>,
    #[serde(default)]
    pub tick: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowSpec {
    pub id: WindowId,
    pub buffer: BufferId,
    pub first: u32,
    pub last: u32,
}

/// One scripted backend reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplySpec {
    #[serde(default)]
    pub payload: Value,
    /// Simulated backend latency.
    #[serde(default)]
    pub delay_ms: u64,
    /// Fail the request with this message.
    #[serde(default)]
    pub error: Option<String>,
    /// Fail with a confirmation prompt; the request is resent later.
    #[serde(default)]
    pub confirm: Option<String>,
    #[serde(default)]
    pub resend: bool,
}

fn default_settle_ms() -> u64 {
    5000
}

/// Editor event replayed against the coordinator.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Edit {
        buffer: BufferId,
    },
    ReadyToParse {
        buffer: BufferId,
        #[serde(default)]
        extra_data: Value,
        #[serde(default)]
        force: bool,
    },
    Visit {
        buffer: BufferId,
        #[serde(default)]
        extra_data: Value,
    },
    Poll {
        buffer: BufferId,
        #[serde(default)]
        block: bool,
    },
    /// Waits until the active request of `buffer` is no longer running.
    Settle {
        buffer: BufferId,
        #[serde(default = "default_settle_ms")]
        timeout_ms: u64,
    },
    Focus {
        window: WindowId,
    },
    Scroll {
        window: WindowId,
        first: u32,
        last: u32,
    },
    LeaveWindow {
        window: WindowId,
    },
    CursorMoved {
        buffer: BufferId,
        line: u32,
    },
    Wipe {
        buffer: BufferId,
    },
}

impl Step {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Edit { .. } => "edit",
            Self::ReadyToParse { .. } => "ready_to_parse",
            Self::Visit { .. } => "visit",
            Self::Poll { .. } => "poll",
            Self::Settle { .. } => "settle",
            Self::Focus { .. } => "focus",
            Self::Scroll { .. } => "scroll",
            Self::LeaveWindow { .. } => "leave_window",
            Self::CursorMoved { .. } => "cursor_moved",
            Self::Wipe { .. } => "wipe",
        }
    }
}

/// [`ParseService`] answering from a fixed list of replies.
///
/// Once the list is exhausted every request gets an empty diagnostic list.
#[derive(Debug, Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<ReplySpec>>,
    received: Mutex<Vec<EventNotification>>,
}

impl ScriptedService {
    pub fn new(replies: Vec<ReplySpec>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            received: Mutex::default(),
        }
    }

    /// Events received so far, in order.
    pub fn received(&self) -> Vec<EventNotification> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ParseService for ScriptedService {
    async fn parse(&self, event: EventNotification) -> Result<ServiceReply> {
        let reply = {
            self.received
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
        };
        let reply = reply.unwrap_or_else(|| {
            tracing::warn!("No scripted reply left for {}", event.event_name);
            ReplySpec {
                payload: Value::Array(Vec::new()),
                ..ReplySpec::default()
            }
        });

        if reply.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(reply.delay_ms)).await;
        }

        if let Some(prompt) = reply.confirm {
            return Err(BufsyncError::ConfirmationRequired(prompt));
        }
        if let Some(message) = reply.error {
            return Err(BufsyncError::Backend {
                event: event.event_name,
                message,
            });
        }

        Ok(ServiceReply {
            payload: reply.payload,
            resend: reply.resend,
        })
    }
}

/// What happened at one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PollOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepReport {
    const fn new(index: usize, action: &'static str) -> Self {
        Self {
            index,
            action,
            sent: None,
            outcome: None,
            echo: None,
            error: None,
        }
    }
}

/// Final state of one buffer.
#[derive(Debug, Clone, Serialize)]
pub struct BufferReport {
    pub id: BufferId,
    pub parse_tick: u64,
    pub handled: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub highlights: usize,
    pub location_list: Vec<LocationEntry>,
}

/// Outcome of a replayed scenario.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub steps: Vec<StepReport>,
    pub buffers: Vec<BufferReport>,
    /// Painted matches keyed by match group name.
    pub matches: BTreeMap<String, Vec<MatchSpan>>,
    /// Requests that reached the backend.
    pub requests: usize,
}

/// Replays `scenario` against a fresh registry whose backend runs on
/// `runtime`.
///
/// Step failures are recorded in the report; only setup errors are returned.
pub fn run_scenario(scenario: &Scenario, runtime: &Handle) -> Result<Report> {
    let editor = Arc::new(MemoryEditor::default());
    for buffer in &scenario.buffers {
        editor.open_buffer(buffer.id, buffer.filetypes.clone(), buffer.tick);
    }
    for window in &scenario.windows {
        editor.open_window(
            window.id,
            window.buffer,
            LineRange::new(window.first, window.last),
        );
    }

    let service = Arc::new(ScriptedService::new(scenario.replies.clone()));
    let backend = TaskBackend::new(service.clone(), runtime.clone())
        .with_timeout(scenario.config.backend.timeout());

    let registry = BufferRegistry::new(
        Arc::new(scenario.config.clone()),
        EditorServices {
            ticks: editor.clone(),
            filetypes: editor.clone(),
            windows: editor.clone(),
            backend: Arc::new(backend),
        },
    );
    let coordinator = ParseCoordinator::new(Arc::new(registry));

    tracing::info!(
        "Replaying {} steps over {} buffers",
        scenario.steps.len(),
        scenario.buffers.len()
    );

    let steps = scenario
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| apply(&coordinator, &editor, index, step))
        .collect();

    let registry = coordinator.registry();
    let buffers = registry
        .ids()
        .into_iter()
        .filter_map(|id| {
            let state = registry.get(id)?;
            Some(BufferReport {
                id,
                parse_tick: state.parse_tick(),
                handled: state.is_response_handled(),
                error_count: state.error_count(),
                warning_count: state.warning_count(),
                highlights: state.highlights().len(),
                location_list: state.location_list_entries(),
            })
        })
        .collect();

    Ok(Report {
        steps,
        buffers,
        matches: editor.painted(),
        requests: service.received().len(),
    })
}

fn apply(
    coordinator: &ParseCoordinator,
    editor: &MemoryEditor,
    index: usize,
    step: &Step,
) -> StepReport {
    let mut report = StepReport::new(index, step.name());
    tracing::debug!("Step {}: {:?}", index, step);

    match step {
        Step::Edit { buffer } => {
            editor.edit(*buffer);
        }
        Step::ReadyToParse {
            buffer,
            extra_data,
            force,
        } => {
            report.sent = Some(coordinator.on_file_ready_to_parse(
                *buffer,
                extra_data.clone(),
                *force,
            ));
        }
        Step::Visit { buffer, extra_data } => {
            report.sent = Some(coordinator.on_buffer_visit(*buffer, extra_data.clone()));
        }
        Step::Poll { buffer, block } => {
            match coordinator.handle_file_parse_request(*buffer, *block) {
                Ok(outcome) => report.outcome = Some(outcome),
                Err(e) => {
                    tracing::warn!("Poll of buffer {} failed: {}", buffer, e);
                    report.error = Some(e.to_string());
                }
            }
        }
        Step::Settle { buffer, timeout_ms } => {
            if !settle(coordinator, *buffer, Duration::from_millis(*timeout_ms)) {
                report.error = Some(format!(
                    "request of buffer {} still running after {}ms",
                    buffer, timeout_ms
                ));
            }
        }
        Step::Focus { window } => editor.focus(*window),
        Step::Scroll {
            window,
            first,
            last,
        } => {
            let range = LineRange::new(*first, *last);
            editor.scroll(*window, range);
            editor.focus(*window);
            if let Some(buffer) = editor.buffer_in(*window) {
                coordinator.on_scroll(buffer, range);
            }
        }
        Step::LeaveWindow { window } => {
            editor.focus(*window);
            if let Some(buffer) = editor.buffer_in(*window) {
                coordinator.on_window_leave(buffer);
            }
        }
        Step::CursorMoved { buffer, line } => {
            report.echo = coordinator.on_cursor_moved(*buffer, *line);
        }
        Step::Wipe { buffer } => coordinator.on_buffer_wipe(*buffer),
    }

    report
}

fn settle(coordinator: &ParseCoordinator, buffer: BufferId, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        let pending = coordinator
            .registry()
            .get(buffer)
            .is_some_and(|state| state.parse_request_readiness(false) == Readiness::Pending);
        if !pending {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}
