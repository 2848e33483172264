//! Common test utilities for integration tests.
//!
//! `Harness` wires a coordinator to an in-memory editor and a scripted
//! backend running on a real multi-thread runtime.

use bufsync::replay::{MemoryEditor, ReplySpec, ScriptedService};
use bufsync::{BufferRegistry, EditorServices, ParseCoordinator};
use bufsync_core::{BufferId, BufsyncConfig, TaskBackend};
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Runtime;

pub(crate) struct Harness {
    pub coordinator: ParseCoordinator,
    pub editor: Arc<MemoryEditor>,
    pub service: Arc<ScriptedService>,
    // Dropped last so in-flight tasks outlive the coordinator.
    _runtime: Runtime,
}

impl Harness {
    pub(crate) fn new(config: BufsyncConfig, replies: Vec<ReplySpec>) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("Failed to build runtime");

        let editor = Arc::new(MemoryEditor::default());
        let service = Arc::new(ScriptedService::new(replies));
        let backend = TaskBackend::new(service.clone(), runtime.handle().clone())
            .with_timeout(config.backend.timeout());

        let registry = BufferRegistry::new(
            Arc::new(config),
            EditorServices {
                ticks: editor.clone(),
                filetypes: editor.clone(),
                windows: editor.clone(),
                backend: Arc::new(backend),
            },
        );

        Self {
            coordinator: ParseCoordinator::new(Arc::new(registry)),
            editor,
            service,
            _runtime: runtime,
        }
    }

    /// Opens `buffer` with a single filetype at tick 0.
    pub(crate) fn open(&self, buffer: u32, filetype: &str) -> BufferId {
        let id = BufferId(buffer);
        self.editor.open_buffer(id, vec![filetype.to_string()], 0);
        id
    }
}

pub(crate) fn reply(payload: Value) -> ReplySpec {
    ReplySpec {
        payload,
        ..ReplySpec::default()
    }
}

pub(crate) fn delayed(payload: Value, delay_ms: u64) -> ReplySpec {
    ReplySpec {
        payload,
        delay_ms,
        ..ReplySpec::default()
    }
}
