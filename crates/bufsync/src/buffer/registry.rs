use super::state::{BufferServices, BufferState};
use bufsync_core::{BufferId, BufsyncConfig, ChangeTickOracle, FiletypeClassifier, ParseBackend};
use bufsync_ui::{DiagnosticStore, HighlightStore, WindowEnv};
use dashmap::DashMap;
use dashmap::mapref::one::{Ref, RefMut};
use std::sync::Arc;

/// Editor-side collaborators shared by all buffers.
#[derive(Clone)]
pub struct EditorServices {
    pub ticks: Arc<dyn ChangeTickOracle>,
    pub filetypes: Arc<dyn FiletypeClassifier>,
    pub windows: Arc<dyn WindowEnv>,
    pub backend: Arc<dyn ParseBackend>,
}

/// All buffer states, created on first access.
///
/// Creation goes through the `DashMap` entry API, so a buffer's state is
/// built at most once even when two threads resolve the same id. Returned
/// references hold a shard lock and should be dropped quickly.
pub struct BufferRegistry {
    buffers: DashMap<BufferId, BufferState>,
    config: Arc<BufsyncConfig>,
    services: EditorServices,
}

impl BufferRegistry {
    pub fn new(config: Arc<BufsyncConfig>, services: EditorServices) -> Self {
        Self {
            buffers: DashMap::new(),
            config,
            services,
        }
    }

    /// Returns the state of `id`, creating it if this is the first access.
    pub fn get_or_create(&self, id: BufferId) -> RefMut<'_, BufferId, BufferState> {
        self.buffers
            .entry(id)
            .or_insert_with(|| self.create(id))
    }

    /// Returns the state of `id` without creating it.
    pub fn get(&self, id: BufferId) -> Option<Ref<'_, BufferId, BufferState>> {
        self.buffers.get(&id)
    }

    /// Mutable access to the state of `id` without creating it.
    pub fn get_mut(&self, id: BufferId) -> Option<RefMut<'_, BufferId, BufferState>> {
        self.buffers.get_mut(&id)
    }

    /// Drops the state of a wiped buffer. Any request still in flight is
    /// abandoned.
    pub fn discard(&self, id: BufferId) -> Option<BufferState> {
        let removed = self.buffers.remove(&id).map(|(_, state)| state);
        if removed.is_some() {
            tracing::debug!("Discarded state of buffer {}", id);
        }
        removed
    }

    /// Filetypes the editor currently assigns to `id`.
    pub fn filetypes(&self, id: BufferId) -> Vec<String> {
        self.services.filetypes.filetypes(id)
    }

    pub fn config(&self) -> &BufsyncConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Ids of all tracked buffers, in ascending order.
    pub fn ids(&self) -> Vec<BufferId> {
        let mut ids: Vec<BufferId> = self.buffers.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    fn create(&self, id: BufferId) -> BufferState {
        let filetypes = self.services.filetypes.filetypes(id);
        let async_diagnostics = self.config.is_async_diagnostics(&filetypes);

        tracing::debug!(
            "Tracking buffer {} (filetypes: {:?}, async diagnostics: {})",
            id,
            filetypes,
            async_diagnostics
        );

        BufferState::new(
            id,
            self.config.parse_event.clone(),
            async_diagnostics,
            DiagnosticStore::new(id, self.config.diagnostics.max_to_display),
            HighlightStore::new(id, Arc::clone(&self.services.windows)),
            BufferServices {
                ticks: Arc::clone(&self.services.ticks),
                backend: Arc::clone(&self.services.backend),
            },
        )
    }
}

impl std::fmt::Debug for BufferRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferRegistry")
            .field("buffers", &self.ids())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
