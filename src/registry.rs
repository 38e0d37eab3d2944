//! Stage registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{PipelineDefinition, Stage, StageId};

/// Maps stage identifiers to their implementations.
///
/// Registering twice for the same identifier replaces the earlier stage.
#[derive(Clone, Default)]
pub struct StageRegistry {
    stages: HashMap<StageId, Arc<dyn Stage>>,
}

impl StageRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `stage` under `id`, replacing any previous registration.
    pub fn register<S>(&mut self, id: StageId, stage: S)
    where
        S: Stage + 'static,
    {
        self.register_shared(id, Arc::new(stage));
    }

    /// Register an already shared stage.
    pub fn register_shared(&mut self, id: StageId, stage: Arc<dyn Stage>) {
        self.stages.insert(id, stage);
    }

    /// Look up the stage for `id`.
    #[must_use]
    pub fn lookup(&self, id: StageId) -> Option<Arc<dyn Stage>> {
        self.stages.get(&id).cloned()
    }

    /// Whether `id` has a registration.
    #[must_use]
    pub fn contains(&self, id: StageId) -> bool {
        self.stages.contains_key(&id)
    }

    /// Number of registered stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Registered identifiers, in declaration order of [`StageId`].
    #[must_use]
    pub fn registered_ids(&self) -> Vec<StageId> {
        let mut ids: Vec<_> = self.stages.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Stages of `pipeline` that have no registration, in run order.
    #[must_use]
    pub fn missing_from(&self, pipeline: &PipelineDefinition) -> Vec<StageId> {
        pipeline.ids().filter(|id| !self.contains(*id)).collect()
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries: Vec<_> = self
            .registered_ids()
            .into_iter()
            .map(|id| (id, self.stages[&id].name().to_string()))
            .collect();
        f.debug_struct("StageRegistry").field("stages", &entries).finish()
    }
}
