//! Per-stage run status and the read-only views over it.
//!
//! The engine writes [`StageDescriptor`]s through a [`StatusReporter`]; any
//! clone of the reporter can be polled from another task while a run is in
//! flight. Every read returns a fresh snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{PipelineDefinition, StageId, StageStatus};

/// Run-time record of one pipeline stage. Only the engine mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDescriptor {
    /// The stage.
    pub id: StageId,
    /// Stages that must complete first.
    pub dependencies: Vec<StageId>,
    /// Current status.
    pub status: StageStatus,
    /// Input the stage was invoked with.
    pub input: Option<Value>,
    /// Output of a successful invocation.
    pub output: Option<Value>,
    /// Failure message.
    pub error: Option<String>,
    /// Duration reported by the stage.
    pub duration_ms: Option<u64>,
    /// Cost reported by the stage.
    pub cost_units: Option<u64>,
}

impl StageDescriptor {
    /// An idle descriptor.
    #[must_use]
    pub fn new(id: StageId, dependencies: Vec<StageId>) -> Self {
        Self {
            id,
            dependencies,
            status: StageStatus::Idle,
            input: None,
            output: None,
            error: None,
            duration_ms: None,
            cost_units: None,
        }
    }
}

/// Compact status entry for external polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    /// The stage.
    pub id: StageId,
    /// Current status.
    pub status: StageStatus,
    /// Whether the stage has produced output.
    pub has_output: bool,
}

/// Status entry including output and error, for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullStatus {
    /// The stage.
    pub id: StageId,
    /// Current status.
    pub status: StageStatus,
    /// Whether the stage has produced output.
    pub has_output: bool,
    /// Output, if any.
    pub output: Option<Value>,
    /// Failure message, if any.
    pub error: Option<String>,
}

/// Shared handle to the descriptor list of one engine.
#[derive(Debug, Clone, Default)]
pub struct StatusReporter {
    descriptors: Arc<Mutex<Vec<StageDescriptor>>>,
}

impl StatusReporter {
    /// A reporter with one idle descriptor per stage of `pipeline`.
    #[must_use]
    pub fn for_pipeline(pipeline: &PipelineDefinition) -> Self {
        let reporter = Self::default();
        reporter.reset(pipeline);
        reporter
    }

    /// Replace all descriptors with idle ones for `pipeline`.
    pub fn reset(&self, pipeline: &PipelineDefinition) {
        *self.lock() = pipeline
            .stages()
            .iter()
            .map(|t| StageDescriptor::new(t.id, t.dependencies.clone()))
            .collect();
    }

    /// Compact view: identifier, status and whether output exists.
    #[must_use]
    pub fn summary(&self) -> Vec<StatusSummary> {
        self.lock()
            .iter()
            .map(|d| StatusSummary {
                id: d.id,
                status: d.status,
                has_output: d.output.is_some(),
            })
            .collect()
    }

    /// Full view: the compact view plus output and error.
    #[must_use]
    pub fn full(&self) -> Vec<FullStatus> {
        self.lock()
            .iter()
            .map(|d| FullStatus {
                id: d.id,
                status: d.status,
                has_output: d.output.is_some(),
                output: d.output.clone(),
                error: d.error.clone(),
            })
            .collect()
    }

    /// Snapshot of every descriptor.
    #[must_use]
    pub fn descriptors(&self) -> Vec<StageDescriptor> {
        self.lock().clone()
    }

    /// Snapshot of one descriptor.
    #[must_use]
    pub fn descriptor(&self, id: StageId) -> Option<StageDescriptor> {
        self.lock().iter().find(|d| d.id == id).cloned()
    }

    /// Status of `id`, or `None` when it is not part of the pipeline.
    #[must_use]
    pub fn status_of(&self, id: StageId) -> Option<StageStatus> {
        self.lock().iter().find(|d| d.id == id).map(|d| d.status)
    }

    /// Apply `f` to the descriptor at `index`.
    pub(crate) fn update<F>(&self, index: usize, f: F)
    where
        F: FnOnce(&mut StageDescriptor),
    {
        if let Some(descriptor) = self.lock().get_mut(index) {
            f(descriptor);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StageDescriptor>> {
        // Descriptors are plain data; a panic mid-update leaves them readable.
        self.descriptors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
