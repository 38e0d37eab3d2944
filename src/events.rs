//! Step updates emitted while a run progresses.
//!
//! A [`StepUpdate`] is handed to the observer passed to
//! [`WorkflowEngine::run_with_updates`](crate::WorkflowEngine::run_with_updates)
//! each time a stage changes status. Updates arrive in pipeline order.

use serde::{Deserialize, Serialize};

use crate::{StageId, StageStatus};

/// A status change of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpdate {
    /// The stage that changed.
    pub stage: StageId,
    /// Its new status.
    pub status: StageStatus,
    /// Position of the stage in the pipeline, starting at zero.
    pub index: usize,
    /// Duration reported by the stage, on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Cost reported by the stage, on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_units: Option<u64>,
    /// Failure message, on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepUpdate {
    pub(crate) fn new(stage: StageId, status: StageStatus, index: usize) -> Self {
        Self {
            stage,
            status,
            index,
            duration_ms: None,
            cost_units: None,
            error: None,
        }
    }
}
