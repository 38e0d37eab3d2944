//! The workflow engine: runs a pipeline of stages in order.

use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, info, info_span, warn, Instrument};

use crate::projection::{ProjectionLimits, ProjectionTable};
use crate::status::{FullStatus, StatusReporter, StatusSummary};
use crate::{
    EngineConfig, Error, PipelineDefinition, Result, RunMetrics, SharedState, Stage, StageId,
    StageRegistry, StageResult, StageStatus, StepUpdate,
};

/// Runs registered stages along a [`PipelineDefinition`].
///
/// Stages run strictly one after another. Each receives the previous stage's
/// output, and the first failure stops the run. Status can be read at any
/// time through [`WorkflowEngine::reporter`], including from another task
/// while a run is in flight.
///
/// Every run starts by resetting all stages to idle. `run` borrows the
/// engine mutably, so one engine never executes two runs at once.
///
/// # Example
///
/// ```rust
/// use content_workflow::{LambdaStage, SharedState, StageId, StageResult, StageStatus, WorkflowEngine};
/// use serde_json::{json, Value};
///
/// # tokio_test::block_on(async {
/// let mut engine = WorkflowEngine::new();
/// for id in StageId::ALL {
///     engine.register_stage(id, LambdaStage::new(|input: Value, _state: SharedState| async move {
///         Ok::<_, content_workflow::Error>(StageResult::ok(input))
///     }));
/// }
///
/// let mut state = SharedState::default();
/// let out = engine.run(json!({"topic": "cold brew"}), &mut state).await.unwrap();
/// assert_eq!(out, json!({"topic": "cold brew"}));
/// assert!(engine.status_summary().iter().all(|s| s.status == StageStatus::Completed));
/// # });
/// ```
pub struct WorkflowEngine {
    registry: StageRegistry,
    pipeline: PipelineDefinition,
    projections: ProjectionTable,
    config: EngineConfig,
    reporter: StatusReporter,
    cancel: CancellationToken,
    metrics: RunMetrics,
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowEngine {
    /// An engine for the content pipeline with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let pipeline = PipelineDefinition::content_pipeline();
        Self {
            registry: StageRegistry::new(),
            reporter: StatusReporter::for_pipeline(&pipeline),
            pipeline,
            projections: ProjectionTable::builtin(),
            config: EngineConfig::default(),
            cancel: CancellationToken::new(),
            metrics: RunMetrics::default(),
        }
    }

    /// Use `registry` for stage lookups.
    #[must_use]
    pub fn with_registry(mut self, registry: StageRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run `pipeline` instead of the content pipeline.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineDefinition) -> Self {
        self.reporter.reset(&pipeline);
        self.pipeline = pipeline;
        self
    }

    /// Replace the projection table.
    #[must_use]
    pub fn with_projections(mut self, projections: ProjectionTable) -> Self {
        self.projections = projections;
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Observe `token` for cancellation.
    ///
    /// A cancelled token stays cancelled: later runs fail immediately until
    /// a fresh token is installed.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Register `stage` under `id`, replacing any earlier registration.
    pub fn register_stage<S>(&mut self, id: StageId, stage: S)
    where
        S: Stage + 'static,
    {
        self.registry.register(id, stage);
    }

    /// Register an already shared stage under `id`.
    pub fn register_shared_stage(&mut self, id: StageId, stage: Arc<dyn Stage>) {
        self.registry.register_shared(id, stage);
    }

    /// Add or replace the shared state projection for `id`.
    pub fn register_projection<F>(&mut self, id: StageId, f: F)
    where
        F: Fn(&Value, &mut SharedState, &ProjectionLimits) + Send + Sync + 'static,
    {
        self.projections.insert(id, f);
    }

    /// The stage registry.
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// The pipeline this engine runs.
    pub fn pipeline(&self) -> &PipelineDefinition {
        &self.pipeline
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A clone of the token this engine observes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// A handle for polling status, usable from other tasks.
    pub fn reporter(&self) -> StatusReporter {
        self.reporter.clone()
    }

    /// Compact per-stage status.
    pub fn status_summary(&self) -> Vec<StatusSummary> {
        self.reporter.summary()
    }

    /// Per-stage status including output and error.
    pub fn full_status(&self) -> Vec<FullStatus> {
        self.reporter.full()
    }

    /// Metrics of the most recent run.
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Run the pipeline and return the final stage's output.
    pub async fn run(&mut self, input: Value, state: &mut SharedState) -> Result<Value> {
        self.run_with_updates(input, state, |_| {}).await
    }

    /// Run the pipeline, calling `on_update` on every stage status change.
    ///
    /// Updates arrive in pipeline order: `Processing` before a stage is
    /// invoked, then `Completed` or `Error`.
    pub async fn run_with_updates<F>(
        &mut self,
        input: Value,
        state: &mut SharedState,
        mut on_update: F,
    ) -> Result<Value>
    where
        F: FnMut(&StepUpdate) + Send,
    {
        self.reporter.reset(&self.pipeline);
        self.metrics = RunMetrics::default();

        let span = info_span!("workflow_run", stages = self.pipeline.len());
        async {
            info!(registered = self.registry.len(), "starting run");
            let limits = ProjectionLimits {
                keyword_limit: self.config.keyword_limit,
            };
            let mut current = input;

            for (index, template) in self.pipeline.stages().iter().enumerate() {
                let id = template.id;

                if self.cancel.is_cancelled() {
                    info!(stage = %id, index, "run cancelled before stage");
                    return Err(Error::Cancelled { stage: Some(id) });
                }

                if let Some(dependency) = template
                    .dependencies
                    .iter()
                    .copied()
                    .find(|dep| self.reporter.status_of(*dep) != Some(StageStatus::Completed))
                {
                    warn!(stage = %id, %dependency, "dependency not met");
                    return Err(Error::DependencyNotMet { stage: id, dependency });
                }

                let Some(stage) = self.registry.lookup(id) else {
                    warn!(stage = %id, index, "no agent registered");
                    return Err(Error::AgentNotFound { stage: id });
                };

                self.reporter.update(index, |d| {
                    d.status = StageStatus::Processing;
                    d.input = Some(current.clone());
                });
                on_update(&StepUpdate::new(id, StageStatus::Processing, index));

                let outcome = invoke(
                    stage.as_ref(),
                    current,
                    state,
                    &self.cancel,
                    self.config.stage_timeout,
                )
                .instrument(debug_span!("stage", stage = %id, index, agent = stage.name()))
                .await;

                match outcome {
                    Invocation::Succeeded(result) => {
                        let StageResult {
                            data,
                            duration_ms,
                            cost_units,
                            ..
                        } = result;

                        self.reporter.update(index, |d| {
                            d.status = StageStatus::Completed;
                            d.output = data.clone();
                            d.duration_ms = Some(duration_ms);
                            d.cost_units = cost_units;
                        });
                        self.metrics.record_stage(duration_ms, cost_units);

                        if let Some(output) = &data {
                            self.projections.apply(id, output, state, &limits);
                        }
                        state.enforce_budget(self.config.state_budget_bytes);

                        debug!(stage = %id, index, duration_ms, ?cost_units, "stage completed");
                        let mut update = StepUpdate::new(id, StageStatus::Completed, index);
                        update.duration_ms = Some(duration_ms);
                        update.cost_units = cost_units;
                        on_update(&update);

                        current = data.unwrap_or(Value::Null);
                    }
                    Invocation::Failed(message) => {
                        self.reporter.update(index, |d| {
                            d.status = StageStatus::Error;
                            d.error = Some(message.clone());
                        });
                        self.metrics.record_failure(format!("{id}: {message}"));

                        warn!(stage = %id, index, error = %message, "stage failed, stopping run");
                        let mut update = StepUpdate::new(id, StageStatus::Error, index);
                        update.error = Some(message.clone());
                        on_update(&update);

                        return Err(Error::AgentExecution { stage: id, message });
                    }
                    Invocation::Cancelled => {
                        self.reporter.update(index, |d| {
                            d.status = StageStatus::Error;
                            d.error = Some("cancelled".to_string());
                        });

                        info!(stage = %id, index, "run cancelled during stage");
                        let mut update = StepUpdate::new(id, StageStatus::Error, index);
                        update.error = Some("cancelled".to_string());
                        on_update(&update);

                        return Err(Error::Cancelled { stage: Some(id) });
                    }
                }
            }

            info!(
                completed = self.metrics.stages_completed,
                total_duration_ms = self.metrics.total_duration_ms,
                total_cost_units = self.metrics.total_cost_units,
                "run completed"
            );
            Ok(current)
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("registry", &self.registry)
            .field("pipeline", &self.pipeline)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

enum Invocation {
    Succeeded(StageResult),
    Failed(String),
    Cancelled,
}

/// Call one stage, racing it against cancellation and the optional timeout.
async fn invoke(
    stage: &dyn Stage,
    input: Value,
    state: &SharedState,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> Invocation {
    let call = async {
        let guarded = AssertUnwindSafe(stage.execute(input, state)).catch_unwind();
        let caught = match timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(caught) => caught,
                Err(_) => {
                    return Invocation::Failed(format!("timed out after {}ms", limit.as_millis()))
                }
            },
            None => guarded.await,
        };

        match caught {
            Ok(Ok(result)) if result.success => Invocation::Succeeded(result),
            Ok(Ok(result)) => Invocation::Failed(
                result
                    .error
                    .unwrap_or_else(|| "stage reported failure".to_string()),
            ),
            Ok(Err(err)) => Invocation::Failed(err.to_string()),
            Err(panic) => Invocation::Failed(format!("stage panicked: {}", panic_message(&*panic))),
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Invocation::Cancelled,
        outcome = call => outcome,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LambdaStage, StageTemplate};
    use serde_json::json;

    fn echo() -> impl Stage {
        LambdaStage::new(|input: Value, _state: SharedState| async move {
            Ok::<_, Error>(StageResult::ok(input))
        })
    }

    fn two_stage_pipeline() -> PipelineDefinition {
        PipelineDefinition::new(vec![
            StageTemplate::new(StageId::TrendKeyword),
            StageTemplate::new(StageId::ContentPlanning).depends_on([StageId::TrendKeyword]),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_chains_outputs() {
        let mut engine = WorkflowEngine::new().with_pipeline(two_stage_pipeline());
        engine.register_stage(
            StageId::TrendKeyword,
            LambdaStage::new(|input: Value, _state: SharedState| async move {
                let n = input.as_i64().unwrap_or_default();
                Ok::<_, Error>(StageResult::ok(n + 1).with_cost_units(2))
            }),
        );
        engine.register_stage(
            StageId::ContentPlanning,
            LambdaStage::new(|input: Value, _state: SharedState| async move {
                let n = input.as_i64().unwrap_or_default();
                Ok::<_, Error>(StageResult::ok(n * 10).with_duration_ms(4))
            }),
        );

        let mut state = SharedState::default();
        let out = engine.run(json!(1), &mut state).await.unwrap();
        assert_eq!(out, json!(20));

        let descriptors = engine.reporter().descriptors();
        assert_eq!(descriptors[1].input, Some(json!(2)));
        assert_eq!(engine.metrics().stages_completed, 2);
        assert_eq!(engine.metrics().total_cost_units, 2);
        assert_eq!(engine.metrics().total_duration_ms, 4);
    }

    #[tokio::test]
    async fn test_error_return_is_execution_failure() {
        let mut engine = WorkflowEngine::new().with_pipeline(two_stage_pipeline());
        engine.register_stage(
            StageId::TrendKeyword,
            LambdaStage::new(|_input: Value, _state: SharedState| async move {
                Err::<StageResult, _>(Error::from("provider unreachable"))
            }),
        );

        let err = engine.run(Value::Null, &mut SharedState::default()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::AgentExecution { stage: StageId::TrendKeyword, ref message } if message == "provider unreachable"
        ));
        assert!(engine.metrics().has_failures());
    }

    #[tokio::test]
    async fn test_panic_is_execution_failure() {
        let mut engine = WorkflowEngine::new().with_pipeline(two_stage_pipeline());
        engine.register_stage(
            StageId::TrendKeyword,
            LambdaStage::new(|_input: Value, _state: SharedState| async move {
                if true {
                    panic!("parser exploded");
                }
                Ok::<_, Error>(StageResult::ok(0))
            }),
        );

        let err = engine.run(Value::Null, &mut SharedState::default()).await.unwrap_err();
        match err {
            Error::AgentExecution { stage, message } => {
                assert_eq!(stage, StageId::TrendKeyword);
                assert_eq!(message, "stage panicked: parser exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
        let status = engine.full_status();
        assert_eq!(status[0].status, StageStatus::Error);
        assert_eq!(status[1].status, StageStatus::Idle);
    }

    #[tokio::test]
    async fn test_success_without_data() {
        let mut engine = WorkflowEngine::new().with_pipeline(two_stage_pipeline());
        engine.register_stage(
            StageId::TrendKeyword,
            LambdaStage::new(|_input: Value, _state: SharedState| async move {
                Ok::<_, Error>(StageResult {
                    success: true,
                    ..StageResult::default()
                })
            }),
        );
        engine.register_stage(StageId::ContentPlanning, echo());

        let out = engine.run(json!("seed"), &mut SharedState::default()).await.unwrap();
        assert_eq!(out, Value::Null);
        let summary = engine.status_summary();
        assert!(!summary[0].has_output);
        assert_eq!(summary[0].status, StageStatus::Completed);
    }

    #[tokio::test]
    async fn test_failure_without_message() {
        let mut engine = WorkflowEngine::new().with_pipeline(two_stage_pipeline());
        engine.register_stage(
            StageId::TrendKeyword,
            LambdaStage::new(|_input: Value, _state: SharedState| async move {
                Ok::<_, Error>(StageResult::default())
            }),
        );

        let err = engine.run(Value::Null, &mut SharedState::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Agent 'trend_keyword' failed: stage reported failure");
    }

    #[tokio::test]
    async fn test_new_run_resets_status() {
        let mut engine = WorkflowEngine::new().with_pipeline(two_stage_pipeline());
        engine.register_stage(StageId::TrendKeyword, echo());
        engine.register_stage(StageId::ContentPlanning, echo());
        engine.run(json!(1), &mut SharedState::default()).await.unwrap();

        engine.register_stage(
            StageId::TrendKeyword,
            LambdaStage::new(|_input: Value, _state: SharedState| async move {
                Ok::<_, Error>(StageResult::failure("second run fails"))
            }),
        );
        engine.run(json!(1), &mut SharedState::default()).await.unwrap_err();

        let status = engine.full_status();
        assert_eq!(status[0].status, StageStatus::Error);
        assert_eq!(status[1].status, StageStatus::Idle);
        assert!(status[1].output.is_none());
        assert_eq!(engine.metrics().stages_completed, 0);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
