//! Timing wrapper for stages that do not measure themselves.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;

use crate::{Result, SharedState, Stage, StageResult};

/// Wraps a stage and records its wall-clock duration.
///
/// If the inner stage already reported a non-zero `duration_ms` it is kept.
///
/// # Example
///
/// ```rust
/// use content_workflow::{LambdaStage, Stage, StageExt, StageResult, SharedState};
/// use serde_json::{json, Value};
///
/// # tokio_test::block_on(async {
/// let stage = LambdaStage::new(|input: Value, _state: SharedState| async move {
///     Ok::<_, content_workflow::Error>(StageResult::ok(input))
/// })
/// .timed();
///
/// let out = stage.execute(json!("x"), &SharedState::default()).await.unwrap();
/// assert!(out.success);
/// # });
/// ```
pub struct TimedStage<S> {
    inner: S,
}

impl<S: Stage> TimedStage<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Access the inner stage.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Stage> Stage for TimedStage<S> {
    async fn execute(&self, input: Value, state: &SharedState) -> Result<StageResult> {
        let start = Instant::now();
        let mut result = self.inner.execute(input, state).await?;
        if result.duration_ms == 0 {
            result.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
