//! The stage contract and closure-based stages.
//!
//! This module defines the [`Stage`] trait, the execution contract every
//! pipeline agent implements, along with [`LambdaStage`] for closure-based
//! stages and [`StageExt`] for composing the shared helpers.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::{Result, SharedState};

pub mod id;
pub mod result;
pub mod timed;

pub use id::{StageId, StageStatus};
pub use result::{estimate_tokens, StageResult};
pub use timed::TimedStage;

/// The execution contract for a pipeline stage.
///
/// A stage receives the previous stage's output (or the run's initial input
/// for the first stage) and a read-only view of the [`SharedState`]. It
/// contributes to shared state only through the engine's projection rule.
///
/// Ordinary failures are reported as `Ok(StageResult { success: false, .. })`.
/// Returning `Err` (or panicking) is treated by the engine as the same
/// failure, with the error message recorded against the stage.
///
/// # Example
///
/// ```rust
/// use content_workflow::{Stage, StageResult, SharedState};
/// use serde_json::{json, Value};
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl Stage for Echo {
///     async fn execute(&self, input: Value, _state: &SharedState) -> content_workflow::Result<StageResult> {
///         Ok(StageResult::ok(input))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let out = Echo.execute(json!({"topic": "tea"}), &SharedState::default()).await.unwrap();
/// assert_eq!(out.data, Some(json!({"topic": "tea"})));
/// # });
/// ```
#[async_trait]
pub trait Stage: Send + Sync {
    /// Execute this stage.
    async fn execute(&self, input: Value, state: &SharedState) -> Result<StageResult>;

    /// Returns a human-readable name for logs. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl<S: Stage + ?Sized> Stage for Arc<S> {
    async fn execute(&self, input: Value, state: &SharedState) -> Result<StageResult> {
        (**self).execute(input, state).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A stage constructed from a closure.
///
/// The closure receives the input and a snapshot of the shared state.
///
/// # Example
///
/// ```rust
/// use content_workflow::{LambdaStage, Stage, StageResult, SharedState};
/// use serde_json::{json, Value};
///
/// # tokio_test::block_on(async {
/// let stage = LambdaStage::new(|input: Value, state: SharedState| async move {
///     Ok::<_, content_workflow::Error>(StageResult::ok(json!({ "input": input, "tone": state.brand_tone })))
/// });
/// let state = SharedState::default().with_brand_tone("warm");
/// let out = stage.execute(json!(1), &state).await.unwrap();
/// assert_eq!(out.data, Some(json!({"input": 1, "tone": "warm"})));
/// # });
/// ```
pub struct LambdaStage<F> {
    f: F,
    name: String,
}

impl<F, Fut> LambdaStage<F>
where
    F: Fn(Value, SharedState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StageResult>> + Send + 'static,
{
    /// Create a new `LambdaStage` from the given closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: "lambda".to_string(),
        }
    }

    /// Set the name reported in logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<F, Fut> Stage for LambdaStage<F>
where
    F: Fn(Value, SharedState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StageResult>> + Send + 'static,
{
    async fn execute(&self, input: Value, state: &SharedState) -> Result<StageResult> {
        (self.f)(input, state.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Extension methods available on every [`Stage`].
pub trait StageExt: Stage + Sized {
    /// Fill in `duration_ms` from wall-clock time when the stage leaves it at zero.
    fn timed(self) -> TimedStage<Self> {
        TimedStage::new(self)
    }

    /// Erase the concrete type behind an `Arc<dyn Stage>`.
    fn shared(self) -> Arc<dyn Stage>
    where
        Self: 'static,
    {
        Arc::new(self)
    }
}

impl<T: Stage + Sized> StageExt for T {}
