//! # content-workflow
//!
//! Ordered, dependency-checked agent pipelines for content automation.
//!
//! A [`WorkflowEngine`] walks a fixed [`PipelineDefinition`] of stages
//! ("agents"), checks that each stage's dependencies have completed, runs the
//! registered [`Stage`] with the previous stage's output, folds a projection
//! of that output into a byte-bounded [`SharedState`], and stops at the first
//! failure. Per-stage status can be polled while a run is in flight.
//!
//! ## Core Concepts
//!
//! - **Stage**: The execution contract every agent implements
//! - **StageRegistry**: Maps each [`StageId`] to its implementation
//! - **SharedState**: Small cross-stage context kept under a byte budget
//! - **ProjectionTable**: Per-stage rules that copy output into shared state
//! - **PipelineDefinition**: Ordered stages with their dependencies
//! - **WorkflowEngine**: Sequential, fail-fast runner with cancellation
//! - **StatusReporter**: Read-only status snapshots for polling
//!
//! ## Example: Partial Registration
//!
//! ```rust
//! use content_workflow::{Error, LambdaStage, SharedState, StageId, StageResult, StageStatus, WorkflowEngine};
//! use serde_json::{json, Value};
//!
//! # tokio_test::block_on(async {
//! let mut engine = WorkflowEngine::new();
//! engine.register_stage(
//!     StageId::TrendKeyword,
//!     LambdaStage::new(|_input: Value, _state: SharedState| async move {
//!         Ok::<_, Error>(StageResult::ok(json!({"keywords": ["matcha", "oat milk"]})))
//!     }),
//! );
//!
//! let mut state = SharedState::default();
//! let err = engine.run(json!({}), &mut state).await.unwrap_err();
//!
//! // The second stage was never wired up.
//! assert!(matches!(err, Error::AgentNotFound { stage: StageId::ContentPlanning }));
//! assert_eq!(state.keywords, vec!["matcha", "oat milk"]);
//!
//! let status = engine.full_status();
//! assert_eq!(status[0].status, StageStatus::Completed);
//! assert_eq!(status[1].status, StageStatus::Idle);
//! # });
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod pipeline;
pub mod projection;
pub mod registry;
pub mod stage;
pub mod state;
pub mod status;

pub use config::EngineConfig;
pub use engine::WorkflowEngine;
pub use error::{Error, Result};
pub use events::StepUpdate;
pub use metrics::RunMetrics;
pub use pipeline::{PipelineDefinition, StageTemplate};
pub use projection::{Projection, ProjectionLimits, ProjectionTable};
pub use registry::StageRegistry;
pub use state::SharedState;
pub use status::{FullStatus, StageDescriptor, StatusReporter, StatusSummary};

// Re-export stage types
pub use stage::{estimate_tokens, LambdaStage, Stage, StageExt, StageId, StageResult, StageStatus, TimedStage};

pub use tokio_util::sync::CancellationToken;
