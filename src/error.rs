//! Error types for pipeline runs.

use thiserror::Error;

use crate::stage::StageId;

/// The main error type for engine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A pipeline stage was reached that has no registered implementation.
    #[error("No agent registered for stage '{stage}'")]
    AgentNotFound {
        /// The stage that was never wired up.
        stage: StageId,
    },

    /// A stage was reached before one of its declared dependencies completed.
    #[error("Stage '{stage}' depends on '{dependency}', which has not completed")]
    DependencyNotMet {
        /// The stage that could not start.
        stage: StageId,
        /// The first dependency found not to be completed.
        dependency: StageId,
    },

    /// A stage reported failure, returned an error, panicked or timed out.
    #[error("Agent '{stage}' failed: {message}")]
    AgentExecution {
        /// The failing stage.
        stage: StageId,
        /// The stage's own error message.
        message: String,
    },

    /// The run was cancelled through its cancellation token.
    #[error("{}", cancelled_message(.stage))]
    Cancelled {
        /// The stage that was pending or in flight when cancellation was observed.
        stage: Option<StageId>,
    },

    /// A pipeline definition failed validation.
    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// A string did not name any known stage.
    #[error("Unknown stage identifier '{0}'")]
    UnknownStage(String),

    /// A JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A generic error with a message.
    #[error("{0}")]
    Message(String),
}

fn cancelled_message(stage: &Option<StageId>) -> String {
    match stage {
        Some(stage) => format!("Run cancelled at stage '{stage}'"),
        None => "Run cancelled".to_string(),
    }
}

impl Error {
    /// The stage this error is attributed to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<StageId> {
        match self {
            Error::AgentNotFound { stage }
            | Error::DependencyNotMet { stage, .. }
            | Error::AgentExecution { stage, .. } => Some(*stage),
            Error::Cancelled { stage } => *stage,
            _ => None,
        }
    }

    /// Returns `true` when the run was cancelled rather than failed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Message(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Message(msg.to_string())
    }
}

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
