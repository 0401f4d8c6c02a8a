//! Pipeline-specific error types.
//!
//! Algorithm hooks report domain failures as `false`; only the conditions
//! below are errors. `Configuration`, `Reentrancy` and `NotImplemented`
//! abort the call in progress without visiting remaining siblings.

use crate::pipeline::id::AlgorithmId;
use crate::pipeline::request::{ForwardDirection, RequestKind};
use thiserror::Error;

/// Errors that can occur within the pipeline system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Configuration error in {algorithm}: {message}")]
    Configuration { algorithm: String, message: String },

    #[error("Reentrant request on {algorithm}: executive is already processing a request")]
    Reentrancy { algorithm: String },

    #[error("{direction:?} request forwarding is not implemented ({algorithm})")]
    NotImplemented {
        algorithm: String,
        direction: ForwardDirection,
    },

    #[error("Algorithm {algorithm} failed during {request:?}")]
    AlgorithmFailure {
        algorithm: String,
        request: RequestKind,
    },

    #[error("Execution of {algorithm} was aborted")]
    Aborted { algorithm: String },

    #[error("Invalid algorithm id: {0}")]
    InvalidAlgorithm(AlgorithmId),

    #[error("Connection would create a cycle: {0}")]
    CycleDetected(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl PipelineError {
    pub fn configuration(algorithm: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Configuration {
            algorithm: algorithm.into(),
            message: message.into(),
        }
    }

    /// True for errors that stop a fan-out loop immediately.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::AlgorithmFailure { .. })
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
