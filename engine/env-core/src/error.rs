//! Error types for the environment adapter
//!
//! Errors fall into four groups: configuration errors raised at
//! construction, protocol errors raised by a single call that leave the
//! environment untouched, contract violations raised when the native engine
//! breaks its side of the interface, and resource errors raised by video
//! generation.

use crate::native::EngineError;
use crate::video::VideoError;

/// Runtime error for environment operations
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Unsupported observation type: {0} (expected one of ram, grid, screen)")]
    UnsupportedObservationType(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Screen environment unavailable: engine was built without screen rendering")]
    ScreenEnvironmentUnavailable,

    #[error("Cannot call step() before calling reset()")]
    NotReset,
    #[error("Environment has been closed")]
    Closed,
    #[error("Number of actions {actual} does not match number of agents {expected}")]
    ActionCountMismatch { expected: usize, actual: usize },
    #[error("Malformed action input: {0}")]
    ActionShape(String),
    #[error("Action for agent {agent} not in action space: {value}")]
    ActionOutOfRange { agent: usize, value: String },

    #[error("Engine contract violation: {0}")]
    EngineContractViolation(String),

    #[error("No frames captured, nothing to generate")]
    NoFramesCaptured,
    #[error("Invalid frame at index {index}: {reason}")]
    InvalidFrame { index: usize, reason: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Video(#[from] VideoError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnvError {
    /// Whether the error signals a broken collaborator rather than bad input.
    ///
    /// Fatal errors should not be retried; every other error leaves the
    /// environment in its prior valid state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EnvError::EngineContractViolation(_) | EnvError::Closed)
    }
}

pub type Result<T> = std::result::Result<T, EnvError>;
