//! Native engine collaborator interface
//!
//! The simulation engine (physics, spatial indexing, bot AI, rendering) lives
//! outside this crate. The adapter only talks to it through the two traits
//! below: `EngineBackend` constructs engines, `NativeEngine` drives one.
//!
//! Engines are exclusively owned by one adapter for their whole lifetime and
//! are never shared between adapter instances.

use std::fmt::Debug;
use std::path::Path;

use ndarray::{Array1, Array3, Array4};

use crate::action::Command;
use crate::config::{EngineArgs, GridObservationConfig, ScreenConfig};

/// Error raised by the native engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine does not support this operation: {0}")]
    Unsupported(String),
    #[error("Engine rejected input: {0}")]
    Rejected(String),
    #[error("Snapshot error: {0}")]
    Snapshot(String),
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One engine-ready action: target offset relative to the agent plus a command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineAction {
    pub dx: f32,
    pub dy: f32,
    pub command: Command,
}

/// Raw per-agent state as the engine produces it
///
/// Grid state is channel-major `(channel, width, height)`; screen state is a
/// frame stack of images `(frame, height, width, pixel)`, laid out like the
/// frames `get_frame` renders.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeState {
    Ram(Array1<f32>),
    Grid(Array3<i32>),
    Screen(Array4<u8>),
}

/// Which engine variant to construct
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineKind<'a> {
    Ram,
    Grid,
    /// Screen engines take pixel dimensions and the agent-view flag in
    /// addition to the base arguments.
    Screen(&'a ScreenConfig),
}

/// Factory for native engines
///
/// Only the configuration resolver calls `create`.
pub trait EngineBackend {
    /// Whether this build of the engine can render screens
    fn supports_screen(&self) -> bool;

    /// Construct an engine from the fixed positional arguments
    fn create(
        &self,
        kind: EngineKind<'_>,
        args: &EngineArgs,
    ) -> Result<Box<dyn NativeEngine>, EngineError>;
}

/// A live native engine instance
///
/// All calls are blocking and complete before returning. `step` advances the
/// engine by the `ticks_per_step` it was constructed with.
pub trait NativeEngine: Send + Debug {
    /// Secondary configuration step for grid engines
    fn configure_observation(&mut self, config: &GridObservationConfig)
        -> Result<(), EngineError>;

    /// Shape of one agent's native observation
    fn observation_shape(&self) -> Vec<usize>;

    /// Clear all episode state
    fn reset(&mut self);

    /// Submit one action per agent for the next step
    fn take_actions(&mut self, actions: &[EngineAction]) -> Result<(), EngineError>;

    /// Advance `ticks_per_step` ticks, returning one reward per agent
    fn step(&mut self) -> Result<Vec<f64>, EngineError>;

    /// Per-agent native observations
    fn get_state(&self) -> Vec<NativeState>;

    /// Per-agent "eaten" flags
    fn dones(&self) -> Vec<bool>;

    fn seed(&mut self, seed: u64);

    /// Draw the current state to a display
    fn render(&mut self) -> Result<(), EngineError>;

    /// Render one RGB `(height, width, 3)` frame per agent
    fn get_frame(&mut self) -> Result<Vec<Array3<u8>>, EngineError>;

    /// Serialize engine state; the format is engine-defined
    fn save(&self, path: &Path) -> Result<(), EngineError>;

    fn load(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Release native resources
    fn close(&mut self) {}
}
