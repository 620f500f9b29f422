//! Reinforcement-learning adapter over a tick-based agar.io engine
//!
//! This crate turns a real-time, tick-driven simulation into a turn-based
//! environment with a reset/step protocol:
//! - `ActionSanitizer`: validates, perturbs and converts caller actions
//! - `config::resolve`: difficulty presets plus explicit overrides
//! - `ObservationBuilder`: ram, grid and screen observation layouts
//! - `EpisodeBoundary`: step cap layered over the engine's elimination signal
//! - `AgarioEnv`: the step orchestrator tying everything together
//! - `VideoRecorder`: frame capture and flush to a video sink
//!
//! The simulation itself sits behind the `EngineBackend`/`NativeEngine`
//! traits and is supplied by the caller.

pub mod action;
pub mod adapter;
pub mod config;
pub mod environment;
pub mod episode;
pub mod error;
pub mod factory;
pub mod native;
pub mod observation;
pub mod spaces;
pub mod video;

// Re-export main types for convenience
pub use action::{Action, ActionSanitizer, Actions, Command};
pub use adapter::AgarioEnv;
pub use config::{
    Difficulty, EncodingConfig, EngineArgs, EnvOptions, GridObservationConfig, ObservationKind,
    RenderMode, ResolvedConfig, RewardType, ScreenConfig,
};
pub use environment::{Environment, PerAgent, ResetInfo, ResetResult, StepInfo, StepResult};
pub use episode::{EpisodeBoundary, Termination, TerminationRegime};
pub use error::{EnvError, Result};
pub use factory::{available_encodings, make_env};
pub use native::{EngineAction, EngineBackend, EngineError, EngineKind, NativeEngine, NativeState};
pub use observation::{Frame, Observation, ObservationBuilder};
pub use spaces::{ActionSpace, ElementType, ObservationSpace};
pub use video::{ChannelOrder, GifSink, VideoError, VideoRecorder, VideoSink};

/// Test utilities (internal use only)
#[cfg(test)]
pub(crate) mod test_utils;
