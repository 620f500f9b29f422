//! Capability interface for turn-based environments
//!
//! A small trait covering the reset/step/render/seed/close protocol, plus the
//! result types it returns. Single-agent environments return bare values,
//! multi-agent environments return one value per agent; `PerAgent` makes the
//! two shapes explicit instead of relying on runtime type checks.

use serde::Serialize;

use crate::action::Actions;
use crate::error::Result;
use crate::observation::{Frame, Observation};

/// A value for a single agent or a list with one value per agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PerAgent<T> {
    Single(T),
    Multi(Vec<T>),
}

impl<T> PerAgent<T> {
    /// Shape per-agent values for the caller's protocol
    ///
    /// Single-agent mode unwraps the one-element list; multi-agent mode
    /// always returns the list.
    pub(crate) fn shape(mut values: Vec<T>, multi_agent: bool) -> Self {
        if !multi_agent && values.len() == 1 {
            if let Some(value) = values.pop() {
                return PerAgent::Single(value);
            }
        }
        PerAgent::Multi(values)
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, PerAgent::Multi(_))
    }

    /// The bare value in single-agent mode
    pub fn single(self) -> Option<T> {
        match self {
            PerAgent::Single(value) => Some(value),
            PerAgent::Multi(_) => None,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            PerAgent::Single(value) => std::slice::from_ref(value),
            PerAgent::Multi(values) => values,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            PerAgent::Single(value) => vec![value],
            PerAgent::Multi(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Diagnostic information returned by `step`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepInfo {
    /// Steps taken since the last reset, including this one
    pub steps: u64,
    /// Rewards exactly as the engine returned them, one per agent
    pub untransformed_rewards: Vec<f64>,
}

/// Result of a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub observations: PerAgent<Observation>,
    pub rewards: PerAgent<f64>,
    pub dones: PerAgent<bool>,
    /// Always false; there is no truncation signal distinct from `dones`
    pub truncations: PerAgent<bool>,
    pub info: StepInfo,
}

impl StepResult {
    /// Whether every agent is done
    pub fn all_done(&self) -> bool {
        self.dones.as_slice().iter().all(|d| *d)
    }
}

/// Diagnostic information returned by `reset`; carries nothing yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResetInfo {}

/// Result of a reset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResetResult {
    pub observations: PerAgent<Observation>,
    pub info: ResetInfo,
}

/// Turn-based environment protocol
pub trait Environment {
    /// Start a new episode
    fn reset(&mut self) -> Result<ResetResult>;

    /// Advance one step
    fn step(&mut self, actions: Actions) -> Result<StepResult>;

    /// Render according to the configured render mode
    fn render(&mut self) -> Result<Option<Frame>>;

    /// Seed for reproducibility; `None` is a no-op
    fn seed(&mut self, seed: Option<u64>) -> Result<Option<Vec<u64>>>;

    /// Release the engine; no operation is valid afterwards
    fn close(&mut self) -> Result<()>;
}
