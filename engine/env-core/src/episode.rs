//! Episode boundary policy
//!
//! Layers a step cap on top of the engine's own "eaten" signal. Both causes
//! look the same to the caller, but a cap-triggered termination does not stop
//! the engine; only `reset` clears engine state.

use serde::{Deserialize, Serialize};

/// Termination regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationRegime {
    /// Episodes end after `number_steps` steps (when `mode != 0`)
    #[default]
    Episodic,
    /// Episodes only end by elimination
    Continuing,
}

/// Why an episode ended for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The engine reported the agent as eaten
    Eliminated,
    /// The adapter enforced the step cap
    StepCap,
}

/// Step-cap configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EpisodeBoundary {
    pub mode: i64,
    pub regime: TerminationRegime,
    pub number_steps: u64,
}

impl EpisodeBoundary {
    /// Whether the cap applies once `steps` steps have been taken
    pub fn cap_reached(&self, steps: u64) -> bool {
        self.regime == TerminationRegime::Episodic && self.mode != 0 && steps >= self.number_steps
    }

    /// Apply the policy to the engine's per-agent done flags
    ///
    /// `steps` counts the step being completed, so the cap fires on exactly
    /// the `number_steps`-th step after a reset.
    pub fn apply(&self, steps: u64, mut dones: Vec<bool>) -> (Vec<bool>, Option<Termination>) {
        if self.cap_reached(steps) {
            dones.iter_mut().for_each(|done| *done = true);
            return (dones, Some(Termination::StepCap));
        }
        let cause = dones.iter().any(|d| *d).then_some(Termination::Eliminated);
        (dones, cause)
    }
}
