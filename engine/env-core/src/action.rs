//! Action sanitizer
//!
//! Validates caller-supplied actions, optionally perturbs them with Gaussian
//! noise, and converts them into engine-ready tuples. Nothing here touches the
//! engine, so a rejected action leaves the environment unchanged.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{EnvError, Result};
use crate::native::EngineAction;
use crate::spaces::ActionSpace;

/// Standard deviation of the movement noise
pub const NOISE_STD: f32 = 0.1;

/// Discrete game command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    #[default]
    Noop = 0,
    Split = 1,
    Feed = 2,
}

impl TryFrom<i64> for Command {
    type Error = i64;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Command::Noop),
            1 => Ok(Command::Split),
            2 => Ok(Command::Feed),
            other => Err(other),
        }
    }
}

/// One agent's action as supplied by the caller
///
/// `movement` is a target direction in `[-1, 1]^2`; `command` is a raw
/// discrete index expected to be 0 (no-op), 1 (split) or 2 (feed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Action {
    pub movement: [f32; 2],
    pub command: i64,
}

impl Action {
    pub fn new(dx: f32, dy: f32, command: Command) -> Self {
        Self {
            movement: [dx, dy],
            command: command as i64,
        }
    }

    /// Stand still, do nothing
    pub fn neutral() -> Self {
        Self::new(0.0, 0.0, Command::Noop)
    }
}

/// Actions for one step: a bare action or one action per agent
#[derive(Debug, Clone, PartialEq)]
pub enum Actions {
    Single(Action),
    Multi(Vec<Action>),
}

impl From<Action> for Actions {
    fn from(action: Action) -> Self {
        Actions::Single(action)
    }
}

impl From<Vec<Action>> for Actions {
    fn from(actions: Vec<Action>) -> Self {
        Actions::Multi(actions)
    }
}

/// Validates and perturbs actions before they reach the engine
#[derive(Debug, Clone)]
pub struct ActionSanitizer {
    space: ActionSpace,
    num_agents: usize,
    multi_agent: bool,
    noise: Option<Normal<f32>>,
}

impl ActionSanitizer {
    pub fn new(num_agents: usize, multi_agent: bool, add_noise: bool) -> Self {
        Self {
            space: ActionSpace::default(),
            num_agents,
            multi_agent,
            // NOISE_STD is positive and finite
            noise: add_noise.then(|| Normal::new(0.0, NOISE_STD)).and_then(|n| n.ok()),
        }
    }

    pub fn action_space(&self) -> ActionSpace {
        self.space
    }

    /// Produce one engine action per agent, in agent order
    ///
    /// Noise is added first, then clamped to the box, then the result is
    /// checked against the action space, so validation sees exactly what the
    /// engine will receive.
    pub fn sanitize<R: Rng + ?Sized>(
        &self,
        actions: Actions,
        rng: &mut R,
    ) -> Result<Vec<EngineAction>> {
        let actions = match actions {
            Actions::Single(action) if !self.multi_agent => vec![action],
            Actions::Single(_) => {
                return Err(EnvError::ActionShape(format!(
                    "multi-agent environment expects a list of {} actions",
                    self.num_agents
                )))
            }
            Actions::Multi(actions) => actions,
        };

        if actions.len() != self.num_agents {
            return Err(EnvError::ActionCountMismatch {
                expected: self.num_agents,
                actual: actions.len(),
            });
        }

        actions
            .into_iter()
            .enumerate()
            .map(|(agent, action)| self.sanitize_one(agent, action, rng))
            .collect()
    }

    fn sanitize_one<R: Rng + ?Sized>(
        &self,
        agent: usize,
        action: Action,
        rng: &mut R,
    ) -> Result<EngineAction> {
        let mut movement = action.movement;
        if let Some(noise) = &self.noise {
            for component in &mut movement {
                *component = (*component + noise.sample(rng))
                    .clamp(self.space.movement_low, self.space.movement_high);
            }
        }

        if !self.space.contains_movement(movement) {
            return Err(EnvError::ActionOutOfRange {
                agent,
                value: format!("movement=({}, {})", movement[0], movement[1]),
            });
        }
        let command = Command::try_from(action.command).map_err(|raw| {
            EnvError::ActionOutOfRange {
                agent,
                value: format!("command={raw}"),
            }
        })?;

        Ok(EngineAction {
            dx: movement[0],
            dy: movement[1],
            command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    #[test]
    fn test_single_agent_accepts_bare_or_one_element_list() {
        let sanitizer = ActionSanitizer::new(1, false, false);
        let action = Action::new(0.5, -0.5, Command::Split);

        let bare = sanitizer.sanitize(action.into(), &mut rng()).unwrap();
        let listed = sanitizer.sanitize(vec![action].into(), &mut rng()).unwrap();
        assert_eq!(bare, listed);
        assert_eq!(
            bare,
            vec![EngineAction {
                dx: 0.5,
                dy: -0.5,
                command: Command::Split
            }]
        );
    }

    #[test]
    fn test_count_mismatch_never_truncates_or_pads() {
        let sanitizer = ActionSanitizer::new(3, true, false);
        for n in [0, 1, 2, 4] {
            let err = sanitizer
                .sanitize(vec![Action::neutral(); n].into(), &mut rng())
                .unwrap_err();
            match err {
                EnvError::ActionCountMismatch { expected, actual } => {
                    assert_eq!(expected, 3);
                    assert_eq!(actual, n);
                }
                other => panic!("expected ActionCountMismatch, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_multi_agent_rejects_bare_action() {
        let sanitizer = ActionSanitizer::new(2, true, false);
        let err = sanitizer
            .sanitize(Action::neutral().into(), &mut rng())
            .unwrap_err();
        assert!(matches!(err, EnvError::ActionShape(_)));
    }

    #[test]
    fn test_output_preserves_agent_order() {
        let sanitizer = ActionSanitizer::new(3, true, false);
        let actions = vec![
            Action::new(0.1, 0.0, Command::Noop),
            Action::new(0.2, 0.0, Command::Split),
            Action::new(0.3, 0.0, Command::Feed),
        ];
        let out = sanitizer.sanitize(actions.into(), &mut rng()).unwrap();
        let dx: Vec<f32> = out.iter().map(|a| a.dx).collect();
        assert_eq!(dx, vec![0.1, 0.2, 0.3]);
        assert_eq!(out[2].command, Command::Feed);
    }

    #[test]
    fn test_noise_is_clamped_into_box() {
        let sanitizer = ActionSanitizer::new(1, false, true);
        let mut rng = rng();
        for _ in 0..2000 {
            let out = sanitizer
                .sanitize(Action::new(1.0, -1.0, Command::Noop).into(), &mut rng)
                .unwrap();
            assert!((-1.0..=1.0).contains(&out[0].dx));
            assert!((-1.0..=1.0).contains(&out[0].dy));
        }
    }

    #[test]
    fn test_noise_clamps_large_movement() {
        let sanitizer = ActionSanitizer::new(1, false, true);
        let mut rng = rng();
        for _ in 0..200 {
            let out = sanitizer
                .sanitize(Action::new(5.0, -7.0, Command::Noop).into(), &mut rng)
                .unwrap();
            assert_eq!(out[0].dx, 1.0);
            assert_eq!(out[0].dy, -1.0);
        }
    }

    #[test]
    fn test_large_movement_without_noise_is_rejected() {
        let sanitizer = ActionSanitizer::new(1, false, false);
        let err = sanitizer
            .sanitize(Action::new(5.0, -7.0, Command::Noop).into(), &mut rng())
            .unwrap_err();
        assert!(matches!(err, EnvError::ActionOutOfRange { agent: 0, .. }));
    }

    #[test]
    fn test_noise_perturbs_movement() {
        let sanitizer = ActionSanitizer::new(1, false, true);
        let out = sanitizer
            .sanitize(Action::neutral().into(), &mut rng())
            .unwrap();
        assert!(out[0].dx != 0.0 || out[0].dy != 0.0);
    }

    #[test]
    fn test_out_of_range_movement_without_noise() {
        let sanitizer = ActionSanitizer::new(2, true, false);
        let actions = vec![Action::neutral(), Action::new(1.5, 0.0, Command::Noop)];
        let err = sanitizer.sanitize(actions.into(), &mut rng()).unwrap_err();
        match err {
            EnvError::ActionOutOfRange { agent, value } => {
                assert_eq!(agent, 1);
                assert!(value.contains("1.5"));
            }
            other => panic!("expected ActionOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_nan_movement_rejected_even_with_noise() {
        let sanitizer = ActionSanitizer::new(1, false, true);
        let action = Action {
            movement: [f32::NAN, 0.0],
            command: 0,
        };
        let err = sanitizer.sanitize(action.into(), &mut rng()).unwrap_err();
        assert!(matches!(err, EnvError::ActionOutOfRange { agent: 0, .. }));
    }

    #[test]
    fn test_invalid_command_rejected() {
        let sanitizer = ActionSanitizer::new(1, false, true);
        let action = Action {
            movement: [0.0, 0.0],
            command: 3,
        };
        let err = sanitizer.sanitize(action.into(), &mut rng()).unwrap_err();
        match err {
            EnvError::ActionOutOfRange { agent, value } => {
                assert_eq!(agent, 0);
                assert_eq!(value, "command=3");
            }
            other => panic!("expected ActionOutOfRange, got {other:?}"),
        }
    }
}
