//! Step orchestrator
//!
//! `AgarioEnv` owns one native engine and coordinates the sanitizer, the
//! observation builder, the episode boundary policy and the video recorder
//! for every `reset`/`step` call.
//!
//! The environment starts uninitialized; `reset` makes it ready and `close`
//! makes it terminal. `step` is only legal while ready. The state machine is
//! not reentrant: one caller drives one environment.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info};

use crate::action::{ActionSanitizer, Actions};
use crate::config::{self, EnvOptions, ObservationKind, RenderMode, ResolvedConfig};
use crate::environment::{Environment, PerAgent, ResetInfo, ResetResult, StepInfo, StepResult};
use crate::episode::Termination;
use crate::error::{EnvError, Result};
use crate::native::{EngineBackend, NativeEngine};
use crate::observation::{Frame, Observation, ObservationBuilder};
use crate::spaces::{ActionSpace, ObservationSpace};
use crate::video::{GifSink, VideoRecorder, VideoSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Ready,
    Closed,
}

/// Reinforcement-learning environment over a native agar.io engine
#[derive(Debug)]
pub struct AgarioEnv {
    config: ResolvedConfig,
    engine: Box<dyn NativeEngine>,
    observation_space: ObservationSpace,
    sanitizer: ActionSanitizer,
    builder: ObservationBuilder,
    recorder: VideoRecorder,
    rng: ChaCha20Rng,
    phase: Phase,
    steps: u64,
    /// Agent 0's latest screen observation, kept for `rgb_array` rendering
    last_screen: Option<Observation>,
}

impl AgarioEnv {
    /// Resolve `options` for `kind` and construct the engine through `backend`
    pub fn new(
        kind: ObservationKind,
        options: &EnvOptions,
        backend: &dyn EngineBackend,
    ) -> Result<Self> {
        let config = config::resolve(kind, options)?;
        let (engine, observation_space) = config::build_engine(&config, backend)?;

        info!(
            encoding = %kind,
            agents = config.num_agents(),
            multi_agent = config.multi_agent,
            difficulty = ?config.difficulty,
            "Environment created"
        );

        Ok(Self {
            sanitizer: ActionSanitizer::new(
                config.num_agents(),
                config.multi_agent,
                config.add_noise,
            ),
            builder: ObservationBuilder::new(config.encoding, config.num_agents()),
            recorder: VideoRecorder::default(),
            rng: ChaCha20Rng::from_entropy(),
            phase: Phase::Uninitialized,
            steps: 0,
            last_screen: None,
            config,
            engine,
            observation_space,
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    pub fn action_space(&self) -> ActionSpace {
        self.sanitizer.action_space()
    }

    pub fn num_agents(&self) -> usize {
        self.config.num_agents()
    }

    pub fn is_multi_agent(&self) -> bool {
        self.config.multi_agent
    }

    /// Steps taken since the last reset, or `None` before the first reset
    pub fn steps(&self) -> Option<u64> {
        (self.phase == Phase::Ready).then_some(self.steps)
    }

    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_open()?;
        self.engine.save(path.as_ref())?;
        Ok(())
    }

    pub fn load_snapshot(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_open()?;
        self.engine.load(path.as_ref())?;
        Ok(())
    }

    pub fn enable_video_recorder(&mut self) {
        self.recorder.enable();
    }

    pub fn disable_video_recorder(&mut self) {
        self.recorder.disable();
    }

    pub fn recorder(&self) -> &VideoRecorder {
        &self.recorder
    }

    /// Write captured frames as an animated GIF
    pub fn generate_video(&self, directory: impl AsRef<Path>, filename: &str) -> Result<PathBuf> {
        self.generate_video_with(directory, filename, &mut GifSink::default())
    }

    /// Write captured frames through a caller-supplied sink
    pub fn generate_video_with(
        &self,
        directory: impl AsRef<Path>,
        filename: &str,
        sink: &mut dyn VideoSink,
    ) -> Result<PathBuf> {
        self.recorder.generate(directory, filename, sink)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.phase {
            Phase::Closed => Err(EnvError::Closed),
            _ => Ok(()),
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.phase {
            Phase::Uninitialized => Err(EnvError::NotReset),
            Phase::Closed => Err(EnvError::Closed),
            Phase::Ready => Ok(()),
        }
    }

    fn check_len(&self, what: &str, len: usize) -> Result<()> {
        if len != self.num_agents() {
            return Err(EnvError::EngineContractViolation(format!(
                "engine returned {len} {what} for {} agents",
                self.num_agents()
            )));
        }
        Ok(())
    }

    fn observe(&mut self) -> Result<Vec<Observation>> {
        let observations = self.builder.build(self.engine.get_state())?;
        if self.config.kind() == ObservationKind::Screen {
            self.last_screen = observations.first().cloned();
        }
        Ok(observations)
    }
}

impl Environment for AgarioEnv {
    fn reset(&mut self) -> Result<ResetResult> {
        self.ensure_open()?;
        self.steps = 0;
        self.engine.reset();
        let observations = self.observe()?;
        self.phase = Phase::Ready;

        debug!(agents = self.num_agents(), "Environment reset");
        Ok(ResetResult {
            observations: PerAgent::shape(observations, self.config.multi_agent),
            info: ResetInfo::default(),
        })
    }

    fn step(&mut self, actions: Actions) -> Result<StepResult> {
        self.ensure_ready()?;

        // Nothing reaches the engine until every action is valid, and a
        // rejected call leaves the noise stream where it was
        let mut rng = self.rng.clone();
        let actions = self.sanitizer.sanitize(actions, &mut rng)?;
        self.engine.take_actions(&actions)?;
        self.rng = rng;

        let rewards = self.engine.step()?;
        self.check_len("rewards", rewards.len())?;

        let observations = self.observe()?;

        if self.recorder.is_enabled() {
            // single viewpoint: agent 0 only
            if let Some(frame) = self
                .builder
                .video_frame(self.engine.as_mut(), &observations)?
            {
                self.recorder.capture(frame);
            }
        }

        let dones = self.engine.dones();
        self.check_len("done flags", dones.len())?;

        let steps = self.steps + 1;
        let (dones, termination) = self.config.episode.apply(steps, dones);
        if termination == Some(Termination::StepCap) {
            debug!(steps, cap = self.config.episode.number_steps, "Step cap reached");
        }

        let truncations = vec![false; dones.len()];
        self.steps = steps;

        let multi = self.config.multi_agent;
        Ok(StepResult {
            observations: PerAgent::shape(observations, multi),
            rewards: PerAgent::shape(rewards.clone(), multi),
            dones: PerAgent::shape(dones, multi),
            truncations: PerAgent::shape(truncations, multi),
            info: StepInfo {
                steps,
                untransformed_rewards: rewards,
            },
        })
    }

    fn render(&mut self) -> Result<Option<Frame>> {
        self.ensure_open()?;
        match self.config.render_mode {
            None => Ok(None),
            Some(RenderMode::Human) => {
                self.engine.render()?;
                Ok(None)
            }
            Some(RenderMode::RgbArray) => match self.config.kind() {
                ObservationKind::Ram => Ok(None),
                ObservationKind::Grid => self.builder.video_frame(self.engine.as_mut(), &[]),
                ObservationKind::Screen => {
                    let Some(last) = self.last_screen.as_ref() else {
                        return Err(EnvError::NotReset);
                    };
                    self.builder
                        .video_frame(self.engine.as_mut(), std::slice::from_ref(last))
                }
            },
        }
    }

    fn seed(&mut self, seed: Option<u64>) -> Result<Option<Vec<u64>>> {
        self.ensure_open()?;
        let Some(seed) = seed else {
            return Ok(None);
        };
        self.engine.seed(seed);
        self.rng = ChaCha20Rng::seed_from_u64(seed);
        Ok(Some(vec![seed]))
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.engine.close();
        self.phase = Phase::Closed;
        info!("Environment closed");
        Ok(())
    }
}

impl Drop for AgarioEnv {
    fn drop(&mut self) {
        if self.phase != Phase::Closed {
            self.engine.close();
        }
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
