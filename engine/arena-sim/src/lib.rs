//! Reference agar.io arena for the environment adapter
//!
//! This crate provides a small, deterministic implementation of the native
//! engine interface so environments can run end to end without an external
//! simulator. It supports ram and grid observations; screen rendering is not
//! available.
//!
//! # Usage
//!
//! ```rust
//! use arena_sim::ArenaBackend;
//! use env_core::{make_env, Action, EnvOptions, Environment};
//!
//! let backend = ArenaBackend::new();
//! let mut env = make_env("grid", &EnvOptions::default(), &backend).unwrap();
//! env.seed(Some(42)).unwrap();
//! env.reset().unwrap();
//! let result = env.step(Action::neutral().into()).unwrap();
//! assert!(!result.all_done());
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use env_core::{
    EngineAction, EngineArgs, EngineBackend, EngineError, EngineKind, GridObservationConfig,
    NativeEngine, NativeState,
};
use ndarray::Array3;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod observe;
pub mod world;

use crate::observe::{GridEncoder, RAM_LEN};
use crate::world::World;

/// Seed used until the caller seeds explicitly
pub const DEFAULT_SEED: u64 = 42;

/// Factory for arena engines
#[derive(Debug, Clone, Default)]
pub struct ArenaBackend {
    seed: Option<u64>,
}

impl ArenaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed every engine this backend creates
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl EngineBackend for ArenaBackend {
    fn supports_screen(&self) -> bool {
        false
    }

    fn create(
        &self,
        kind: EngineKind<'_>,
        args: &EngineArgs,
    ) -> Result<Box<dyn NativeEngine>, EngineError> {
        let encoding = match kind {
            EngineKind::Ram => Encoding::Ram,
            EngineKind::Grid => Encoding::Grid(GridEncoder::new(GridObservationConfig::default())),
            EngineKind::Screen(_) => {
                return Err(EngineError::Unsupported(
                    "the reference arena cannot render screens".into(),
                ))
            }
        };
        let engine = ArenaEngine::new(args.clone(), encoding, self.seed.unwrap_or(DEFAULT_SEED))?;
        Ok(Box::new(engine))
    }
}

#[derive(Debug, Clone, Copy)]
enum Encoding {
    Ram,
    Grid(GridEncoder),
}

/// Serialized engine state
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    num_agents: usize,
    steps: u64,
    world: World,
}

/// One arena with its RL agents and bots
#[derive(Debug)]
pub struct ArenaEngine {
    args: EngineArgs,
    encoding: Encoding,
    world: World,
    rng: ChaCha20Rng,
    /// Stacked grid frames per agent, refreshed during `step`
    grids: Vec<Array3<i32>>,
    dones: Vec<bool>,
    steps: u64,
}

impl ArenaEngine {
    fn new(args: EngineArgs, encoding: Encoding, seed: u64) -> Result<Self, EngineError> {
        if args.arena_size == 0 {
            return Err(EngineError::Rejected("arena_size must be positive".into()));
        }
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let world = World::new(&args, &mut rng);
        let mut engine = Self {
            dones: vec![false; args.num_agents],
            grids: Vec::new(),
            steps: 0,
            args,
            encoding,
            world,
            rng,
        };
        engine.refresh_grids();
        info!(
            agents = engine.args.num_agents,
            bots = engine.args.num_bots,
            arena = engine.args.arena_size,
            "Arena engine created"
        );
        Ok(engine)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn agent_masses(&self) -> Vec<f32> {
        self.world.players[..self.args.num_agents]
            .iter()
            .map(|p| p.mass())
            .collect()
    }

    /// Fill every stacked frame with the current state
    fn refresh_grids(&mut self) {
        let Encoding::Grid(encoder) = self.encoding else {
            self.grids.clear();
            return;
        };
        self.grids = (0..self.args.num_agents)
            .map(|agent| {
                let mut grid = encoder.empty();
                for frame in 0..encoder.config.num_frames as usize {
                    encoder.write_frame(&self.world, agent, frame, &mut grid);
                }
                grid
            })
            .collect();
    }

    /// Record the frames of the last `num_frames` ticks of a step
    fn record_tick(&mut self, tick: usize) {
        let Encoding::Grid(encoder) = self.encoding else {
            return;
        };
        let frames = encoder.config.num_frames as usize;
        let ticks = self.args.ticks_per_step as usize;
        let Some(frame) = (tick + frames).checked_sub(ticks) else {
            return;
        };
        for (agent, grid) in self.grids.iter_mut().enumerate() {
            encoder.write_frame(&self.world, agent, frame, grid);
        }
    }
}

impl NativeEngine for ArenaEngine {
    fn configure_observation(&mut self, config: &GridObservationConfig) -> Result<(), EngineError> {
        match self.encoding {
            Encoding::Grid(_) => {
                self.encoding = Encoding::Grid(GridEncoder::new(*config));
                self.refresh_grids();
                Ok(())
            }
            Encoding::Ram => Err(EngineError::Unsupported(
                "ram engines have no grid observation".into(),
            )),
        }
    }

    fn observation_shape(&self) -> Vec<usize> {
        match self.encoding {
            Encoding::Ram => vec![RAM_LEN],
            Encoding::Grid(encoder) => {
                let (c, w, h) = encoder.shape();
                vec![c, w, h]
            }
        }
    }

    fn reset(&mut self) {
        self.world = World::new(&self.args, &mut self.rng);
        self.dones = vec![false; self.args.num_agents];
        self.steps = 0;
        self.refresh_grids();
    }

    fn take_actions(&mut self, actions: &[EngineAction]) -> Result<(), EngineError> {
        if actions.len() != self.args.num_agents {
            return Err(EngineError::Rejected(format!(
                "Number of actions ({}) does not match number of agents ({})",
                actions.len(),
                self.args.num_agents
            )));
        }
        for (player, action) in self.world.players.iter_mut().zip(actions) {
            player.aim(action.dx, action.dy, action.command);
        }
        Ok(())
    }

    fn step(&mut self) -> Result<Vec<f64>, EngineError> {
        let before = self.agent_masses();
        let ticks = self.args.ticks_per_step as usize;
        for tick in 0..ticks {
            self.world.tick(&mut self.rng);
            self.record_tick(tick);
        }

        let after = self.agent_masses();
        let mut rewards = Vec::with_capacity(after.len());
        for agent in 0..self.args.num_agents {
            let dead = self.world.players[agent].is_dead();
            // without respawn a dead agent stays done but is only penalized once
            let died = dead && before[agent] > 0.0;
            self.dones[agent] = dead;

            let mut reward = if self.args.reward_type.is_diff() {
                f64::from(after[agent] - before[agent])
            } else {
                f64::from(after[agent])
            };
            if died {
                reward += self.args.c_death;
                debug!(agent, "Agent eliminated");
            }
            rewards.push(reward);
        }

        for index in 0..self.world.players.len() {
            if self.world.players[index].is_dead() {
                let is_agent = index < self.args.num_agents;
                if !is_agent || self.args.allow_respawn {
                    self.world.respawn(index, &mut self.rng);
                }
            }
        }

        self.steps += 1;
        Ok(rewards)
    }

    fn get_state(&self) -> Vec<NativeState> {
        match self.encoding {
            Encoding::Ram => (0..self.args.num_agents)
                .map(|agent| NativeState::Ram(observe::ram(&self.world, agent)))
                .collect(),
            Encoding::Grid(_) => self.grids.iter().cloned().map(NativeState::Grid).collect(),
        }
    }

    fn dones(&self) -> Vec<bool> {
        self.dones.clone()
    }

    fn seed(&mut self, seed: u64) {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
    }

    fn render(&mut self) -> Result<(), EngineError> {
        for (agent, player) in self.world.players[..self.args.num_agents].iter().enumerate() {
            let at = player.location();
            info!(
                agent,
                mass = player.mass(),
                cells = player.cells.len(),
                x = at.x,
                y = at.y,
                "Arena state"
            );
        }
        Ok(())
    }

    fn get_frame(&mut self) -> Result<Vec<Array3<u8>>, EngineError> {
        Ok((0..self.args.num_agents)
            .map(|agent| observe::render_frame(&self.world, agent))
            .collect())
    }

    fn save(&self, path: &Path) -> Result<(), EngineError> {
        let snapshot = Snapshot {
            num_agents: self.args.num_agents,
            steps: self.steps,
            world: self.world.clone(),
        };
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &snapshot)
            .map_err(|e| EngineError::Snapshot(format!("Unable to save {}: {e}", path.display())))?;
        writer.flush()?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)
            .map_err(|e| EngineError::Snapshot(format!("Unable to load {}: {e}", path.display())))?;
        if snapshot.num_agents != self.args.num_agents {
            return Err(EngineError::Snapshot(format!(
                "snapshot has {} agents, engine has {}",
                snapshot.num_agents, self.args.num_agents
            )));
        }
        self.world = snapshot.world;
        self.steps = snapshot.steps;
        self.dones = self.world.players[..self.args.num_agents]
            .iter()
            .map(|p| p.is_dead())
            .collect();
        self.refresh_grids();
        Ok(())
    }
}
