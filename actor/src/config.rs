//! Configuration for the actor
//!
//! Defaults come from config.toml (with `AGARIO_*` environment overrides
//! applied by `env_config`). CLI arguments take highest priority.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use env_config::{load_config, AgarioConfig};
use env_core::{Difficulty, EnvOptions, ObservationKind};
use once_cell::sync::Lazy;
use tracing::level_filters::LevelFilter;

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<AgarioConfig> = Lazy::new(load_config);

fn default_observation() -> String {
    CENTRAL_CONFIG.env.observation.clone()
}

fn default_episodes() -> u32 {
    CENTRAL_CONFIG.actor.episodes
}

fn default_max_steps() -> u64 {
    CENTRAL_CONFIG.actor.max_steps_per_episode
}

fn default_record_video() -> bool {
    CENTRAL_CONFIG.actor.record_video
}

fn default_video_name() -> String {
    CENTRAL_CONFIG.actor.video_name.clone()
}

fn default_stats_file() -> String {
    CENTRAL_CONFIG.actor.stats_file.clone()
}

fn default_data_dir() -> String {
    CENTRAL_CONFIG.common.data_dir.clone()
}

fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_log_interval() -> u32 {
    CENTRAL_CONFIG.actor.log_interval
}

#[derive(Parser, Debug, Clone)]
#[command(name = "actor")]
#[command(about = "Agar.io environment runner - random-walk episodes")]
#[command(
    long_about = "Runs episodes of the agar.io environment on the reference arena with
uniformly random actions, reporting steps per second and reward statistics.

Configuration is loaded from config.toml with environment variable overrides.
CLI arguments take highest priority."
)]
pub struct Config {
    /// Observation encoding (ram, grid or screen)
    #[arg(long, default_value_t = default_observation())]
    pub observation: String,

    /// Number of agents (overrides [env] num_agents)
    #[arg(long)]
    pub num_agents: Option<u32>,

    /// Difficulty preset (normal, empty or trivial)
    #[arg(long)]
    pub difficulty: Option<Difficulty>,

    /// Episodes to run
    #[arg(long, default_value_t = default_episodes())]
    pub episodes: u32,

    /// Hard limit on steps per episode, independent of the environment's step cap
    #[arg(long, default_value_t = default_max_steps())]
    pub max_steps: u64,

    /// Seed for the arena and the random policy (random when unset)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Record agent 0's view and write a GIF at the end of the run
    #[arg(long, action = ArgAction::Set, default_value_t = default_record_video())]
    pub record_video: bool,

    /// File name of the recorded video, written under <data_dir>/videos
    #[arg(long, default_value_t = default_video_name())]
    pub video_name: String,

    /// File name of the JSON stats snapshot, written under <data_dir>
    #[arg(long, default_value_t = default_stats_file())]
    pub stats_file: String,

    /// Data directory for stats and videos
    #[arg(long, default_value_t = default_data_dir())]
    pub data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,

    /// Log progress every N episodes (0 to disable)
    #[arg(long, default_value_t = default_log_interval())]
    pub log_interval: u32,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.observation.parse::<ObservationKind>().is_err() {
            return Err(anyhow!(
                "invalid observation '{}', expected one of ram, grid, screen",
                self.observation
            ));
        }

        if self.num_agents == Some(0) {
            return Err(anyhow!("num_agents must be at least 1"));
        }

        if self.episodes == 0 {
            return Err(anyhow!("episodes must be greater than 0"));
        }

        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be greater than 0"));
        }

        if self.record_video && self.video_name.is_empty() {
            return Err(anyhow!("video_name cannot be empty when recording video"));
        }

        if self.stats_file.is_empty() {
            return Err(anyhow!("stats_file cannot be empty"));
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        Ok(())
    }

    /// Environment options from config.toml with CLI overrides applied
    pub fn env_options(&self) -> EnvOptions {
        let mut options = CENTRAL_CONFIG.env.options.clone();
        if let Some(n) = self.num_agents {
            options.num_agents = Some(n);
        }
        if let Some(difficulty) = self.difficulty {
            options.difficulty = Some(difficulty);
        }
        options
    }

    /// CLI seed, falling back to `[actor] seed`
    pub fn seed(&self) -> Option<u64> {
        self.seed.or(CENTRAL_CONFIG.actor.seed)
    }

    pub fn video_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("videos")
    }

    pub fn stats_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.stats_file)
    }
}
