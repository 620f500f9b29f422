//! Default configuration values loaded from config.defaults.toml.
//!
//! The shared TOML file is embedded at compile time so every binary agrees
//! on the same defaults.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    env: EnvDefaults,
    actor: ActorDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    data_dir: String,
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct EnvDefaults {
    observation: String,
}

#[derive(Debug, Deserialize)]
struct ActorDefaults {
    episodes: u32,
    max_steps_per_episode: u64,
    record_video: bool,
    video_name: String,
    stats_file: String,
    log_interval: u32,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn data_dir() -> &'static str {
    &DEFAULTS.common.data_dir
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// Env
pub fn observation() -> &'static str {
    &DEFAULTS.env.observation
}

// Actor
pub fn episodes() -> u32 {
    DEFAULTS.actor.episodes
}
pub fn max_steps_per_episode() -> u64 {
    DEFAULTS.actor.max_steps_per_episode
}
pub fn record_video() -> bool {
    DEFAULTS.actor.record_video
}
pub fn video_name() -> &'static str {
    &DEFAULTS.actor.video_name
}
pub fn stats_file() -> &'static str {
    &DEFAULTS.actor.stats_file
}
pub fn log_interval() -> u32 {
    DEFAULTS.actor.log_interval
}
