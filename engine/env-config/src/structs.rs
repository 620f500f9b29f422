//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use env_core::{EnvOptions, ObservationKind};
use serde::{Deserialize, Serialize};

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// ============================================================================

fn d_data_dir() -> String {
    defaults::data_dir().into()
}
fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_observation() -> String {
    defaults::observation().into()
}
fn d_episodes() -> u32 {
    defaults::episodes()
}
fn d_max_steps() -> u64 {
    defaults::max_steps_per_episode()
}
fn d_record_video() -> bool {
    defaults::record_video()
}
fn d_video_name() -> String {
    defaults::video_name().into()
}
fn d_stats_file() -> String {
    defaults::stats_file().into()
}
fn d_log_interval() -> u32 {
    defaults::log_interval()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct AgarioConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub env: EnvConfig,
    #[serde(default)]
    pub actor: ActorConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir().into(),
            log_level: defaults::log_level().into(),
        }
    }
}

/// Environment section: the encoding name plus every environment option
///
/// Option keys sit directly in `[env]`; anything left out is resolved by
/// the environment's own presets.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EnvConfig {
    #[serde(default = "d_observation")]
    pub observation: String,
    #[serde(flatten)]
    pub options: EnvOptions,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            observation: defaults::observation().into(),
            options: EnvOptions::default(),
        }
    }
}

impl EnvConfig {
    /// Parsed observation encoding
    pub fn kind(&self) -> env_core::Result<ObservationKind> {
        self.observation.parse()
    }
}

/// Episode runner configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ActorConfig {
    #[serde(default = "d_episodes")]
    pub episodes: u32,
    #[serde(default = "d_max_steps")]
    pub max_steps_per_episode: u64,
    /// Seed for the engine and action noise; entropy when unset
    pub seed: Option<u64>,
    #[serde(default = "d_record_video")]
    pub record_video: bool,
    #[serde(default = "d_video_name")]
    pub video_name: String,
    #[serde(default = "d_stats_file")]
    pub stats_file: String,
    #[serde(default = "d_log_interval")]
    pub log_interval: u32,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            episodes: defaults::episodes(),
            max_steps_per_episode: defaults::max_steps_per_episode(),
            seed: None,
            record_video: defaults::record_video(),
            video_name: defaults::video_name().into(),
            stats_file: defaults::stats_file().into(),
            log_interval: defaults::log_interval(),
        }
    }
}
