//! Tests for the configuration module.

use super::*;
use env_core::{Difficulty, ObservationKind, RewardType, TerminationRegime};
use once_cell::sync::Lazy;
use std::sync::Mutex;

/// Serializes tests that read or write process environment variables
static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[test]
fn test_default_config() {
    let config = AgarioConfig::default();
    assert_eq!(config.common.data_dir, "./data");
    assert_eq!(config.common.log_level, "info");
    assert_eq!(config.env.observation, "grid");
    assert_eq!(config.env.options, env_core::EnvOptions::default());
    assert_eq!(config.actor.episodes, 10);
    assert_eq!(config.actor.max_steps_per_episode, 500);
    assert!(config.actor.seed.is_none());
    assert!(!config.actor.record_video);
}

#[test]
fn test_parse_config_toml() {
    let toml_content = r#"
[common]
data_dir = "/custom/data"

[env]
observation = "ram"
num_agents = 3
difficulty = "trivial"
reward_type = "mass"
env_type = "continuing"
c_death = -10.0

[actor]
episodes = 100
seed = 7
record_video = true
"#;
    let config: AgarioConfig = toml::from_str(toml_content).unwrap();
    assert_eq!(config.common.data_dir, "/custom/data");
    assert_eq!(config.env.kind().unwrap(), ObservationKind::Ram);
    assert_eq!(config.env.options.num_agents, Some(3));
    assert_eq!(config.env.options.difficulty, Some(Difficulty::Trivial));
    assert_eq!(config.env.options.reward_type, Some(RewardType::Mass));
    assert_eq!(
        config.env.options.env_type,
        Some(TerminationRegime::Continuing)
    );
    assert_eq!(config.env.options.c_death, Some(-10.0));
    assert_eq!(config.actor.episodes, 100);
    assert_eq!(config.actor.seed, Some(7));
    assert!(config.actor.record_video);
}

#[test]
fn test_partial_config() {
    let toml_content = r#"
[env]
grid_size = 64
"#;
    let config: AgarioConfig = toml::from_str(toml_content).unwrap();
    assert_eq!(config.env.observation, "grid"); // Default
    assert_eq!(config.env.options.grid_size, Some(64));
    assert_eq!(config.env.options.num_agents, None);
    assert_eq!(config.common.log_level, "info"); // Default
    assert_eq!(config.actor.video_name, "episode.gif"); // Default
}

#[test]
fn test_unknown_observation_reported_on_use() {
    let toml_content = r#"
[env]
observation = "voxels"
"#;
    let config: AgarioConfig = toml::from_str(toml_content).unwrap();
    assert!(matches!(
        config.env.kind(),
        Err(env_core::EnvError::UnsupportedObservationType(_))
    ));
}

#[test]
fn test_agario_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    std::env::set_var("AGARIO_ENV_OBSERVATION", "ram");
    std::env::set_var("AGARIO_ENV_NUM_AGENTS", "4");
    std::env::set_var("AGARIO_ENV_DIFFICULTY", "Trivial");
    std::env::set_var("AGARIO_ENV_REWARD_TYPE", "mass");
    std::env::set_var("AGARIO_ACTOR_SEED", "99");

    let config = apply_env_overrides(AgarioConfig::default());
    assert_eq!(config.env.observation, "ram");
    assert_eq!(config.env.options.num_agents, Some(4));
    assert_eq!(config.env.options.difficulty, Some(Difficulty::Trivial));
    assert_eq!(config.env.options.reward_type, Some(RewardType::Mass));
    assert_eq!(config.actor.seed, Some(99));

    std::env::remove_var("AGARIO_ENV_OBSERVATION");
    std::env::remove_var("AGARIO_ENV_NUM_AGENTS");
    std::env::remove_var("AGARIO_ENV_DIFFICULTY");
    std::env::remove_var("AGARIO_ENV_REWARD_TYPE");
    std::env::remove_var("AGARIO_ACTOR_SEED");
}

#[test]
fn test_grid_plane_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let keys = [
        "AGARIO_ENV_OBSERVE_CELLS",
        "AGARIO_ENV_OBSERVE_OTHERS",
        "AGARIO_ENV_OBSERVE_VIRUSES",
        "AGARIO_ENV_OBSERVE_PELLETS",
    ];
    for key in keys {
        std::env::set_var(key, "false");
    }

    let options = apply_env_overrides(AgarioConfig::default()).env.options;
    assert_eq!(options.observe_cells, Some(false));
    assert_eq!(options.observe_others, Some(false));
    assert_eq!(options.observe_viruses, Some(false));
    assert_eq!(options.observe_pellets, Some(false));

    for key in keys {
        std::env::remove_var(key);
    }
}

#[test]
fn test_unparseable_overrides_are_ignored() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    std::env::set_var("AGARIO_ENV_TICKS_PER_STEP", "fast");
    std::env::set_var("AGARIO_ENV_ENV_TYPE", "forever");

    let config = apply_env_overrides(AgarioConfig::default());
    assert_eq!(config.env.options.ticks_per_step, None);
    assert_eq!(config.env.options.env_type, None);

    std::env::remove_var("AGARIO_ENV_TICKS_PER_STEP");
    std::env::remove_var("AGARIO_ENV_ENV_TYPE");
}

#[test]
fn test_load_from_path_applies_overrides_on_top_of_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[actor]
episodes = 3
log_interval = 5
"#,
    )
    .unwrap();

    std::env::set_var("AGARIO_ACTOR_LOG_INTERVAL", "9");
    let config = load_from_path(&path);
    std::env::remove_var("AGARIO_ACTOR_LOG_INTERVAL");

    assert_eq!(config.actor.episodes, 3);
    assert_eq!(config.actor.log_interval, 9);
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[actor\nepisodes = ").unwrap();

    let config = load_from_path(&path);
    assert_eq!(config, AgarioConfig::default());
}

#[test]
fn test_explicit_config_path() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[common]\nlog_level = \"debug\"\n").unwrap();

    std::env::set_var("AGARIO_CONFIG", &path);
    let config = load_config();
    std::env::remove_var("AGARIO_CONFIG");

    assert_eq!(config.common.log_level, "debug");
}
