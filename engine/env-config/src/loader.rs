//! Locating, reading and overriding config.toml

use crate::AgarioConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Relative paths tried when `AGARIO_CONFIG` is unset
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",    // Current directory
    "../config.toml", // Parent directory (when running from subdirectory)
];

/// Load the shared configuration
///
/// `AGARIO_CONFIG` names an explicit file; otherwise the first existing
/// entry of `CONFIG_SEARCH_PATHS` is used, and built-in defaults when none
/// exists. `AGARIO_*` overrides are applied in every case.
pub fn load_config() -> AgarioConfig {
    if let Ok(path) = std::env::var("AGARIO_CONFIG") {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from AGARIO_CONFIG: {}", path.display());
            return load_from_path(&path);
        }
        warn!(
            "AGARIO_CONFIG={} not found, searching defaults",
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(&path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(AgarioConfig::default())
}

/// Load one file, falling back to defaults when it is missing or malformed
pub fn load_from_path(path: &Path) -> AgarioConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(AgarioConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(AgarioConfig::default())
        }
    }
}

/// Assign a config field from an environment variable when it is set and valid
macro_rules! env_override {
    // String field
    ($config:expr, $($field:ident).+, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$($field).+ = v;
        }
    };
    // Parseable field (u32, u64, bool, etc.)
    ($config:expr, $($field:ident).+, $key:expr, parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$($field).+ = v;
        }
    };
    // Optional parseable field (Option<u32>, Option<f64>, etc.)
    ($config:expr, $($field:ident).+, $key:expr, optional_parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$($field).+ = Some(v);
        }
    };
    // Optional enum field, parsed with the same names as config.toml
    ($config:expr, $($field:ident).+, $key:expr, optional_enum) => {
        if let Ok(v) = std::env::var($key) {
            match toml::Value::String(v.clone()).try_into() {
                Ok(parsed) => $config.$($field).+ = Some(parsed),
                Err(_) => warn!(key = $key, value = %v, "Ignoring unrecognized override"),
            }
        }
    };
}

/// Apply `AGARIO_<SECTION>_<KEY>` overrides
///
/// Values that fail to parse leave the field untouched.
pub fn apply_env_overrides(mut config: AgarioConfig) -> AgarioConfig {
    // Common
    env_override!(config, common.data_dir, "AGARIO_COMMON_DATA_DIR");
    env_override!(config, common.log_level, "AGARIO_COMMON_LOG_LEVEL");

    // Env
    env_override!(config, env.observation, "AGARIO_ENV_OBSERVATION");
    env_override!(
        config,
        env.options.multi_agent,
        "AGARIO_ENV_MULTI_AGENT",
        optional_parse
    );
    env_override!(
        config,
        env.options.num_agents,
        "AGARIO_ENV_NUM_AGENTS",
        optional_parse
    );
    env_override!(
        config,
        env.options.ticks_per_step,
        "AGARIO_ENV_TICKS_PER_STEP",
        optional_parse
    );
    env_override!(
        config,
        env.options.arena_size,
        "AGARIO_ENV_ARENA_SIZE",
        optional_parse
    );
    env_override!(
        config,
        env.options.num_pellets,
        "AGARIO_ENV_NUM_PELLETS",
        optional_parse
    );
    env_override!(
        config,
        env.options.num_viruses,
        "AGARIO_ENV_NUM_VIRUSES",
        optional_parse
    );
    env_override!(
        config,
        env.options.num_bots,
        "AGARIO_ENV_NUM_BOTS",
        optional_parse
    );
    env_override!(
        config,
        env.options.pellet_regen,
        "AGARIO_ENV_PELLET_REGEN",
        optional_parse
    );
    env_override!(
        config,
        env.options.allow_respawn,
        "AGARIO_ENV_ALLOW_RESPAWN",
        optional_parse
    );
    env_override!(
        config,
        env.options.reward_type,
        "AGARIO_ENV_REWARD_TYPE",
        optional_enum
    );
    env_override!(
        config,
        env.options.c_death,
        "AGARIO_ENV_C_DEATH",
        optional_parse
    );
    env_override!(config, env.options.mode, "AGARIO_ENV_MODE", optional_parse);
    env_override!(
        config,
        env.options.env_type,
        "AGARIO_ENV_ENV_TYPE",
        optional_enum
    );
    env_override!(
        config,
        env.options.number_steps,
        "AGARIO_ENV_NUMBER_STEPS",
        optional_parse
    );
    env_override!(
        config,
        env.options.difficulty,
        "AGARIO_ENV_DIFFICULTY",
        optional_parse
    );
    env_override!(
        config,
        env.options.add_noise,
        "AGARIO_ENV_ADD_NOISE",
        optional_parse
    );
    env_override!(
        config,
        env.options.grid_size,
        "AGARIO_ENV_GRID_SIZE",
        optional_parse
    );
    env_override!(
        config,
        env.options.num_frames,
        "AGARIO_ENV_NUM_FRAMES",
        optional_parse
    );
    env_override!(
        config,
        env.options.observe_cells,
        "AGARIO_ENV_OBSERVE_CELLS",
        optional_parse
    );
    env_override!(
        config,
        env.options.observe_others,
        "AGARIO_ENV_OBSERVE_OTHERS",
        optional_parse
    );
    env_override!(
        config,
        env.options.observe_viruses,
        "AGARIO_ENV_OBSERVE_VIRUSES",
        optional_parse
    );
    env_override!(
        config,
        env.options.observe_pellets,
        "AGARIO_ENV_OBSERVE_PELLETS",
        optional_parse
    );
    env_override!(
        config,
        env.options.screen_len,
        "AGARIO_ENV_SCREEN_LEN",
        optional_parse
    );
    env_override!(
        config,
        env.options.agent_view,
        "AGARIO_ENV_AGENT_VIEW",
        optional_parse
    );
    env_override!(
        config,
        env.options.render_mode,
        "AGARIO_ENV_RENDER_MODE",
        optional_enum
    );

    // Actor
    env_override!(config, actor.episodes, "AGARIO_ACTOR_EPISODES", parse);
    env_override!(
        config,
        actor.max_steps_per_episode,
        "AGARIO_ACTOR_MAX_STEPS_PER_EPISODE",
        parse
    );
    env_override!(config, actor.seed, "AGARIO_ACTOR_SEED", optional_parse);
    env_override!(
        config,
        actor.record_video,
        "AGARIO_ACTOR_RECORD_VIDEO",
        parse
    );
    env_override!(config, actor.video_name, "AGARIO_ACTOR_VIDEO_NAME");
    env_override!(config, actor.stats_file, "AGARIO_ACTOR_STATS_FILE");
    env_override!(
        config,
        actor.log_interval,
        "AGARIO_ACTOR_LOG_INTERVAL",
        parse
    );

    config
}
