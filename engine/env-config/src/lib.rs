//! Shared configuration for the agar.io environment tools
//!
//! Holds the `[common]`, `[env]` and `[actor]` sections of config.toml and
//! the logic that finds, parses and overrides them.
//!
//! # Precedence
//!
//! `AGARIO_<SECTION>_<KEY>` environment variables beat config.toml, which
//! beats the defaults embedded from config.defaults.toml.
//!
//! # Overrides
//!
//! ```text
//! AGARIO_<SECTION>_<KEY>=value
//!
//! Examples:
//!     AGARIO_COMMON_LOG_LEVEL=debug
//!     AGARIO_ENV_OBSERVATION=ram
//!     AGARIO_ENV_NUM_AGENTS=4
//!     AGARIO_ENV_DIFFICULTY=trivial
//!     AGARIO_ACTOR_EPISODES=50
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{apply_env_overrides, load_config, load_from_path, CONFIG_SEARCH_PATHS};
pub use structs::*;

#[cfg(test)]
mod tests;
