//! Configuration resolver
//!
//! Turns a requested observation encoding plus a set of optional overrides
//! into the immutable configuration an environment runs with, and constructs
//! the native engine from it.
//!
//! Resolution is two-pass: a difficulty preset fills in the baseline values,
//! then every explicitly set option replaces its baseline value. Grid
//! observation settings follow the same pattern against fixed grid defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::episode::{EpisodeBoundary, TerminationRegime};
use crate::error::{EnvError, Result};
use crate::native::{EngineBackend, EngineKind, NativeEngine};
use crate::spaces::ObservationSpace;

pub const DEFAULT_TICKS_PER_STEP: u32 = 4;
pub const DEFAULT_NUM_FRAMES: u32 = 1;
pub const DEFAULT_GRID_SIZE: u32 = 128;
pub const DEFAULT_SCREEN_LEN: u32 = 84;
pub const DEFAULT_C_DEATH: f64 = -100.0;
pub const DEFAULT_NUMBER_STEPS: u64 = 500;

/// Observation encoding tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationKind {
    Ram,
    Grid,
    Screen,
}

impl ObservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::Ram => "ram",
            ObservationKind::Grid => "grid",
            ObservationKind::Screen => "screen",
        }
    }
}

impl fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservationKind {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ram" => Ok(ObservationKind::Ram),
            "grid" => Ok(ObservationKind::Grid),
            "screen" => Ok(ObservationKind::Screen),
            other => Err(EnvError::UnsupportedObservationType(other.to_string())),
        }
    }
}

/// Named difficulty preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Normal,
    Empty,
    Trivial,
}

impl FromStr for Difficulty {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Difficulty::Normal),
            "empty" => Ok(Difficulty::Empty),
            "trivial" => Ok(Difficulty::Trivial),
            other => Err(EnvError::InvalidConfiguration(format!(
                "unrecognized difficulty: {other}"
            ))),
        }
    }
}

/// Arena population set by a difficulty preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub arena_size: u32,
    pub num_pellets: u32,
    pub num_viruses: u32,
    pub num_bots: u32,
}

impl Difficulty {
    pub fn preset(self) -> Preset {
        let normal = Preset {
            arena_size: 1000,
            num_pellets: 1000,
            num_viruses: 0,
            num_bots: 0,
        };
        match self {
            Difficulty::Normal => normal,
            Difficulty::Empty => Preset {
                num_bots: 0,
                ..normal
            },
            Difficulty::Trivial => Preset {
                arena_size: 50,
                num_pellets: 200,
                num_viruses: 0,
                num_bots: 0,
            },
        }
    }
}

/// Reward formulation used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    /// Reward is the agent's current mass
    #[serde(alias = "instantaneous_mass")]
    Mass,
    /// Reward is the change in mass over the step
    #[default]
    #[serde(alias = "mass_delta")]
    Diff,
}

impl RewardType {
    /// Engine-side flag: true selects the mass-delta formulation
    pub fn is_diff(self) -> bool {
        matches!(self, RewardType::Diff)
    }
}

/// How `render()` behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Draw to a display, return nothing
    Human,
    /// Return the current frame without drawing
    RgbArray,
}

/// Explicit configuration overrides
///
/// Every field is optional; `None` means "use the preset or default value".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvOptions {
    pub multi_agent: Option<bool>,
    pub num_agents: Option<u32>,
    pub ticks_per_step: Option<u32>,
    pub arena_size: Option<u32>,
    pub num_pellets: Option<u32>,
    pub num_viruses: Option<u32>,
    pub num_bots: Option<u32>,
    pub pellet_regen: Option<bool>,
    pub allow_respawn: Option<bool>,
    pub reward_type: Option<RewardType>,
    pub c_death: Option<f64>,
    pub mode: Option<i64>,
    pub env_type: Option<TerminationRegime>,
    pub number_steps: Option<u64>,
    pub difficulty: Option<Difficulty>,
    pub agent_view: Option<bool>,
    pub add_noise: Option<bool>,
    pub grid_size: Option<u32>,
    pub screen_len: Option<u32>,
    pub num_frames: Option<u32>,
    pub observe_cells: Option<bool>,
    pub observe_others: Option<bool>,
    pub observe_viruses: Option<bool>,
    pub observe_pellets: Option<bool>,
    pub render_mode: Option<RenderMode>,
}

/// Fixed positional arguments for the native engine constructor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineArgs {
    pub num_agents: usize,
    pub ticks_per_step: u32,
    pub arena_size: u32,
    pub pellet_regen: bool,
    pub num_pellets: u32,
    pub num_viruses: u32,
    pub num_bots: u32,
    pub reward_type: RewardType,
    pub c_death: f64,
    /// Opaque to the adapter apart from gating the step cap
    pub mode: i64,
    pub allow_respawn: bool,
}

/// Grid observation settings applied after engine construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridObservationConfig {
    pub num_frames: u32,
    pub grid_size: u32,
    pub observe_cells: bool,
    pub observe_others: bool,
    pub observe_viruses: bool,
    pub observe_pellets: bool,
}

impl Default for GridObservationConfig {
    fn default() -> Self {
        Self {
            num_frames: DEFAULT_NUM_FRAMES,
            grid_size: DEFAULT_GRID_SIZE,
            observe_cells: true,
            observe_others: true,
            observe_viruses: true,
            observe_pellets: true,
        }
    }
}

impl GridObservationConfig {
    /// Grid defaults, then explicit overrides
    pub fn from_options(options: &EnvOptions) -> Self {
        let defaults = Self::default();
        Self {
            num_frames: options.num_frames.unwrap_or(defaults.num_frames),
            grid_size: options.grid_size.unwrap_or(defaults.grid_size),
            observe_cells: options.observe_cells.unwrap_or(defaults.observe_cells),
            observe_others: options.observe_others.unwrap_or(defaults.observe_others),
            observe_viruses: options.observe_viruses.unwrap_or(defaults.observe_viruses),
            observe_pellets: options.observe_pellets.unwrap_or(defaults.observe_pellets),
        }
    }
}

/// Screen engine settings passed positionally at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
    /// Raw semantic channels instead of a rendered RGB image
    pub agent_view: bool,
}

/// Encoding-specific configuration, fixed for the lifetime of an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EncodingConfig {
    Ram,
    Grid(GridObservationConfig),
    Screen(ScreenConfig),
}

impl EncodingConfig {
    pub fn kind(&self) -> ObservationKind {
        match self {
            EncodingConfig::Ram => ObservationKind::Ram,
            EncodingConfig::Grid(_) => ObservationKind::Grid,
            EncodingConfig::Screen(_) => ObservationKind::Screen,
        }
    }
}

/// Immutable configuration resolved once at construction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub difficulty: Difficulty,
    pub multi_agent: bool,
    pub engine: EngineArgs,
    pub encoding: EncodingConfig,
    pub episode: EpisodeBoundary,
    pub add_noise: bool,
    pub render_mode: Option<RenderMode>,
}

impl ResolvedConfig {
    pub fn num_agents(&self) -> usize {
        self.engine.num_agents
    }

    pub fn kind(&self) -> ObservationKind {
        self.encoding.kind()
    }
}

/// Resolve options for the given encoding
///
/// Pass one takes the difficulty preset, pass two applies every explicit
/// override on top of it. Validation happens before any engine exists.
pub fn resolve(kind: ObservationKind, options: &EnvOptions) -> Result<ResolvedConfig> {
    let difficulty = options.difficulty.unwrap_or_default();

    // Pass 1: preset
    let preset = difficulty.preset();

    // Pass 2: explicit overrides
    let num_agents = options.num_agents.unwrap_or(1);
    let ticks_per_step = options.ticks_per_step.unwrap_or(DEFAULT_TICKS_PER_STEP);
    let engine = EngineArgs {
        num_agents: num_agents as usize,
        ticks_per_step,
        arena_size: options.arena_size.unwrap_or(preset.arena_size),
        pellet_regen: options.pellet_regen.unwrap_or(true),
        num_pellets: options.num_pellets.unwrap_or(preset.num_pellets),
        num_viruses: options.num_viruses.unwrap_or(preset.num_viruses),
        num_bots: options.num_bots.unwrap_or(preset.num_bots),
        reward_type: options.reward_type.unwrap_or_default(),
        c_death: options.c_death.unwrap_or(DEFAULT_C_DEATH),
        mode: options.mode.unwrap_or(0),
        allow_respawn: options.allow_respawn.unwrap_or(true),
    };

    if ticks_per_step == 0 {
        return Err(EnvError::InvalidConfiguration(
            "ticks_per_step must be a positive integer".into(),
        ));
    }
    if num_agents == 0 {
        return Err(EnvError::InvalidConfiguration(
            "num_agents must be at least 1".into(),
        ));
    }
    if !engine.c_death.is_finite() {
        return Err(EnvError::InvalidConfiguration(
            "c_death must be a finite number".into(),
        ));
    }

    let encoding = match kind {
        ObservationKind::Ram => EncodingConfig::Ram,
        ObservationKind::Grid => {
            let grid = GridObservationConfig::from_options(options);
            if grid.grid_size == 0 || grid.num_frames == 0 {
                return Err(EnvError::InvalidConfiguration(
                    "grid_size and num_frames must be positive".into(),
                ));
            }
            EncodingConfig::Grid(grid)
        }
        ObservationKind::Screen => {
            let screen_len = options.screen_len.unwrap_or(DEFAULT_SCREEN_LEN);
            if screen_len == 0 {
                return Err(EnvError::InvalidConfiguration(
                    "screen_len must be positive".into(),
                ));
            }
            EncodingConfig::Screen(ScreenConfig {
                width: screen_len,
                height: screen_len,
                agent_view: options.agent_view.unwrap_or(false),
            })
        }
    };

    let episode = EpisodeBoundary {
        mode: engine.mode,
        regime: options.env_type.unwrap_or_default(),
        number_steps: options.number_steps.unwrap_or(DEFAULT_NUMBER_STEPS),
    };

    let config = ResolvedConfig {
        difficulty,
        multi_agent: options.multi_agent.unwrap_or(false) || num_agents > 1,
        engine,
        encoding,
        episode,
        add_noise: options.add_noise.unwrap_or(true),
        render_mode: options.render_mode,
    };
    debug!(?config, "Resolved environment configuration");
    Ok(config)
}

/// Construct the native engine for a resolved configuration
///
/// Returns the engine together with the observation space descriptor for the
/// active encoding. This is the only place engines are created.
pub fn build_engine(
    config: &ResolvedConfig,
    backend: &dyn EngineBackend,
) -> Result<(Box<dyn NativeEngine>, ObservationSpace)> {
    let built = match &config.encoding {
        EncodingConfig::Ram => make_ram(&config.engine, backend),
        EncodingConfig::Grid(grid) => make_grid(&config.engine, grid, backend),
        EncodingConfig::Screen(screen) => make_screen(&config.engine, screen, backend),
    }?;
    info!(
        encoding = %config.kind(),
        agents = config.num_agents(),
        shape = ?built.1.shape,
        "Native engine constructed"
    );
    Ok(built)
}

fn make_ram(
    args: &EngineArgs,
    backend: &dyn EngineBackend,
) -> Result<(Box<dyn NativeEngine>, ObservationSpace)> {
    let engine = backend.create(EngineKind::Ram, args)?;
    let space = ObservationSpace::unbounded(engine.observation_shape());
    Ok((engine, space))
}

fn make_grid(
    args: &EngineArgs,
    grid: &GridObservationConfig,
    backend: &dyn EngineBackend,
) -> Result<(Box<dyn NativeEngine>, ObservationSpace)> {
    let mut engine = backend.create(EngineKind::Grid, args)?;
    engine.configure_observation(grid)?;

    let shape = engine.observation_shape();
    let [channels, width, height] = shape.as_slice() else {
        return Err(EnvError::EngineContractViolation(format!(
            "grid observation shape must be (channels, width, height), got {shape:?}"
        )));
    };
    let space = ObservationSpace::grid(*width, *height, *channels);
    Ok((engine, space))
}

fn make_screen(
    args: &EngineArgs,
    screen: &ScreenConfig,
    backend: &dyn EngineBackend,
) -> Result<(Box<dyn NativeEngine>, ObservationSpace)> {
    if !backend.supports_screen() {
        return Err(EnvError::ScreenEnvironmentUnavailable);
    }
    let engine = backend.create(EngineKind::Screen(screen), args)?;
    let space = ObservationSpace::pixels(engine.observation_shape());
    Ok((engine, space))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockBackend;

    #[test]
    fn test_unknown_encoding_rejected() {
        let err = "pixels".parse::<ObservationKind>().unwrap_err();
        match err {
            EnvError::UnsupportedObservationType(name) => assert_eq!(name, "pixels"),
            other => panic!("expected UnsupportedObservationType, got {other:?}"),
        }
    }

    #[test]
    fn test_normal_defaults() {
        let config = resolve(ObservationKind::Ram, &EnvOptions::default()).unwrap();
        assert_eq!(config.engine.num_agents, 1);
        assert_eq!(config.engine.ticks_per_step, 4);
        assert_eq!(config.engine.arena_size, 1000);
        assert_eq!(config.engine.num_pellets, 1000);
        assert!(config.engine.pellet_regen);
        assert_eq!(config.engine.reward_type, RewardType::Diff);
        assert_eq!(config.engine.c_death, -100.0);
        assert!(!config.multi_agent);
        assert!(config.add_noise);
        assert_eq!(config.episode.number_steps, 500);
        assert_eq!(config.episode.regime, TerminationRegime::Episodic);
    }

    #[test]
    fn test_trivial_preset_with_override() {
        let options = EnvOptions {
            difficulty: Some(Difficulty::Trivial),
            num_viruses: Some(7),
            ..Default::default()
        };
        let config = resolve(ObservationKind::Ram, &options).unwrap();
        assert_eq!(config.engine.arena_size, 50);
        assert_eq!(config.engine.num_pellets, 200);
        assert_eq!(config.engine.num_viruses, 7);
        assert_eq!(config.engine.num_bots, 0);
    }

    #[test]
    fn test_difficulty_parse_is_case_insensitive() {
        assert_eq!("TRIVIAL".parse::<Difficulty>().unwrap(), Difficulty::Trivial);
        assert!(matches!(
            "nightmare".parse::<Difficulty>(),
            Err(EnvError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_ticks_rejected() {
        let options = EnvOptions {
            ticks_per_step: Some(0),
            ..Default::default()
        };
        let err = resolve(ObservationKind::Grid, &options).unwrap_err();
        assert!(matches!(err, EnvError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_num_agents_forces_multi_agent() {
        let options = EnvOptions {
            num_agents: Some(3),
            ..Default::default()
        };
        let config = resolve(ObservationKind::Grid, &options).unwrap();
        assert!(config.multi_agent);
        assert_eq!(config.num_agents(), 3);

        let options = EnvOptions {
            multi_agent: Some(true),
            ..Default::default()
        };
        let config = resolve(ObservationKind::Grid, &options).unwrap();
        assert!(config.multi_agent);
        assert_eq!(config.num_agents(), 1);
    }

    #[test]
    fn test_grid_overrides_beat_grid_defaults() {
        let options = EnvOptions {
            grid_size: Some(32),
            observe_pellets: Some(false),
            ..Default::default()
        };
        let config = resolve(ObservationKind::Grid, &options).unwrap();
        let EncodingConfig::Grid(grid) = config.encoding else {
            panic!("expected grid encoding");
        };
        assert_eq!(grid.grid_size, 32);
        assert!(!grid.observe_pellets);
        assert!(grid.observe_cells);
        assert_eq!(grid.num_frames, 1);
    }

    #[test]
    fn test_screen_encoding_carries_pixels_and_agent_view() {
        let options = EnvOptions {
            screen_len: Some(64),
            agent_view: Some(true),
            ..Default::default()
        };
        let config = resolve(ObservationKind::Screen, &options).unwrap();
        assert_eq!(
            config.encoding,
            EncodingConfig::Screen(ScreenConfig {
                width: 64,
                height: 64,
                agent_view: true,
            })
        );
    }

    #[test]
    fn test_options_deserialize_from_toml() {
        let options: EnvOptions = toml::from_str(
            r#"
num_agents = 2
reward_type = "mass"
env_type = "continuing"
difficulty = "trivial"
render_mode = "rgb_array"
"#,
        )
        .unwrap();
        assert_eq!(options.num_agents, Some(2));
        assert_eq!(options.reward_type, Some(RewardType::Mass));
        assert_eq!(options.env_type, Some(TerminationRegime::Continuing));
        assert_eq!(options.difficulty, Some(Difficulty::Trivial));
        assert_eq!(options.render_mode, Some(RenderMode::RgbArray));
        assert_eq!(options.ticks_per_step, None);
    }

    #[test]
    fn test_grid_space_transposes_engine_shape() {
        let backend = MockBackend::new();
        let options = EnvOptions {
            grid_size: Some(16),
            ..Default::default()
        };
        let config = resolve(ObservationKind::Grid, &options).unwrap();
        let (_engine, space) = build_engine(&config, &backend).unwrap();
        // mock reports (channels=3, width=16, height=8)
        assert_eq!(space.shape, vec![16, 8, 3]);
        assert_eq!(backend.log().configured_grid, Some(16));
    }

    #[test]
    fn test_screen_unavailable_checked_before_construction() {
        let backend = MockBackend::new().without_screen();
        let config = resolve(ObservationKind::Screen, &EnvOptions::default()).unwrap();
        let err = build_engine(&config, &backend).unwrap_err();
        assert!(matches!(err, EnvError::ScreenEnvironmentUnavailable));
        assert_eq!(backend.log().engines_created, 0);
    }

    #[test]
    fn test_ram_space_is_unbounded() {
        let backend = MockBackend::new();
        let config = resolve(ObservationKind::Ram, &EnvOptions::default()).unwrap();
        let (_engine, space) = build_engine(&config, &backend).unwrap();
        assert_eq!(space.low, f64::NEG_INFINITY);
        assert_eq!(space.high, f64::INFINITY);
        assert_eq!(backend.log().engines_created, 1);
    }
}
