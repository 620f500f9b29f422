//! Scripted native engine for unit tests

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use ndarray::{Array1, Array3, Array4};

use crate::config::{EngineArgs, GridObservationConfig};
use crate::native::{EngineAction, EngineBackend, EngineError, EngineKind, NativeEngine, NativeState};

/// Everything the mock engines observed, plus knobs tests can turn
#[derive(Debug, Default)]
pub struct MockLog {
    pub engines_created: usize,
    pub last_args: Option<EngineArgs>,
    pub configured_grid: Option<u32>,
    pub actions: Vec<Vec<EngineAction>>,
    pub steps: usize,
    pub resets: usize,
    pub frames_rendered: usize,
    pub human_renders: usize,
    pub seeds: Vec<u64>,
    pub saved: Vec<PathBuf>,
    pub loaded: Vec<PathBuf>,
    pub closed: usize,

    /// Native done flags to report; defaults to all false
    pub native_dones: Option<Vec<bool>>,
    /// Report this many rewards instead of one per agent
    pub reward_len: Option<usize>,
    /// Report this many done flags instead of one per agent
    pub done_len: Option<usize>,
}

type SharedLog = Arc<Mutex<MockLog>>;

fn lock(log: &SharedLog) -> MutexGuard<'_, MockLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MockKind {
    Ram,
    Grid,
    Screen { agent_view: bool },
}

#[derive(Debug)]
pub struct MockBackend {
    screen: bool,
    log: SharedLog,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            screen: true,
            log: SharedLog::default(),
        }
    }

    pub fn without_screen(mut self) -> Self {
        self.screen = false;
        self
    }

    pub fn log(&self) -> MutexGuard<'_, MockLog> {
        lock(&self.log)
    }
}

impl EngineBackend for MockBackend {
    fn supports_screen(&self) -> bool {
        self.screen
    }

    fn create(
        &self,
        kind: EngineKind<'_>,
        args: &EngineArgs,
    ) -> Result<Box<dyn NativeEngine>, EngineError> {
        {
            let mut log = lock(&self.log);
            log.engines_created += 1;
            log.last_args = Some(args.clone());
        }
        let kind = match kind {
            EngineKind::Ram => MockKind::Ram,
            EngineKind::Grid => MockKind::Grid,
            EngineKind::Screen(screen) => MockKind::Screen {
                agent_view: screen.agent_view,
            },
        };
        Ok(Box::new(MockEngine::with_log(
            kind,
            args.num_agents,
            Arc::clone(&self.log),
        )))
    }
}

/// Engine whose state is a pure function of the step counter
#[derive(Debug)]
pub struct MockEngine {
    kind: MockKind,
    num_agents: usize,
    grid_size: usize,
    ticks: usize,
    log: SharedLog,
}

impl MockEngine {
    fn with_log(kind: MockKind, num_agents: usize, log: SharedLog) -> Self {
        Self {
            kind,
            num_agents,
            grid_size: 16,
            ticks: 0,
            log,
        }
    }

    pub fn ram(num_agents: usize) -> Self {
        Self::with_log(MockKind::Ram, num_agents, SharedLog::default())
    }

    pub fn grid(num_agents: usize) -> Self {
        Self::with_log(MockKind::Grid, num_agents, SharedLog::default())
    }

    pub fn screen(num_agents: usize, agent_view: bool) -> Self {
        Self::with_log(
            MockKind::Screen { agent_view },
            num_agents,
            SharedLog::default(),
        )
    }

    pub fn log(&self) -> MutexGuard<'_, MockLog> {
        lock(&self.log)
    }

    fn grid_dims(&self) -> (usize, usize) {
        (self.grid_size, self.grid_size / 2)
    }
}

impl NativeEngine for MockEngine {
    fn configure_observation(
        &mut self,
        config: &GridObservationConfig,
    ) -> Result<(), EngineError> {
        if self.kind != MockKind::Grid {
            return Err(EngineError::Unsupported("configure_observation".into()));
        }
        self.grid_size = config.grid_size as usize;
        lock(&self.log).configured_grid = Some(config.grid_size);
        Ok(())
    }

    fn observation_shape(&self) -> Vec<usize> {
        match self.kind {
            MockKind::Ram => vec![6],
            MockKind::Grid => {
                let (width, height) = self.grid_dims();
                vec![3, width, height]
            }
            MockKind::Screen { agent_view } => vec![2, 4, 4, if agent_view { 4 } else { 3 }],
        }
    }

    fn reset(&mut self) {
        self.ticks = 0;
        lock(&self.log).resets += 1;
    }

    fn take_actions(&mut self, actions: &[EngineAction]) -> Result<(), EngineError> {
        if actions.len() != self.num_agents {
            return Err(EngineError::Rejected(format!(
                "{} actions for {} agents",
                actions.len(),
                self.num_agents
            )));
        }
        lock(&self.log).actions.push(actions.to_vec());
        Ok(())
    }

    fn step(&mut self) -> Result<Vec<f64>, EngineError> {
        self.ticks += 1;
        let mut log = lock(&self.log);
        log.steps += 1;
        let len = log.reward_len.unwrap_or(self.num_agents);
        Ok((0..len).map(|agent| (agent + 1) as f64).collect())
    }

    fn get_state(&self) -> Vec<NativeState> {
        let tick = self.ticks as f32;
        (0..self.num_agents)
            .map(|agent| match self.kind {
                MockKind::Ram => {
                    let mut values = Array1::<f32>::zeros(6);
                    values[0] = agent as f32;
                    values[1] = tick;
                    NativeState::Ram(values)
                }
                MockKind::Grid => {
                    let (width, height) = self.grid_dims();
                    NativeState::Grid(Array3::from_shape_fn(
                        (3, width, height),
                        |(c, x, y)| (c * 10_000 + x * 100 + y) as i32,
                    ))
                }
                MockKind::Screen { agent_view } => {
                    let channels = if agent_view { 4 } else { 3 };
                    let mut pixels = Array4::<u8>::from_elem((2, 4, 4, channels), 255);
                    if agent_view {
                        // agent's own cell in the top-left corner of frame 0
                        pixels[[0, 0, 0, 3]] = 100;
                    }
                    NativeState::Screen(pixels)
                }
            })
            .collect()
    }

    fn dones(&self) -> Vec<bool> {
        let log = lock(&self.log);
        let len = log.done_len.unwrap_or(self.num_agents);
        match &log.native_dones {
            Some(dones) => dones.iter().copied().cycle().take(len).collect(),
            None => vec![false; len],
        }
    }

    fn seed(&mut self, seed: u64) {
        lock(&self.log).seeds.push(seed);
    }

    fn render(&mut self) -> Result<(), EngineError> {
        lock(&self.log).human_renders += 1;
        Ok(())
    }

    fn get_frame(&mut self) -> Result<Vec<Array3<u8>>, EngineError> {
        let (width, height) = self.grid_dims();
        lock(&self.log).frames_rendered += 1;
        Ok((0..self.num_agents)
            .map(|agent| Array3::from_elem((height, width, 3), agent as u8))
            .collect())
    }

    fn save(&self, path: &Path) -> Result<(), EngineError> {
        std::fs::write(path, format!("ticks: {}\n", self.ticks))?;
        lock(&self.log).saved.push(path.to_path_buf());
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        let content = std::fs::read_to_string(path)?;
        self.ticks = content
            .trim()
            .strip_prefix("ticks: ")
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| EngineError::Snapshot(format!("bad snapshot: {content}")))?;
        lock(&self.log).loaded.push(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self) {
        lock(&self.log).closed += 1;
    }
}
