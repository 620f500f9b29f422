//! Observation builder
//!
//! Converts native per-agent engine state into the public observation layout
//! and derives the single-viewpoint frames used for rendering and video.

use ndarray::{Array3, Array4, ArrayView3, Axis, Zip};
use serde::Serialize;

use crate::config::EncodingConfig;
use crate::error::{EnvError, Result};
use crate::native::{NativeEngine, NativeState};

/// RGB image `(height, width, 3)`
pub type Frame = Array3<u8>;

/// Public per-agent observation
///
/// Grid observations are always `(width, height, channel)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Observation {
    Ram(ndarray::Array1<f32>),
    Grid(Array3<i32>),
    Screen(Array4<u8>),
}

impl Observation {
    pub fn shape(&self) -> &[usize] {
        match self {
            Observation::Ram(a) => a.shape(),
            Observation::Grid(a) => a.shape(),
            Observation::Screen(a) => a.shape(),
        }
    }
}

/// Agent-view palette
pub mod palette {
    pub const BACKGROUND: [u8; 3] = [255, 0, 0];
    pub const PELLET: [u8; 3] = [255, 255, 255];
    pub const ENEMY: [u8; 3] = [153, 51, 204];
    pub const VIRUS: [u8; 3] = [0, 255, 0];
    pub const OWN_CELL: [u8; 3] = [0, 0, 255];
    pub const GRID_LINE: [u8; 3] = [26, 0, 0];
}

/// Builds observations for one fixed encoding
#[derive(Debug, Clone)]
pub struct ObservationBuilder {
    encoding: EncodingConfig,
    num_agents: usize,
}

impl ObservationBuilder {
    pub fn new(encoding: EncodingConfig, num_agents: usize) -> Self {
        Self {
            encoding,
            num_agents,
        }
    }

    /// Convert native states into observations, one per agent
    pub fn build(&self, states: Vec<NativeState>) -> Result<Vec<Observation>> {
        if states.len() != self.num_agents {
            return Err(EnvError::EngineContractViolation(format!(
                "engine returned {} observations for {} agents",
                states.len(),
                self.num_agents
            )));
        }

        states
            .into_iter()
            .map(|state| match (&self.encoding, state) {
                (EncodingConfig::Ram, NativeState::Ram(values)) => Ok(Observation::Ram(values)),
                (EncodingConfig::Grid(_), NativeState::Grid(grid)) => {
                    Ok(Observation::Grid(channel_last(grid)))
                }
                (EncodingConfig::Screen(_), NativeState::Screen(pixels)) => {
                    Ok(Observation::Screen(pixels))
                }
                (encoding, _) => Err(EnvError::EngineContractViolation(format!(
                    "engine state does not match {} encoding",
                    encoding.kind()
                ))),
            })
            .collect()
    }

    /// Frame of agent 0 for video capture and `rgb_array` rendering
    ///
    /// Grid environments re-query a dedicated render instead of reusing the
    /// training array. Ram observations have no visual form.
    pub fn video_frame(
        &self,
        engine: &mut dyn NativeEngine,
        observations: &[Observation],
    ) -> Result<Option<Frame>> {
        match &self.encoding {
            EncodingConfig::Ram => Ok(None),
            EncodingConfig::Grid(_) => {
                let frame = engine.get_frame()?.into_iter().next().ok_or_else(|| {
                    EnvError::EngineContractViolation("engine rendered no frames".into())
                })?;
                Ok(Some(frame))
            }
            EncodingConfig::Screen(screen) => {
                let Some(Observation::Screen(stack)) = observations.first() else {
                    return Err(EnvError::EngineContractViolation(
                        "no screen observation for agent 0".into(),
                    ));
                };
                if stack.len_of(Axis(0)) == 0 {
                    return Err(EnvError::EngineContractViolation(
                        "screen observation has no frames".into(),
                    ));
                }
                let first = stack.index_axis(Axis(0), 0);
                if screen.agent_view {
                    agent_view_rgb(first).map(Some)
                } else {
                    Ok(Some(first.to_owned()))
                }
            }
        }
    }
}

/// `(channel, width, height)` to `(width, height, channel)`, in standard layout
pub fn channel_last(grid: Array3<i32>) -> Array3<i32> {
    grid.permuted_axes([1, 2, 0])
        .as_standard_layout()
        .into_owned()
}

/// Remap raw agent-view channels into the RGB palette
///
/// Masks are applied in a fixed order and later masks overwrite earlier ones:
/// pellets (channel 0 != 255), enemies (channel 1 == 255), viruses
/// (channel 2 == 255), own cells (channel 3 in (30, 230]) and grid lines
/// (channel 3 <= 30).
pub fn agent_view_rgb(raw: ArrayView3<'_, u8>) -> Result<Frame> {
    let (height, width, channels) = raw.dim();
    if channels < 4 {
        return Err(EnvError::EngineContractViolation(format!(
            "agent view needs 4 raw channels, got {channels}"
        )));
    }

    let mut rgb = Array3::<u8>::zeros((height, width, 3));
    Zip::from(rgb.lanes_mut(Axis(2)))
        .and(raw.lanes(Axis(2)))
        .for_each(|mut out, px| {
            let mut color = palette::BACKGROUND;
            if px[0] != 255 {
                color = palette::PELLET;
            }
            if px[1] == 255 {
                color = palette::ENEMY;
            }
            if px[2] == 255 {
                color = palette::VIRUS;
            }
            if px[3] > 30 && px[3] <= 230 {
                color = palette::OWN_CELL;
            }
            if px[3] <= 30 {
                color = palette::GRID_LINE;
            }
            for (dst, src) in out.iter_mut().zip(color) {
                *dst = src;
            }
        });
    Ok(rgb)
}
