//! Action and observation space descriptors
//!
//! These describe the value ranges a learner can expect. They carry no
//! behavior beyond containment checks used by the action sanitizer.

use serde::Serialize;

/// Element type of an observation array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementType {
    F32,
    I32,
    U8,
}

/// Box-shaped observation space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationSpace {
    pub low: f64,
    pub high: f64,
    pub shape: Vec<usize>,
    pub dtype: ElementType,
}

impl ObservationSpace {
    /// Unbounded floating point vector (ram encoding)
    pub fn unbounded(shape: Vec<usize>) -> Self {
        Self {
            low: f64::NEG_INFINITY,
            high: f64::INFINITY,
            shape,
            dtype: ElementType::F32,
        }
    }

    /// Integer grid in `[-1, i32::MAX]` (grid encoding)
    pub fn grid(width: usize, height: usize, channels: usize) -> Self {
        Self {
            low: -1.0,
            high: f64::from(i32::MAX),
            shape: vec![width, height, channels],
            dtype: ElementType::I32,
        }
    }

    /// Pixel buffer in `[0, 255]` (screen encoding)
    pub fn pixels(shape: Vec<usize>) -> Self {
        Self {
            low: 0.0,
            high: 255.0,
            shape,
            dtype: ElementType::U8,
        }
    }

    /// Total number of elements in one observation
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hybrid action space: a `[-1, 1]^2` movement box and a discrete command
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActionSpace {
    pub movement_low: f32,
    pub movement_high: f32,
    pub num_commands: u8,
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self {
            movement_low: -1.0,
            movement_high: 1.0,
            num_commands: 3,
        }
    }
}

impl ActionSpace {
    /// Whether a movement vector lies inside the box (NaN never does)
    pub fn contains_movement(&self, movement: [f32; 2]) -> bool {
        movement
            .iter()
            .all(|v| (self.movement_low..=self.movement_high).contains(v))
    }

    /// Whether a raw command index names a valid command
    pub fn contains_command(&self, command: i64) -> bool {
        (0..i64::from(self.num_commands)).contains(&command)
    }
}
