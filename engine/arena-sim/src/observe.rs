//! Per-agent views of the world: ram vectors, grid planes and RGB frames

use env_core::GridObservationConfig;
use ndarray::{s, Array1, Array3, ArrayViewMut2};

use crate::world::{radius, Vec2, World, FOOD_MASS, PELLET_MASS, VIRUS_MASS};

const RAM_PELLETS: usize = 8;
const RAM_VIRUSES: usize = 4;
const RAM_ENEMIES: usize = 4;

/// Ram vector length: own x, y, mass and cell count, then the nearest
/// pellets (dx, dy), viruses (dx, dy) and enemy cells (dx, dy, mass)
pub const RAM_LEN: usize = 4 + 2 * RAM_PELLETS + 2 * RAM_VIRUSES + 3 * RAM_ENEMIES;

/// Side length of rendered RGB frames
pub const FRAME_LEN: usize = 128;

/// Side length of the world square a player sees, by mass
pub fn view_size(mass: f32) -> f32 {
    (2.0 * mass).clamp(100.0, 300.0)
}

pub fn ram(world: &World, agent: usize) -> Array1<f32> {
    let mut out = Array1::<f32>::zeros(RAM_LEN);
    let player = &world.players[agent];
    if player.is_dead() {
        return out;
    }
    let here = player.location();
    out[0] = here.x;
    out[1] = here.y;
    out[2] = player.mass();
    out[3] = player.cells.len() as f32;

    let mut offset = 4;
    for (pos, _) in nearest(here, world.pellets.iter().map(|p| (*p, PELLET_MASS)), RAM_PELLETS) {
        out[offset] = pos.x - here.x;
        out[offset + 1] = pos.y - here.y;
        offset += 2;
    }

    offset = 4 + 2 * RAM_PELLETS;
    for (pos, _) in nearest(here, world.viruses.iter().map(|v| (*v, VIRUS_MASS)), RAM_VIRUSES) {
        out[offset] = pos.x - here.x;
        out[offset + 1] = pos.y - here.y;
        offset += 2;
    }

    offset = 4 + 2 * RAM_PELLETS + 2 * RAM_VIRUSES;
    let enemies = world
        .players
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != agent)
        .flat_map(|(_, p)| p.cells.iter().map(|c| (c.pos, c.mass)));
    for (pos, mass) in nearest(here, enemies, RAM_ENEMIES) {
        out[offset] = pos.x - here.x;
        out[offset + 1] = pos.y - here.y;
        out[offset + 2] = mass;
        offset += 3;
    }
    out
}

fn nearest(
    here: Vec2,
    items: impl Iterator<Item = (Vec2, f32)>,
    k: usize,
) -> Vec<(Vec2, f32)> {
    let mut items: Vec<_> = items.collect();
    items.sort_by(|a, b| a.0.distance(here).total_cmp(&b.0.distance(here)));
    items.truncate(k);
    items
}

/// How a grid plane combines several entities landing in one square
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reduce {
    /// Mass of the last entity seen
    Present,
    Total,
    Min,
    Max,
}

/// Writes channel-major `(channel, x, y)` grid planes
#[derive(Debug, Clone, Copy)]
pub struct GridEncoder {
    pub config: GridObservationConfig,
}

impl GridEncoder {
    pub fn new(config: GridObservationConfig) -> Self {
        Self { config }
    }

    /// Planes per stacked frame; the leading plane marks out-of-bounds squares
    pub fn channels_per_frame(&self) -> usize {
        let c = &self.config;
        1 + usize::from(c.observe_cells)
            + 2 * usize::from(c.observe_others)
            + 2 * usize::from(c.observe_viruses)
            + 2 * usize::from(c.observe_pellets)
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        let size = self.config.grid_size as usize;
        (
            self.config.num_frames as usize * self.channels_per_frame(),
            size,
            size,
        )
    }

    pub fn empty(&self) -> Array3<i32> {
        Array3::zeros(self.shape())
    }

    /// Overwrite stacked frame `frame` of `out` with the agent's current view
    pub fn write_frame(&self, world: &World, agent: usize, frame: usize, out: &mut Array3<i32>) {
        let per_frame = self.channels_per_frame();
        let mut planes = out.slice_mut(s![frame * per_frame..(frame + 1) * per_frame, .., ..]);
        planes.fill(0);

        let player = &world.players[agent];
        let view = Viewport::new(player.location(), view_size(player.mass()), self.config.grid_size);
        let mut channel = 0;

        mark_out_of_bounds(planes.index_axis_mut(ndarray::Axis(0), channel), &view, world.arena_size);

        if self.config.observe_pellets {
            let pellets = world.pellets.iter().map(|p| (*p, PELLET_MASS));
            channel += 1;
            store(planes.index_axis_mut(ndarray::Axis(0), channel), &view, pellets.clone(), Reduce::Present);
            channel += 1;
            store(planes.index_axis_mut(ndarray::Axis(0), channel), &view, pellets, Reduce::Total);
        }
        if self.config.observe_viruses {
            let viruses = world.viruses.iter().map(|v| (*v, VIRUS_MASS));
            channel += 1;
            store(planes.index_axis_mut(ndarray::Axis(0), channel), &view, viruses.clone(), Reduce::Present);
            channel += 1;
            store(planes.index_axis_mut(ndarray::Axis(0), channel), &view, viruses, Reduce::Total);
        }
        if self.config.observe_cells {
            let own = player.cells.iter().map(|c| (c.pos, c.mass));
            channel += 1;
            store(planes.index_axis_mut(ndarray::Axis(0), channel), &view, own, Reduce::Total);
        }
        if self.config.observe_others {
            let others = || {
                world
                    .players
                    .iter()
                    .enumerate()
                    .filter(move |(i, _)| *i != agent)
                    .flat_map(|(_, p)| p.cells.iter().map(|c| (c.pos, c.mass)))
                    .chain(world.food.iter().map(|f| (f.pos, FOOD_MASS)))
            };
            channel += 1;
            store(planes.index_axis_mut(ndarray::Axis(0), channel), &view, others(), Reduce::Min);
            channel += 1;
            store(planes.index_axis_mut(ndarray::Axis(0), channel), &view, others(), Reduce::Max);
        }
    }
}

/// Square window of the world centered on a player
#[derive(Debug, Clone, Copy)]
struct Viewport {
    center: Vec2,
    size: f32,
    cells: f32,
}

impl Viewport {
    fn new(center: Vec2, size: f32, cells: u32) -> Self {
        Self {
            center,
            size,
            cells: cells as f32,
        }
    }

    fn to_grid(&self, pos: Vec2) -> Option<(usize, usize)> {
        let half = self.cells / 2.0;
        let gx = (self.cells * (pos.x - self.center.x) / self.size + half).floor();
        let gy = (self.cells * (pos.y - self.center.y) / self.size + half).floor();
        let inside = (0.0..self.cells).contains(&gx) && (0.0..self.cells).contains(&gy);
        inside.then_some((gx as usize, gy as usize))
    }

    fn to_world(&self, gx: usize, gy: usize) -> Vec2 {
        let half = self.cells / 2.0;
        Vec2::new(
            self.center.x + (gx as f32 - half) * self.size / self.cells,
            self.center.y + (gy as f32 - half) * self.size / self.cells,
        )
    }
}

fn mark_out_of_bounds(mut plane: ArrayViewMut2<'_, i32>, view: &Viewport, arena: f32) {
    for ((gx, gy), value) in plane.indexed_iter_mut() {
        let loc = view.to_world(gx, gy);
        let inside = (0.0..arena).contains(&loc.x) && (0.0..arena).contains(&loc.y);
        *value = if inside { 0 } else { -1 };
    }
}

fn store(
    mut plane: ArrayViewMut2<'_, i32>,
    view: &Viewport,
    entities: impl Iterator<Item = (Vec2, f32)>,
    reduce: Reduce,
) {
    for (pos, mass) in entities {
        let Some(index) = view.to_grid(pos) else {
            continue;
        };
        let mass = mass as i32;
        let slot = &mut plane[index];
        *slot = match reduce {
            Reduce::Present => mass,
            Reduce::Total => *slot + mass,
            Reduce::Max => (*slot).max(mass),
            Reduce::Min if *slot == 0 => mass,
            Reduce::Min => (*slot).min(mass),
        };
    }
}

mod colors {
    pub const BACKGROUND: [u8; 3] = [255, 255, 255];
    pub const OUTSIDE: [u8; 3] = [40, 40, 40];
    pub const PELLET: [u8; 3] = [90, 160, 255];
    pub const FOOD: [u8; 3] = [255, 200, 60];
    pub const VIRUS: [u8; 3] = [0, 200, 0];
    pub const OWN: [u8; 3] = [0, 0, 255];
    pub const AGENT: [u8; 3] = [220, 30, 30];
    pub const BOT: [u8; 3] = [153, 51, 204];
}

/// Top-down RGB render `(height, width, 3)` centered on `agent`
pub fn render_frame(world: &World, agent: usize) -> Array3<u8> {
    let player = &world.players[agent];
    let view = Viewport::new(player.location(), view_size(player.mass()), FRAME_LEN as u32);
    let scale = FRAME_LEN as f32 / view.size;
    let mut frame = Array3::<u8>::zeros((FRAME_LEN, FRAME_LEN, 3));

    for row in 0..FRAME_LEN {
        for col in 0..FRAME_LEN {
            let loc = view.to_world(col, row);
            let inside = (0.0..world.arena_size).contains(&loc.x)
                && (0.0..world.arena_size).contains(&loc.y);
            let color = if inside {
                colors::BACKGROUND
            } else {
                colors::OUTSIDE
            };
            paint(&mut frame, row, col, color);
        }
    }

    let mut disc = |pos: Vec2, mass: f32, color: [u8; 3]| {
        fill_disc(&mut frame, &view, pos, (radius(mass) * scale).max(1.0), color);
    };
    for p in &world.pellets {
        disc(*p, PELLET_MASS, colors::PELLET);
    }
    for f in &world.food {
        disc(f.pos, FOOD_MASS, colors::FOOD);
    }
    for v in &world.viruses {
        disc(*v, VIRUS_MASS, colors::VIRUS);
    }
    for (i, other) in world.players.iter().enumerate() {
        let color = match (i == agent, other.is_bot) {
            (true, _) => colors::OWN,
            (false, true) => colors::BOT,
            (false, false) => colors::AGENT,
        };
        for cell in &other.cells {
            disc(cell.pos, cell.mass, color);
        }
    }
    frame
}

fn paint(frame: &mut Array3<u8>, row: usize, col: usize, color: [u8; 3]) {
    for (channel, value) in color.into_iter().enumerate() {
        frame[[row, col, channel]] = value;
    }
}

fn fill_disc(frame: &mut Array3<u8>, view: &Viewport, pos: Vec2, r_px: f32, color: [u8; 3]) {
    let Some((cx, cy)) = view.to_grid(pos) else {
        return;
    };
    let reach = r_px.ceil() as i64;
    let (cx, cy) = (cx as i64, cy as i64);
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if ((dx * dx + dy * dy) as f32) > r_px * r_px {
                continue;
            }
            let (col, row) = (cx + dx, cy + dy);
            if (0..FRAME_LEN as i64).contains(&col) && (0..FRAME_LEN as i64).contains(&row) {
                paint(frame, row as usize, col as usize, color);
            }
        }
    }
}
