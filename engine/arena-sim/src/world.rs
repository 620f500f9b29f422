//! Arena entities and the fixed-timestep simulation

use std::f32::consts::TAU;
use std::ops::{Add, Mul, Sub};

use env_core::{Command, EngineArgs};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// Seconds of game time per tick
pub const TICK_DT: f32 = 1.0 / 30.0;

pub const START_MASS: f32 = 25.0;
pub const PELLET_MASS: f32 = 1.0;
pub const VIRUS_MASS: f32 = 100.0;
pub const FOOD_MASS: f32 = 13.0;
pub const FEED_COST: f32 = 16.0;

/// Minimum mass a cell needs to split or feed
pub const MIN_ACTION_MASS: f32 = 35.0;
/// A cell must be this many times heavier than another to eat it
pub const EAT_MARGIN: f32 = 1.1;
pub const CELL_LIMIT: usize = 16;
/// Pieces a cell bursts into when it swallows a virus
pub const POP_PIECES: usize = 4;

pub const MAX_SPEED: f32 = 400.0;
pub const FOOD_SPEED: f32 = 100.0;
/// Fraction of launch velocity kept after each tick
pub const DRAG: f32 = 0.85;
/// Distance to the movement target per unit of action
pub const ACTION_REACH: f32 = 10.0;

pub const SPLIT_COOLDOWN_TICKS: u32 = 30;
pub const FEED_COOLDOWN_TICKS: u32 = 10;
pub const RECOMBINE_TICKS: u32 = 30 * 30;
/// Fraction of mass above the starting mass lost per second
pub const DECAY_RATE: f32 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    /// Unit vector, or zero for a (near) zero vector
    pub fn normed(self) -> Vec2 {
        let len = self.length();
        if len < f32::EPSILON {
            Vec2::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    pub fn from_angle(theta: f32) -> Vec2 {
        Vec2::new(theta.cos(), theta.sin())
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

pub fn radius(mass: f32) -> f32 {
    2.0 * mass.max(0.0).sqrt()
}

pub fn max_speed(mass: f32) -> f32 {
    MAX_SPEED / mass.max(1.0).sqrt()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub pos: Vec2,
    pub mass: f32,
    /// Launch velocity from a split or pop, decays with `DRAG`
    pub velocity: Vec2,
    /// Ticks until this cell may merge with its siblings
    pub recombine: u32,
}

impl Cell {
    pub fn new(pos: Vec2, mass: f32) -> Self {
        Self {
            pos,
            mass,
            velocity: Vec2::ZERO,
            recombine: 0,
        }
    }

    pub fn radius(&self) -> f32 {
        radius(self.mass)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub cells: Vec<Cell>,
    pub target: Vec2,
    pub is_bot: bool,
    pub command: Command,
    pub split_cooldown: u32,
    pub feed_cooldown: u32,
    /// Where the player was last seen alive
    pub last_location: Vec2,
}

impl Player {
    fn spawn(pos: Vec2, is_bot: bool) -> Self {
        Self {
            cells: vec![Cell::new(pos, START_MASS)],
            target: pos,
            is_bot,
            command: Command::Noop,
            split_cooldown: 0,
            feed_cooldown: 0,
            last_location: pos,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn mass(&self) -> f32 {
        self.cells.iter().map(|c| c.mass).sum()
    }

    /// Mass-weighted centroid of the player's cells
    pub fn location(&self) -> Vec2 {
        let mass = self.mass();
        if mass <= 0.0 {
            return self.last_location;
        }
        self.cells
            .iter()
            .fold(Vec2::ZERO, |acc, c| acc + c.pos * (c.mass / mass))
    }

    /// Point the player at an offset from its current location
    pub fn aim(&mut self, dx: f32, dy: f32, command: Command) {
        if self.is_dead() {
            return;
        }
        self.target = self.location() + Vec2::new(dx, dy) * ACTION_REACH;
        self.command = command;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub pos: Vec2,
    pub velocity: Vec2,
}

/// Complete simulation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub arena_size: f32,
    pub num_pellets: usize,
    pub num_viruses: usize,
    pub pellet_regen: bool,
    pub pellets: Vec<Vec2>,
    pub viruses: Vec<Vec2>,
    pub food: Vec<Food>,
    /// RL agents first, in agent order, then bots
    pub players: Vec<Player>,
    pub ticks: u64,
}

impl World {
    pub fn new(args: &EngineArgs, rng: &mut ChaCha20Rng) -> Self {
        let mut world = Self {
            arena_size: args.arena_size as f32,
            num_pellets: args.num_pellets as usize,
            num_viruses: args.num_viruses as usize,
            pellet_regen: args.pellet_regen,
            pellets: Vec::with_capacity(args.num_pellets as usize),
            viruses: Vec::with_capacity(args.num_viruses as usize),
            food: Vec::new(),
            players: Vec::with_capacity(args.num_agents + args.num_bots as usize),
            ticks: 0,
        };

        for _ in 0..args.num_pellets {
            let p = world.random_point(rng);
            world.pellets.push(p);
        }
        for _ in 0..args.num_viruses {
            let p = world.random_point(rng);
            world.viruses.push(p);
        }
        for _ in 0..args.num_agents {
            let p = world.random_point(rng);
            world.players.push(Player::spawn(p, false));
        }
        for _ in 0..args.num_bots {
            let p = world.random_point(rng);
            world.players.push(Player::spawn(p, true));
        }
        world
    }

    pub fn random_point(&self, rng: &mut ChaCha20Rng) -> Vec2 {
        Vec2::new(
            rng.gen_range(0.0..self.arena_size),
            rng.gen_range(0.0..self.arena_size),
        )
    }

    pub fn respawn(&mut self, index: usize, rng: &mut ChaCha20Rng) {
        let pos = self.random_point(rng);
        let is_bot = self.players[index].is_bot;
        self.players[index] = Player::spawn(pos, is_bot);
    }

    /// Advance the world by one tick
    pub fn tick(&mut self, rng: &mut ChaCha20Rng) {
        self.steer_bots();
        for index in 0..self.players.len() {
            self.apply_command(index, rng);
        }
        self.move_cells();
        self.move_food();
        self.eat_pellets();
        self.eat_food();
        self.eat_viruses(rng);
        self.eat_cells();
        self.recombine();
        self.decay();
        self.replenish(rng);

        for player in &mut self.players {
            if !player.is_dead() {
                player.last_location = player.location();
            }
        }
        self.ticks += 1;
    }

    /// Bots head for the closest pellet
    fn steer_bots(&mut self) {
        let pellets = &self.pellets;
        for player in self.players.iter_mut().filter(|p| p.is_bot && !p.is_dead()) {
            let here = player.location();
            if let Some(closest) = pellets
                .iter()
                .min_by(|a, b| a.distance(here).total_cmp(&b.distance(here)))
            {
                player.target = *closest;
            }
        }
    }

    fn apply_command(&mut self, index: usize, rng: &mut ChaCha20Rng) {
        let player = &mut self.players[index];
        player.split_cooldown = player.split_cooldown.saturating_sub(1);
        player.feed_cooldown = player.feed_cooldown.saturating_sub(1);

        match player.command {
            Command::Split if player.split_cooldown == 0 => {
                split(player);
                player.split_cooldown = SPLIT_COOLDOWN_TICKS;
            }
            Command::Feed if player.feed_cooldown == 0 => {
                let ejected = feed(player, rng);
                player.feed_cooldown = FEED_COOLDOWN_TICKS;
                self.food.extend(ejected);
            }
            _ => {}
        }
        // commands fire once; movement persists until the next action
        self.players[index].command = Command::Noop;
    }

    fn move_cells(&mut self) {
        let arena = self.arena_size;
        for player in &mut self.players {
            let target = player.target;
            for cell in &mut player.cells {
                let mut velocity = (target - cell.pos) * 3.0;
                let limit = max_speed(cell.mass);
                if velocity.length() > limit {
                    velocity = velocity.normed() * limit;
                }
                cell.pos = cell.pos + (velocity + cell.velocity) * TICK_DT;
                cell.pos.x = cell.pos.x.clamp(0.0, arena);
                cell.pos.y = cell.pos.y.clamp(0.0, arena);
                cell.velocity = cell.velocity * DRAG;
                cell.recombine = cell.recombine.saturating_sub(1);
            }
        }
    }

    fn move_food(&mut self) {
        let arena = self.arena_size;
        for food in &mut self.food {
            food.pos = food.pos + food.velocity * TICK_DT;
            food.pos.x = food.pos.x.clamp(0.0, arena);
            food.pos.y = food.pos.y.clamp(0.0, arena);
            food.velocity = food.velocity * DRAG;
        }
    }

    fn eat_pellets(&mut self) {
        let pellets = &mut self.pellets;
        for cell in self.players.iter_mut().flat_map(|p| p.cells.iter_mut()) {
            let before = pellets.len();
            let (pos, r) = (cell.pos, cell.radius());
            pellets.retain(|p| p.distance(pos) >= r);
            cell.mass += (before - pellets.len()) as f32 * PELLET_MASS;
        }
    }

    fn eat_food(&mut self) {
        let food = &mut self.food;
        for cell in self.players.iter_mut().flat_map(|p| p.cells.iter_mut()) {
            if cell.mass < FOOD_MASS * EAT_MARGIN {
                continue;
            }
            let before = food.len();
            let (pos, r) = (cell.pos, cell.radius());
            food.retain(|f| f.pos.distance(pos) >= r);
            cell.mass += (before - food.len()) as f32 * FOOD_MASS;
        }
    }

    fn eat_viruses(&mut self, rng: &mut ChaCha20Rng) {
        for player in &mut self.players {
            let mut popped = Vec::new();
            for cell in &mut player.cells {
                if cell.mass < VIRUS_MASS * EAT_MARGIN {
                    continue;
                }
                let (pos, r) = (cell.pos, cell.radius());
                if let Some(i) = self.viruses.iter().position(|v| v.distance(pos) < r) {
                    self.viruses.swap_remove(i);
                    cell.mass += VIRUS_MASS;
                    popped.push(pos);
                }
            }
            for pos in popped {
                pop(player, pos, rng);
            }
        }
    }

    /// Larger cells swallow overlapping smaller cells of other players
    fn eat_cells(&mut self) {
        // (player, cell, pos, mass), heaviest first
        let mut cells: Vec<(usize, usize, Vec2, f32)> = self
            .players
            .iter()
            .enumerate()
            .flat_map(|(p, player)| {
                player
                    .cells
                    .iter()
                    .enumerate()
                    .map(move |(c, cell)| (p, c, cell.pos, cell.mass))
            })
            .collect();
        cells.sort_by(|a, b| b.3.total_cmp(&a.3));

        let mut eaten = vec![false; cells.len()];
        let mut gains = vec![0.0f32; cells.len()];
        for i in 0..cells.len() {
            if eaten[i] {
                continue;
            }
            let (p, _, pos, mass) = cells[i];
            let reach = radius(mass);
            for j in (i + 1)..cells.len() {
                let (q, _, other_pos, other_mass) = cells[j];
                if eaten[j] || p == q || mass <= other_mass * EAT_MARGIN {
                    continue;
                }
                if pos.distance(other_pos) < reach {
                    eaten[j] = true;
                    gains[i] += other_mass;
                }
            }
        }

        for (k, &(p, c, _, _)) in cells.iter().enumerate() {
            self.players[p].cells[c].mass += gains[k];
        }
        let mut removed: Vec<(usize, usize)> = cells
            .iter()
            .zip(&eaten)
            .filter(|(_, e)| **e)
            .map(|(&(p, c, _, _), _)| (p, c))
            .collect();
        // remove back to front so indices stay valid
        removed.sort_by(|a, b| b.cmp(a));
        for (p, c) in removed {
            self.players[p].cells.swap_remove(c);
        }
    }

    fn recombine(&mut self) {
        for player in &mut self.players {
            let mut i = 0;
            while i < player.cells.len() {
                let mut j = i + 1;
                while j < player.cells.len() {
                    let (a, b) = (&player.cells[i], &player.cells[j]);
                    let ready = a.recombine == 0 && b.recombine == 0;
                    if ready && a.pos.distance(b.pos) < a.radius().max(b.radius()) {
                        let absorbed = player.cells.swap_remove(j);
                        player.cells[i].mass += absorbed.mass;
                    } else {
                        j += 1;
                    }
                }
                i += 1;
            }
        }
    }

    fn decay(&mut self) {
        for cell in self.players.iter_mut().flat_map(|p| p.cells.iter_mut()) {
            if cell.mass > START_MASS {
                cell.mass -= (cell.mass - START_MASS) * DECAY_RATE * TICK_DT;
            }
        }
    }

    fn replenish(&mut self, rng: &mut ChaCha20Rng) {
        if self.pellet_regen {
            while self.pellets.len() < self.num_pellets {
                let p = self.random_point(rng);
                self.pellets.push(p);
            }
        }
        while self.viruses.len() < self.num_viruses {
            let p = self.random_point(rng);
            self.viruses.push(p);
        }
    }
}

fn split_speed(mass: f32) -> f32 {
    (3.0 * max_speed(mass).powf(1.2)).clamp(20.0, 130.0)
}

/// Halve every cell heavy enough, launching the new half toward the target
fn split(player: &mut Player) {
    let target = player.target;
    let existing = player.cells.len();
    let mut created = Vec::new();
    for cell in &mut player.cells {
        if existing + created.len() >= CELL_LIMIT {
            break;
        }
        if cell.mass < MIN_ACTION_MASS {
            continue;
        }
        let half = cell.mass / 2.0;
        cell.mass -= half;
        cell.recombine = RECOMBINE_TICKS;

        let dir = (target - cell.pos).normed();
        let mut piece = Cell::new(cell.pos + dir * cell.radius(), half);
        piece.velocity = dir * split_speed(half);
        piece.recombine = RECOMBINE_TICKS;
        created.push(piece);
    }
    player.cells.extend(created);
}

/// Eject a food pellet from every cell heavy enough
fn feed(player: &mut Player, rng: &mut ChaCha20Rng) -> Vec<Food> {
    let target = player.target;
    let mut ejected = Vec::new();
    for cell in player.cells.iter_mut().filter(|c| c.mass >= MIN_ACTION_MASS) {
        cell.mass -= FEED_COST;
        let mut dir = (target - cell.pos).normed();
        if dir == Vec2::ZERO {
            dir = Vec2::from_angle(rng.gen_range(0.0..TAU));
        }
        ejected.push(Food {
            pos: cell.pos + dir * (cell.radius() + radius(FOOD_MASS)),
            velocity: dir * FOOD_SPEED,
        });
    }
    ejected
}

/// Burst the cell at `pos` into equal pieces flying apart
fn pop(player: &mut Player, pos: Vec2, rng: &mut ChaCha20Rng) {
    let Some(index) = player.cells.iter().position(|c| c.pos == pos) else {
        return;
    };
    let room = CELL_LIMIT.saturating_sub(player.cells.len());
    let pieces = POP_PIECES.min(room + 1);
    if pieces < 2 {
        return;
    }

    let cell = &mut player.cells[index];
    let share = cell.mass / pieces as f32;
    cell.mass = share;
    cell.recombine = RECOMBINE_TICKS;
    let origin = cell.pos;

    let offset = rng.gen_range(0.0..TAU);
    for k in 1..pieces {
        let theta = offset + k as f32 * TAU / pieces as f32;
        let dir = Vec2::from_angle(theta);
        let mut piece = Cell::new(origin + dir * radius(share), share);
        piece.velocity = dir * split_speed(share);
        piece.recombine = RECOMBINE_TICKS;
        player.cells.push(piece);
    }
}
