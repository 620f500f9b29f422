//! Run statistics tracking and persistence.
//!
//! Tracks episode counts, lengths, rewards and throughput for a run. Stats
//! are written to a JSON file after every episode.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeEnd {
    /// Every agent reported done
    Done,
    /// The runner's own step limit cut the episode short
    StepLimit,
}

/// Summary of one finished episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeOutcome {
    pub steps: u64,
    /// Sum over steps of the mean reward across agents
    pub reward: f64,
    pub end: EpisodeEnd,
    pub duration: Duration,
}

/// Aggregated run statistics
#[derive(Debug)]
pub struct ActorStats {
    episodes_completed: u32,
    total_steps: u64,
    done_episodes: u32,
    step_limit_episodes: u32,
    total_reward: f64,
    best_episode_reward: Option<f64>,
    /// Time spent inside episodes, excluding setup and I/O
    stepping_time: Duration,
    start_time: Instant,
    stats_path: PathBuf,
    observation: String,
}

/// Serializable stats for JSON output.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActorStatsSnapshot {
    pub observation: String,
    pub episodes_completed: u32,
    pub total_steps: u64,
    pub done_episodes: u32,
    pub step_limit_episodes: u32,
    pub avg_episode_length: f64,
    pub avg_episode_reward: f64,
    pub best_episode_reward: f64,
    pub steps_per_second: f64,
    pub runtime_seconds: f64,
    pub timestamp: u64,
}

impl ActorStats {
    /// Create new stats tracker writing to `stats_path`.
    pub fn new(stats_path: impl Into<PathBuf>, observation: &str) -> Self {
        let stats_path = stats_path.into();

        // Ensure data directory exists
        if let Some(dir) = stats_path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!("Failed to create data directory: {}", e);
            }
        }

        Self {
            episodes_completed: 0,
            total_steps: 0,
            done_episodes: 0,
            step_limit_episodes: 0,
            total_reward: 0.0,
            best_episode_reward: None,
            stepping_time: Duration::ZERO,
            start_time: Instant::now(),
            stats_path,
            observation: observation.to_string(),
        }
    }

    /// Record a completed episode.
    pub fn record_episode(&mut self, outcome: &EpisodeOutcome) {
        self.episodes_completed += 1;
        self.total_steps += outcome.steps;
        self.total_reward += outcome.reward;
        self.stepping_time += outcome.duration;
        self.best_episode_reward = Some(
            self.best_episode_reward
                .map_or(outcome.reward, |best| best.max(outcome.reward)),
        );

        match outcome.end {
            EpisodeEnd::Done => self.done_episodes += 1,
            EpisodeEnd::StepLimit => self.step_limit_episodes += 1,
        }
    }

    /// Get a snapshot of current stats.
    pub fn snapshot(&self) -> ActorStatsSnapshot {
        let episodes = self.episodes_completed;
        let stepping = self.stepping_time.as_secs_f64();

        let (avg_episode_length, avg_episode_reward) = if episodes > 0 {
            (
                self.total_steps as f64 / episodes as f64,
                self.total_reward / episodes as f64,
            )
        } else {
            (0.0, 0.0)
        };

        let steps_per_second = if stepping > 0.0 {
            self.total_steps as f64 / stepping
        } else {
            0.0
        };

        ActorStatsSnapshot {
            observation: self.observation.clone(),
            episodes_completed: episodes,
            total_steps: self.total_steps,
            done_episodes: self.done_episodes,
            step_limit_episodes: self.step_limit_episodes,
            avg_episode_length,
            avg_episode_reward,
            best_episode_reward: self.best_episode_reward.unwrap_or(0.0),
            steps_per_second,
            runtime_seconds: self.start_time.elapsed().as_secs_f64(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Write stats to JSON file (atomic write-then-rename).
    pub fn write_stats(&self) {
        let snapshot = self.snapshot();

        let json = match serde_json::to_string_pretty(&snapshot) {
            Ok(j) => j,
            Err(e) => {
                warn!("Failed to serialize actor stats: {}", e);
                return;
            }
        };

        // Write to temp file then rename (atomic on most filesystems)
        let temp_path = self.stats_path.with_extension("json.tmp");
        match fs::File::create(&temp_path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(json.as_bytes()) {
                    warn!("Failed to write actor stats: {}", e);
                    return;
                }
            }
            Err(e) => {
                warn!("Failed to create temp stats file: {}", e);
                return;
            }
        }

        if let Err(e) = fs::rename(&temp_path, &self.stats_path) {
            warn!("Failed to rename stats file: {}", e);
            let _ = fs::remove_file(&temp_path);
            return;
        }

        debug!("Wrote actor stats to {}", self.stats_path.display());
    }

    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }
}
