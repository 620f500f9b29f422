//! Episode runner driving the environment with a random policy

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use arena_sim::ArenaBackend;
use env_core::{make_env, Action, Actions, AgarioEnv, Command, Environment};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info};

use crate::config::Config;
use crate::stats::{ActorStats, EpisodeEnd, EpisodeOutcome};

/// Uniform movement in `[-1, 1]^2`, mostly no-ops with occasional split or feed
pub fn random_action(rng: &mut impl Rng) -> Action {
    let command = match rng.gen_range(0..20) {
        0 => Command::Split,
        1 => Command::Feed,
        _ => Command::Noop,
    };
    Action::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0), command)
}

fn random_actions(rng: &mut impl Rng, num_agents: usize, multi_agent: bool) -> Actions {
    if multi_agent {
        (0..num_agents)
            .map(|_| random_action(rng))
            .collect::<Vec<_>>()
            .into()
    } else {
        random_action(rng).into()
    }
}

pub struct Actor {
    config: Config,
    env: AgarioEnv,
    rng: ChaCha20Rng,
    stats: ActorStats,
}

impl Actor {
    pub fn new(config: Config) -> Result<Self> {
        let seed = config.seed();
        let backend = seed.map_or_else(ArenaBackend::new, ArenaBackend::with_seed);

        let mut env = make_env(&config.observation, &config.env_options(), &backend)
            .with_context(|| format!("Failed to create {} environment", config.observation))?;
        env.seed(seed)?;
        if config.record_video {
            env.enable_video_recorder();
        }

        let rng = match seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };

        info!(
            observation = %config.observation,
            agents = env.num_agents(),
            shape = ?env.observation_space().shape,
            seed = ?seed,
            "Actor initialized"
        );

        let stats = ActorStats::new(config.stats_path(), &config.observation);
        Ok(Self {
            config,
            env,
            rng,
            stats,
        })
    }

    /// Run all configured episodes, then write the video if recording
    ///
    /// Returns the path of the written video, if any.
    pub fn run(&mut self) -> Result<Option<PathBuf>> {
        info!(
            episodes = self.config.episodes,
            max_steps = self.config.max_steps,
            "Actor starting main loop"
        );

        // Progress bar only when stderr is a TTY
        let progress = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
            let pb = ProgressBar::new(u64::from(self.config.episodes));
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} episodes ({eta})")
                    .context("Invalid progress bar template")?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        for episode in 1..=self.config.episodes {
            let outcome = self
                .run_episode()
                .with_context(|| format!("Episode {episode} failed"))?;
            self.stats.record_episode(&outcome);
            self.stats.write_stats();
            debug!(
                episode,
                steps = outcome.steps,
                reward = outcome.reward,
                end = ?outcome.end,
                "Episode completed"
            );

            if let Some(ref pb) = progress {
                pb.inc(1);
            }

            if self.config.log_interval > 0 && episode % self.config.log_interval == 0 {
                let snapshot = self.stats.snapshot();
                let log = || {
                    info!(
                        "Completed {} episodes (avg reward {:.2}, avg length {:.1}, {:.0} steps/s)",
                        episode,
                        snapshot.avg_episode_reward,
                        snapshot.avg_episode_length,
                        snapshot.steps_per_second
                    )
                };
                // Suspend progress bar while logging to avoid visual glitches
                match progress {
                    Some(ref pb) => pb.suspend(log),
                    None => log(),
                }
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let video = if self.config.record_video {
            let path = self
                .env
                .generate_video(self.config.video_dir(), &self.config.video_name)
                .context("Failed to write episode video")?;
            info!(path = %path.display(), frames = self.env.recorder().len(), "Video written");
            Some(path)
        } else {
            None
        };

        let snapshot = self.stats.snapshot();
        info!(
            episodes = snapshot.episodes_completed,
            total_steps = snapshot.total_steps,
            steps_per_second = format!("{:.0}", snapshot.steps_per_second),
            best_reward = snapshot.best_episode_reward,
            stats = %self.stats.stats_path().display(),
            "Run complete"
        );

        self.env.close()?;
        Ok(video)
    }

    fn run_episode(&mut self) -> Result<EpisodeOutcome> {
        let start = Instant::now();
        self.env.reset()?;

        let num_agents = self.env.num_agents();
        let multi_agent = self.env.is_multi_agent();
        let mut reward = 0.0;
        let mut steps = 0;
        let mut end = EpisodeEnd::StepLimit;

        while steps < self.config.max_steps {
            let actions = random_actions(&mut self.rng, num_agents, multi_agent);
            let result = self.env.step(actions)?;
            steps += 1;

            let rewards = result.rewards.as_slice();
            reward += rewards.iter().sum::<f64>() / rewards.len() as f64;

            if result.all_done() {
                end = EpisodeEnd::Done;
                break;
            }
        }

        Ok(EpisodeOutcome {
            steps,
            reward,
            end,
            duration: start.elapsed(),
        })
    }
}
