//! The training pipeline: a pool of game-playing workers feeding one
//! updater thread through a bounded queue.
//!
//! Workers claim game numbers from an atomic counter, load the learner and
//! opponent handles once per game and push finished trajectories. The
//! updater applies TD updates in pop order, tracks statistics, writes
//! checkpoints, swaps the learner's colour on a fixed cadence and advances
//! the curriculum on sustained rolling win rate.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info, warn};

use contrast_ai::NTupleNetwork;
use contrast_core::Player;

use crate::config::{Config, OpponentChoice};
use crate::game::{play_training_game, GameRecord};
use crate::queue::BoundedQueue;
use crate::shared::{Opponent, OpponentSlot, SharedNetwork};
use crate::stats::TrainingStats;

/// Inverse-square learning-rate decay over training progress `p` in [0, 1].
pub fn learning_rate(progress: f32, lr_max: f32, lr_min: f32) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    lr_min + (lr_max - lr_min) / (1.0 + 19.0 * p * p)
}

/// Curriculum stage, promoted greedy -> rule-based -> self-play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Greedy,
    RuleBased,
    SelfPlay,
}

impl Stage {
    fn from_choice(choice: OpponentChoice) -> Stage {
        match choice {
            OpponentChoice::Greedy => Stage::Greedy,
            OpponentChoice::Rulebased => Stage::RuleBased,
            OpponentChoice::SelfPlay => Stage::SelfPlay,
        }
    }

    fn next(self) -> Stage {
        match self {
            Stage::Greedy => Stage::RuleBased,
            Stage::RuleBased | Stage::SelfPlay => Stage::SelfPlay,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Stage::Greedy => "greedy",
            Stage::RuleBased => "rulebased",
            Stage::SelfPlay => "self",
        }
    }
}

/// Final counters returned by [`Trainer::run`].
#[derive(Debug)]
pub struct TrainingSummary {
    pub games: u32,
    pub learner_wins: u32,
    pub opponent_wins: u32,
    pub draws: u32,
    pub average_moves: f32,
}

pub struct Trainer {
    config: Config,
    learner: SharedNetwork,
    opponent: OpponentSlot,
    queue: BoundedQueue<GameRecord>,
    games_claimed: AtomicU32,
    learner_is_black: AtomicBool,
    stop: Arc<AtomicBool>,
}

impl Trainer {
    pub fn new(config: Config) -> Result<Trainer> {
        let mut network = NTupleNetwork::new();
        if let Some(path) = &config.load {
            network
                .load(path)
                .with_context(|| format!("loading weights from {}", path.display()))?;
            info!(path = %path.display(), weights = network.num_weights(), "loaded starting weights");
        }

        let initial_opponent = match Stage::from_choice(config.opponent) {
            Stage::Greedy => Opponent::Greedy,
            Stage::RuleBased => Opponent::RuleBased,
            Stage::SelfPlay => Opponent::Snapshot(network.clone()),
        };

        Ok(Trainer {
            learner: SharedNetwork::new(network),
            opponent: OpponentSlot::new(initial_opponent),
            queue: BoundedQueue::new(config.queue_capacity),
            games_claimed: AtomicU32::new(0),
            learner_is_black: AtomicBool::new(true),
            stop: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Flag that makes workers stop claiming games; the updater exits once
    /// the queue drains.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn learner(&self) -> &SharedNetwork {
        &self.learner
    }

    /// Run the full pipeline to completion and return the final counters.
    pub fn run(&self) -> Result<TrainingSummary> {
        info!(
            games = self.config.games,
            threads = self.config.threads,
            epsilon = self.config.epsilon,
            opponent = Stage::from_choice(self.config.opponent).name(),
            swap_interval = self.config.swap_interval,
            save_interval = self.config.save_interval,
            "training starting"
        );

        thread::scope(|scope| {
            let updater = scope.spawn(|| self.updater_loop());

            let workers: Vec<_> = (0..self.config.threads)
                .map(|id| scope.spawn(move || self.worker_loop(id)))
                .collect();
            for worker in workers {
                worker
                    .join()
                    .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;
            }
            debug!("all workers finished, draining queue");
            self.queue.set_done();

            updater
                .join()
                .map_err(|_| anyhow::anyhow!("updater thread panicked"))?
        })
    }

    fn worker_loop(&self, worker_id: u32) {
        let mut rng = ChaCha20Rng::from_entropy();
        debug!(worker_id, "worker started");
        let mut played = 0u32;

        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            let game_number = self.games_claimed.fetch_add(1, Ordering::Relaxed);
            if game_number >= self.config.games {
                break;
            }

            // Handles are read once per game; a promotion or colour swap
            // lands on the next game, never mid-game.
            let opponent = self.opponent.load();
            let learner_is_black = self.learner_is_black.load(Ordering::Relaxed);

            // Alternate the first mover by game parity
            let start_player = if (game_number + 1) % 2 == 1 {
                Player::White
            } else {
                Player::Black
            };

            let record = play_training_game(
                &self.learner,
                &opponent,
                learner_is_black,
                self.config.epsilon,
                start_player,
                self.config.turns,
                &mut rng,
            );

            if !self.queue.push(record) {
                break;
            }
            played += 1;
        }

        debug!(worker_id, played, "worker finished");
    }

    fn updater_loop(&self) -> Result<TrainingSummary> {
        let mut stats = TrainingStats::new(self.config.eval_window);
        let mut stage = Stage::from_choice(self.config.opponent);
        let mut last_swap_game = 0u32;
        let mut games_since_promotion = 0u32;

        let progress = if std::io::stderr().is_terminal() {
            let bar = ProgressBar::new(self.config.games as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} games ({eta})")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            Some(bar)
        } else {
            None
        };

        while let Some(record) = self.queue.pop() {
            let current_game = stats.games + 1;

            let progress_frac = if self.config.games > 1 {
                (current_game - 1) as f32 / (self.config.games - 1) as f32
            } else {
                1.0
            };
            let lr = learning_rate(progress_frac, self.config.lr, self.config.lr_min());

            self.apply_td_updates(&record, stage, lr);

            stats.record(&record);
            games_since_promotion += 1;
            if let Some(bar) = &progress {
                bar.inc(1);
            }

            if current_game % 100 == 0 {
                let log = || {
                    info!(
                        game = current_game,
                        total = self.config.games,
                        rolling_rate = format!("{:.1}%", stats.rolling_rate() * 100.0),
                        learner_rate = format!("{:.1}%", stats.learner_rate() * 100.0),
                        draws = stats.draws,
                        lr = format!("{lr:.4}"),
                        avg_moves = format!("{:.1}", stats.average_moves()),
                        queue = self.queue.len(),
                        learner_colour = if self.learner_is_black.load(Ordering::Relaxed) {
                            "black"
                        } else {
                            "white"
                        },
                        stage = stage.name(),
                        "progress"
                    );
                };
                match &progress {
                    Some(bar) => bar.suspend(log),
                    None => log(),
                }
            }

            // Colour swap on its own cadence, independent of curriculum and
            // checkpoints
            if self.config.swap_interval > 0
                && current_game - last_swap_game >= self.config.swap_interval
            {
                let was_black = self.learner_is_black.load(Ordering::Relaxed);
                self.learner_is_black.store(!was_black, Ordering::Relaxed);
                last_swap_game = current_game;
                info!(
                    game = current_game,
                    learner_colour = if was_black { "white" } else { "black" },
                    "swapped learner colour"
                );
            }

            // Curriculum: after the bootstrap, promote on sustained rolling
            // win rate over a full window
            if current_game > self.config.initial
                && stats.window_full()
                && games_since_promotion >= self.config.eval_window as u32
                && stats.rolling_rate() > self.config.promotion_threshold
            {
                let next = stage.next();
                let rate = stats.rolling_rate();
                match next {
                    Stage::Greedy => {}
                    Stage::RuleBased => self.opponent.replace(Opponent::RuleBased),
                    Stage::SelfPlay => self
                        .opponent
                        .replace(Opponent::Snapshot(self.learner.snapshot())),
                }
                info!(
                    game = current_game,
                    rolling_rate = format!("{:.1}%", rate * 100.0),
                    from = stage.name(),
                    to = next.name(),
                    "curriculum promotion"
                );
                stage = next;
                stats.reset_window();
                games_since_promotion = 0;
            }

            if self.config.save_interval > 0 && current_game % self.config.save_interval == 0 {
                if let Err(error) = self.write_checkpoint(current_game) {
                    warn!(game = current_game, %error, "checkpoint failed");
                }
                // In self-play the snapshot follows the learner at every
                // checkpoint
                if stage == Stage::SelfPlay {
                    self.opponent
                        .replace(Opponent::Snapshot(self.learner.snapshot()));
                    debug!(game = current_game, "refreshed opponent snapshot");
                }
            }
        }

        if let Some(bar) = progress {
            bar.finish_and_clear();
        }

        info!(
            games = stats.games,
            learner_wins = stats.learner_wins,
            opponent_wins = stats.opponent_wins,
            draws = stats.draws,
            learner_rate = format!("{:.1}%", stats.learner_rate() * 100.0),
            avg_moves = format!("{:.1}", stats.average_moves()),
            "training finished"
        );

        Ok(TrainingSummary {
            games: stats.games,
            learner_wins: stats.learner_wins,
            opponent_wins: stats.opponent_wins,
            draws: stats.draws,
            average_moves: stats.average_moves(),
        })
    }

    /// TD targets are the terminal reward seen from each recorded state's
    /// mover. Against a fixed opponent only the learner's states train; in
    /// self-play both sides do.
    fn apply_td_updates(&self, record: &GameRecord, stage: Stage, lr: f32) {
        let learner_side = if record.learner_was_black {
            Player::Black
        } else {
            Player::White
        };

        for state in &record.states {
            if stage != Stage::SelfPlay && state.to_move != learner_side {
                continue;
            }
            let target = if record.winner == Player::None {
                0.0
            } else if record.winner == state.to_move {
                1.0
            } else {
                -1.0
            };
            self.learner.td_update(state, target, lr);
        }
    }

    fn write_checkpoint(&self, game: u32) -> Result<PathBuf> {
        let dir = self.config.checkpoint_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating checkpoint directory {}", dir.display()))?;

        let stem = self
            .config
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "contrast_weights.bin".to_string());
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = dir.join(format!("{stem}.{game}.{stamp}"));

        self.learner.save(&path)?;
        info!(game, path = %path.display(), "checkpoint saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn quick_config() -> Config {
        Config {
            games: 24,
            turns: 80,
            lr: 0.1,
            epsilon: 0.2,
            opponent: OpponentChoice::Greedy,
            threads: 2,
            save_interval: 0,
            output: PathBuf::from("unused.bin"),
            load: None,
            initial: 4,
            swap_interval: 10,
            eval_window: 4,
            promotion_threshold: 0.55,
            queue_capacity: 2,
            checkpoint_dir: None,
            log_level: "info".into(),
        }
    }

    #[test]
    fn schedule_decays_between_bounds() {
        let lr0 = learning_rate(0.0, 0.1, 0.005);
        let lr_mid = learning_rate(0.5, 0.1, 0.005);
        let lr1 = learning_rate(1.0, 0.1, 0.005);

        assert!((lr0 - 0.1).abs() < 1e-6);
        assert!(lr_mid < lr0 && lr_mid > lr1);
        // lr(1) = lr_min + (lr_max - lr_min) / 20
        assert!((lr1 - (0.005 + 0.095 / 20.0)).abs() < 1e-6);

        // Progress outside [0, 1] clamps
        assert_eq!(learning_rate(-1.0, 0.1, 0.005), lr0);
        assert_eq!(learning_rate(2.0, 0.1, 0.005), lr1);
    }

    #[test]
    fn stage_promotion_order() {
        assert_eq!(Stage::Greedy.next(), Stage::RuleBased);
        assert_eq!(Stage::RuleBased.next(), Stage::SelfPlay);
        assert_eq!(Stage::SelfPlay.next(), Stage::SelfPlay);
    }

    #[test]
    fn short_training_run_completes() {
        let trainer = Trainer::new(quick_config()).unwrap();
        let summary = trainer.run().unwrap();

        assert_eq!(summary.games, 24);
        assert_eq!(
            summary.learner_wins + summary.opponent_wins + summary.draws,
            24
        );
        // Training touched the network
        assert!(trainer.learner().num_weights() > 0);
    }

    #[test]
    fn stop_flag_ends_the_run_early() {
        let mut config = quick_config();
        config.games = 10_000;
        let trainer = Trainer::new(config).unwrap();
        trainer.stop_handle().store(true, Ordering::Relaxed);

        let summary = trainer.run().unwrap();
        assert!(summary.games < 10_000);
    }

    #[test]
    fn self_play_mode_starts_with_a_snapshot_opponent() {
        let mut config = quick_config();
        config.opponent = OpponentChoice::SelfPlay;
        config.games = 6;
        let trainer = Trainer::new(config).unwrap();

        assert!(trainer.opponent.load().is_snapshot());
        trainer.run().unwrap();
    }
}
