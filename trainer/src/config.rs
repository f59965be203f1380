//! Trainer configuration.
//!
//! All knobs arrive on the command line; the checkpoint directory can also
//! come from `CONTRAST_CHECKPOINT_DIR`.

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// The opponent the learner starts against. The curriculum can promote it
/// from greedy through rule-based to self-play while training runs.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpponentChoice {
    Greedy,
    Rulebased,
    #[value(name = "self")]
    SelfPlay,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "contrast-trainer")]
#[command(about = "Contrast self-play trainer", long_about = None)]
pub struct Config {
    /// Number of training games
    #[arg(long, default_value_t = 100_000)]
    pub games: u32,

    /// Move cap per game; a capped game scores as a draw
    #[arg(long, default_value_t = 500)]
    pub turns: u32,

    /// Peak learning rate of the inverse-square decay schedule (the floor
    /// is lr / 20)
    #[arg(long, default_value_t = 0.1)]
    pub lr: f32,

    /// Learner exploration rate for epsilon-greedy move selection
    #[arg(long, default_value_t = 0.1)]
    pub epsilon: f32,

    /// Starting opponent
    #[arg(long, value_enum, default_value = "greedy")]
    pub opponent: OpponentChoice,

    /// Worker threads playing games
    #[arg(long, default_value_t = 4)]
    pub threads: u32,

    /// Checkpoint every N games (0 disables periodic checkpoints)
    #[arg(long, default_value_t = 10_000)]
    pub save_interval: u32,

    /// Weight file written when training finishes
    #[arg(long, default_value = "contrast_weights.bin")]
    pub output: PathBuf,

    /// Load existing weights before training
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// Bootstrap games before curriculum decisions are allowed
    #[arg(long, default_value_t = 1_000)]
    pub initial: u32,

    /// The learner's colour flips every N games
    #[arg(long, default_value_t = 10_000)]
    pub swap_interval: u32,

    /// Rolling window (in games) for the learner win rate
    #[arg(long, default_value_t = 1_000)]
    pub eval_window: usize,

    /// Rolling win rate above which the curriculum advances
    #[arg(long, default_value_t = 0.55)]
    pub promotion_threshold: f32,

    /// Finished games the queue holds before workers block
    #[arg(long, default_value_t = 256)]
    pub queue_capacity: usize,

    /// Directory for periodic checkpoints; defaults to the output file's
    /// directory
    #[arg(long, env = "CONTRAST_CHECKPOINT_DIR")]
    pub checkpoint_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.games == 0 {
            return Err(anyhow!("games must be greater than 0"));
        }
        if self.turns == 0 {
            return Err(anyhow!("turns must be greater than 0"));
        }
        if self.threads == 0 {
            return Err(anyhow!("threads must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(anyhow!("epsilon must be within [0, 1]"));
        }
        if self.lr <= 0.0 {
            return Err(anyhow!("lr must be positive"));
        }
        if self.eval_window == 0 {
            return Err(anyhow!("eval-window must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.promotion_threshold) {
            return Err(anyhow!("promotion-threshold must be within [0, 1]"));
        }
        if self.queue_capacity == 0 {
            return Err(anyhow!("queue-capacity must be greater than 0"));
        }
        Ok(())
    }

    /// Floor of the learning-rate schedule.
    pub fn lr_min(&self) -> f32 {
        self.lr / 20.0
    }

    /// Directory periodic checkpoints are written into.
    pub fn checkpoint_dir(&self) -> PathBuf {
        if let Some(dir) = &self.checkpoint_dir {
            return dir.clone();
        }
        self.output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            games: 100,
            turns: 500,
            lr: 0.1,
            epsilon: 0.1,
            opponent: OpponentChoice::Greedy,
            threads: 2,
            save_interval: 0,
            output: PathBuf::from("weights.bin"),
            load: None,
            initial: 10,
            swap_interval: 50,
            eval_window: 10,
            promotion_threshold: 0.55,
            queue_capacity: 8,
            checkpoint_dir: None,
            log_level: "info".into(),
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_threads() {
        let mut cfg = base_config();
        cfg.threads = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("threads"));
    }

    #[test]
    fn validate_rejects_bad_epsilon() {
        let mut cfg = base_config();
        cfg.epsilon = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn lr_min_tracks_lr() {
        let cfg = base_config();
        assert!((cfg.lr_min() - 0.005).abs() < 1e-9);
    }

    #[test]
    fn checkpoint_dir_defaults_to_output_parent() {
        let mut cfg = base_config();
        cfg.output = PathBuf::from("/tmp/ckpt/weights.bin");
        assert_eq!(cfg.checkpoint_dir(), PathBuf::from("/tmp/ckpt"));

        cfg.output = PathBuf::from("weights.bin");
        assert_eq!(cfg.checkpoint_dir(), PathBuf::from("."));

        cfg.checkpoint_dir = Some(PathBuf::from("/data"));
        assert_eq!(cfg.checkpoint_dir(), PathBuf::from("/data"));
    }
}
