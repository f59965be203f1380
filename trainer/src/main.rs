//! Contrast self-play trainer.
//!
//! Plays training games on a pool of worker threads, applies TD(0) updates
//! on a single updater thread and writes weight checkpoints along the way.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod game;
mod queue;
mod shared;
mod stats;
mod trainer;

use crate::config::Config;
use crate::trainer::Trainer;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;
    init_tracing(&config.log_level);

    let output = config.output.clone();
    let trainer = Trainer::new(config)?;
    let summary = trainer.run()?;

    trainer
        .learner()
        .save(&output)
        .with_context(|| format!("saving final weights to {}", output.display()))?;
    info!(
        path = %output.display(),
        games = summary.games,
        learner_wins = summary.learner_wins,
        opponent_wins = summary.opponent_wins,
        draws = summary.draws,
        "final weights saved"
    );

    Ok(())
}
