//! Head-to-head match runner.
//!
//! Pits a trained network against a baseline policy over a batch of games
//! and reports wins per side, draws and average game length. With
//! `--swap-colors` the network alternates between Black and White so
//! first-mover advantage washes out of the comparison.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use contrast_ai::{
    GreedyPolicy, MctsPolicy, NTupleNetwork, Policy, RandomPolicy, RuleBasedPolicy, ValuePolicy,
};
use contrast_core::{rules, GameState, Player};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum BaselineKind {
    Random,
    Greedy,
    Rulebased,
    Mcts,
}

#[derive(Parser, Debug)]
#[command(name = "contrast-arena")]
#[command(about = "Evaluate a Contrast network against a baseline policy", long_about = None)]
struct Config {
    /// Weight file for the network under evaluation (omit for an untrained
    /// network)
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Number of evaluation games
    #[arg(long, default_value_t = 100)]
    games: u32,

    /// Baseline opponent
    #[arg(long, value_enum, default_value = "greedy")]
    opponent: BaselineKind,

    /// Alternate which side the network plays each game
    #[arg(long, default_value_t = false)]
    swap_colors: bool,

    /// MCTS iterations per move when the opponent is mcts
    #[arg(long, default_value_t = 400)]
    mcts_iterations: u32,

    /// Move cap per game; a capped game counts as a draw
    #[arg(long, default_value_t = 500)]
    turns: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Default)]
struct MatchStats {
    network_wins: u32,
    baseline_wins: u32,
    draws: u32,
    total_moves: u64,
}

impl MatchStats {
    fn record(&mut self, winner: Player, network_side: Player, moves: u32) {
        self.total_moves += moves as u64;
        if winner == Player::None {
            self.draws += 1;
        } else if winner == network_side {
            self.network_wins += 1;
        } else {
            self.baseline_wins += 1;
        }
    }

    fn games(&self) -> u32 {
        self.network_wins + self.baseline_wins + self.draws
    }

    fn network_rate(&self) -> f32 {
        let decided = self.network_wins + self.baseline_wins;
        if decided == 0 {
            0.0
        } else {
            self.network_wins as f32 / decided as f32
        }
    }

    fn average_moves(&self) -> f32 {
        if self.games() == 0 {
            0.0
        } else {
            self.total_moves as f32 / self.games() as f32
        }
    }
}

fn make_baseline(kind: BaselineKind, network: &NTupleNetwork, iterations: u32) -> Box<dyn Policy> {
    match kind {
        BaselineKind::Random => Box::new(RandomPolicy::new()),
        BaselineKind::Greedy => Box::new(GreedyPolicy::new()),
        BaselineKind::Rulebased => Box::new(RuleBasedPolicy::new()),
        BaselineKind::Mcts => Box::new(MctsPolicy::new(network.clone(), iterations)),
    }
}

/// Play one game; returns the winner and the number of moves.
fn play_game<'a>(
    black: &'a mut dyn Policy,
    white: &'a mut dyn Policy,
    turn_cap: u32,
) -> (Player, u32) {
    let mut state = GameState::new();
    let mut moves_played = 0u32;

    while moves_played < turn_cap {
        if rules::is_win(&state, Player::Black) {
            return (Player::Black, moves_played);
        }
        if rules::is_win(&state, Player::White) {
            return (Player::White, moves_played);
        }

        let policy = if state.to_move == Player::Black {
            &mut *black
        } else {
            &mut *white
        };
        match policy.pick(&state) {
            Some(mv) => state.apply_move(&mv),
            None => return (state.to_move.opponent(), moves_played),
        }
        moves_played += 1;
    }

    (Player::None, moves_played)
}

fn main() -> Result<()> {
    let config = Config::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut network = NTupleNetwork::new();
    match &config.weights {
        Some(path) => {
            network
                .load(path)
                .with_context(|| format!("loading weights from {}", path.display()))?;
            info!(path = %path.display(), weights = network.num_weights(), "network loaded");
        }
        None => info!("no weight file given, evaluating an untrained network"),
    }

    info!(
        games = config.games,
        opponent = ?config.opponent,
        swap_colors = config.swap_colors,
        "match starting"
    );

    let mut stats = MatchStats::default();
    for game in 0..config.games {
        let network_side = if config.swap_colors && game % 2 == 1 {
            Player::White
        } else {
            Player::Black
        };

        let mut candidate: Box<dyn Policy> = Box::new(ValuePolicy::new(network.clone(), 0.0));
        let mut baseline = make_baseline(config.opponent, &network, config.mcts_iterations);

        let (winner, moves) = if network_side == Player::Black {
            play_game(&mut *candidate, &mut *baseline, config.turns)
        } else {
            play_game(&mut *baseline, &mut *candidate, config.turns)
        };

        stats.record(winner, network_side, moves);
        debug!(
            game = game + 1,
            winner = ?winner,
            network_side = ?network_side,
            moves,
            "game finished"
        );
    }

    info!(
        games = stats.games(),
        network_wins = stats.network_wins,
        baseline_wins = stats.baseline_wins,
        draws = stats.draws,
        network_rate = format!("{:.1}%", stats.network_rate() * 100.0),
        avg_moves = format!("{:.1}", stats.average_moves()),
        "match finished"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_game_reaches_a_result() {
        let mut black = GreedyPolicy::seeded(1);
        let mut white = GreedyPolicy::seeded(2);
        let (winner, moves) = play_game(&mut black, &mut white, 500);

        assert!(moves > 0);
        assert_ne!(winner, Player::None);
    }

    #[test]
    fn turn_cap_produces_a_draw() {
        let mut black = RandomPolicy::seeded(3);
        let mut white = RandomPolicy::seeded(4);
        let (winner, moves) = play_game(&mut black, &mut white, 1);

        assert_eq!(moves, 1);
        assert_eq!(winner, Player::None);
    }

    #[test]
    fn stats_attribute_wins_to_the_right_side() {
        let mut stats = MatchStats::default();
        stats.record(Player::Black, Player::Black, 20);
        stats.record(Player::Black, Player::White, 30);
        stats.record(Player::None, Player::Black, 10);

        assert_eq!(stats.network_wins, 1);
        assert_eq!(stats.baseline_wins, 1);
        assert_eq!(stats.draws, 1);
        assert!((stats.network_rate() - 0.5).abs() < 1e-6);
        assert!((stats.average_moves() - 20.0).abs() < 1e-6);
    }
}
