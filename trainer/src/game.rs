//! One training game between the learner and the opponent.

use rand_chacha::ChaCha20Rng;

use contrast_ai::epsilon_greedy_move;
use contrast_core::{rules, GameState, Player};

use crate::shared::{Opponent, SharedNetwork};

/// Trajectory of a finished game: every position before a move was chosen
/// (terminal position included), the outcome, and which colour the learner
/// held.
pub struct GameRecord {
    pub states: Vec<GameState>,
    /// `Player::None` marks a draw (turn cap reached).
    pub winner: Player,
    pub moves: u32,
    pub learner_was_black: bool,
}

/// Play a single game to termination or the turn cap.
///
/// The learner picks epsilon-greedy against the shared network (reads take
/// the learner lock per evaluation); the opponent plays its own policy
/// greedily. `start_player` overrides who moves first so both sides see both
/// openings across the run.
pub fn play_training_game(
    learner: &SharedNetwork,
    opponent: &Opponent,
    learner_is_black: bool,
    epsilon: f32,
    start_player: Player,
    turn_cap: u32,
    rng: &mut ChaCha20Rng,
) -> GameRecord {
    let mut state = GameState::new();
    state.to_move = start_player;

    let mut states = Vec::new();
    let mut moves_played = 0u32;

    while moves_played < turn_cap {
        states.push(state);

        let legal = rules::legal_moves(&state);
        if legal.is_empty() {
            return GameRecord {
                states,
                winner: state.to_move.opponent(),
                moves: moves_played,
                learner_was_black: learner_is_black,
            };
        }
        if rules::is_win(&state, Player::Black) {
            return GameRecord {
                states,
                winner: Player::Black,
                moves: moves_played,
                learner_was_black: learner_is_black,
            };
        }
        if rules::is_win(&state, Player::White) {
            return GameRecord {
                states,
                winner: Player::White,
                moves: moves_played,
                learner_was_black: learner_is_black,
            };
        }

        let mover_is_learner = (state.to_move == Player::Black) == learner_is_black;
        let chosen = if mover_is_learner {
            epsilon_greedy_move(&state, learner, epsilon, rng)
        } else {
            opponent.pick(&state, rng)
        };

        match chosen {
            Some(mv) => state.apply_move(&mv),
            // Unreachable given the emptiness check above
            None => break,
        }
        moves_played += 1;
    }

    GameRecord {
        states,
        winner: Player::None,
        moves: moves_played,
        learner_was_black: learner_is_black,
    }
}
