//! Game session management.
//!
//! A session pairs a `GameState` with the AI assignment for each colour.
//! Moves arrive as literals, are validated field-by-field against the legal
//! list and rejected without touching the state when they do not match.

use std::sync::Arc;

use thiserror::Error;

use contrast_ai::{
    GreedyPolicy, MctsPolicy, NTupleNetwork, Policy, RandomPolicy, RuleBasedPolicy, ValuePolicy,
};
use contrast_core::{codec, rules, CodecError, GameState, Move, Player};

use crate::types::{
    AiAssignment, AiDto, GameStateResponse, PieceDto, StockDto, TileDto,
};

/// MCTS iterations per move for web play; modest so responses stay snappy.
const MCTS_ITERATIONS: u32 = 300;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error(transparent)]
    Parse(#[from] CodecError),

    #[error("game is over")]
    GameOver,

    #[error("no AI assigned to {0}")]
    NoAi(&'static str),
}

pub struct GameSession {
    pub id: String,
    state: GameState,
    history: Vec<Move>,
    black_ai: AiAssignment,
    white_ai: AiAssignment,
    black_policy: Option<Box<dyn Policy>>,
    white_policy: Option<Box<dyn Policy>>,
}

impl GameSession {
    pub fn new(
        id: String,
        black: AiAssignment,
        white: AiAssignment,
        network: &Arc<NTupleNetwork>,
    ) -> GameSession {
        GameSession {
            id,
            state: GameState::new(),
            history: Vec::new(),
            black_ai: black,
            white_ai: white,
            black_policy: build_policy(black, network),
            white_policy: build_policy(white, network),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.history.last()
    }

    /// Session status string: `in_progress`, `black_wins` or `white_wins`.
    pub fn status(&self) -> &'static str {
        if rules::is_win(&self.state, Player::Black) {
            return "black_wins";
        }
        if rules::is_win(&self.state, Player::White) {
            return "white_wins";
        }
        if !rules::has_any_move(&self.state) {
            return match self.state.to_move {
                Player::White => "black_wins",
                _ => "white_wins",
            };
        }
        "in_progress"
    }

    pub fn is_over(&self) -> bool {
        self.status() != "in_progress"
    }

    /// Parse and apply a move literal.
    pub fn apply_literal(&mut self, text: &str) -> Result<Move, SessionError> {
        let mv = codec::parse_move(text)?;
        self.apply_move(mv)?;
        Ok(mv)
    }

    /// Apply a move after validating it is exactly one of the legal moves.
    pub fn apply_move(&mut self, mv: Move) -> Result<(), SessionError> {
        if self.is_over() {
            return Err(SessionError::GameOver);
        }
        if !rules::legal_moves(&self.state).contains(&mv) {
            return Err(SessionError::IllegalMove(codec::format_move(&mv)));
        }
        self.state.apply_move(&mv);
        self.history.push(mv);
        Ok(())
    }

    /// Let the AI assigned to the side to move pick and play.
    pub fn ai_move(&mut self) -> Result<Move, SessionError> {
        if self.is_over() {
            return Err(SessionError::GameOver);
        }

        let (policy, side) = match self.state.to_move {
            Player::White => (&mut self.white_policy, "white"),
            _ => (&mut self.black_policy, "black"),
        };
        let policy = policy.as_mut().ok_or(SessionError::NoAi(side))?;

        let mv = policy
            .pick(&self.state)
            .ok_or(SessionError::GameOver)?;
        // AI picks come straight from the legal list
        self.state.apply_move(&mv);
        self.history.push(mv);
        Ok(mv)
    }

    pub fn reset(&mut self) {
        self.state = GameState::new();
        self.history.clear();
    }

    pub fn legal_literals(&self) -> Vec<String> {
        if self.is_over() {
            return Vec::new();
        }
        rules::legal_moves(&self.state)
            .iter()
            .map(codec::format_move)
            .collect()
    }

    pub fn board_text(&self) -> String {
        codec::board_text(&self.state)
    }

    pub fn board_array(&self) -> Vec<u8> {
        codec::encode_state(&self.state).to_vec()
    }

    pub fn to_response(&self) -> GameStateResponse {
        let mut pieces = Vec::new();
        let mut tiles = Vec::new();
        for y in 0..contrast_core::BOARD_H {
            for x in 0..contrast_core::BOARD_W {
                let cell = self.state.board.at(x, y);
                match cell.occupant {
                    Player::Black => pieces.push(PieceDto {
                        x: x as u8,
                        y: y as u8,
                        color: "black".into(),
                    }),
                    Player::White => pieces.push(PieceDto {
                        x: x as u8,
                        y: y as u8,
                        color: "white".into(),
                    }),
                    Player::None => {}
                }
                match cell.tile {
                    contrast_core::TileType::Black => tiles.push(TileDto {
                        x: x as u8,
                        y: y as u8,
                        kind: "black".into(),
                    }),
                    contrast_core::TileType::Gray => tiles.push(TileDto {
                        x: x as u8,
                        y: y as u8,
                        kind: "gray".into(),
                    }),
                    contrast_core::TileType::None => {}
                }
            }
        }

        let black_inv = self.state.inventory(Player::Black);
        let white_inv = self.state.inventory(Player::White);

        GameStateResponse {
            session_id: self.id.clone(),
            current_player: match self.state.to_move {
                Player::White => "white".into(),
                _ => "black".into(),
            },
            status: self.status().into(),
            pieces,
            tiles,
            black_stock: StockDto {
                black: black_inv.black,
                gray: black_inv.gray,
            },
            white_stock: StockDto {
                black: white_inv.black,
                gray: white_inv.gray,
            },
            last_move: self.history.last().map(codec::format_move),
            ai: AiDto {
                black: self.black_ai.name().into(),
                white: self.white_ai.name().into(),
            },
        }
    }
}

fn build_policy(kind: AiAssignment, network: &Arc<NTupleNetwork>) -> Option<Box<dyn Policy>> {
    match kind {
        AiAssignment::Human => None,
        AiAssignment::Random => Some(Box::new(RandomPolicy::new())),
        AiAssignment::Greedy => Some(Box::new(GreedyPolicy::new())),
        AiAssignment::Rulebased => Some(Box::new(RuleBasedPolicy::new())),
        AiAssignment::Ntuple => Some(Box::new(ValuePolicy::new(Arc::clone(network), 0.0))),
        AiAssignment::Mcts => Some(Box::new(MctsPolicy::new(
            Arc::clone(network),
            MCTS_ITERATIONS,
        ))),
    }
}
