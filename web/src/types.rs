//! Request and response types for the game API.

use serde::{Deserialize, Serialize};

/// Who plays a colour in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiAssignment {
    #[default]
    Human,
    Random,
    Greedy,
    Rulebased,
    Ntuple,
    Mcts,
}

impl AiAssignment {
    pub fn name(self) -> &'static str {
        match self {
            AiAssignment::Human => "human",
            AiAssignment::Random => "random",
            AiAssignment::Greedy => "greedy",
            AiAssignment::Rulebased => "rulebased",
            AiAssignment::Ntuple => "ntuple",
            AiAssignment::Mcts => "mcts",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewGameRequest {
    #[serde(default)]
    pub black: AiAssignment,
    #[serde(default)]
    pub white: AiAssignment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveRequest {
    /// A move literal such as `b1,b2` or `b1,b2 c3g`
    #[serde(rename = "move")]
    pub mv: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieceDto {
    pub x: u8,
    pub y: u8,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TileDto {
    pub x: u8,
    pub y: u8,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockDto {
    pub black: u8,
    pub gray: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiDto {
    pub black: String,
    pub white: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameStateResponse {
    pub session_id: String,
    pub current_player: String,
    pub status: String,
    pub pieces: Vec<PieceDto>,
    pub tiles: Vec<TileDto>,
    pub black_stock: StockDto,
    pub white_stock: StockDto,
    pub last_move: Option<String>,
    pub ai: AiDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovesResponse {
    pub moves: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveResponse {
    pub applied: String,
    pub state: GameStateResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardArrayResponse {
    pub array: Vec<u8>,
    pub to_move: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
