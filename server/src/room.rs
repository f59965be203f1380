//! The shared game room: one board, two seats and any number of
//! spectators.
//!
//! X is Black, O is White. The first two connections take the free seats;
//! everyone else spectates. All outbound traffic is newline-framed ASCII:
//! `INFO`/`ERROR` lines plus a `STATE ... END` block carrying the full
//! snapshot.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;

use contrast_core::{codec, rules, GameState, Player, Square, TileType, BOARD_H, BOARD_W};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    X,
    O,
    Spectator,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::X => "X",
            Role::O => "O",
            Role::Spectator => "spectator",
        }
    }

    fn player(self) -> Player {
        match self {
            Role::X => Player::Black,
            Role::O => Player::White,
            Role::Spectator => Player::None,
        }
    }
}

fn symbol(player: Player) -> char {
    match player {
        Player::Black => 'X',
        Player::White => 'O',
        Player::None => '?',
    }
}

struct Client {
    role: Role,
    name: String,
    sender: UnboundedSender<String>,
}

pub struct Room {
    state: GameState,
    last_move: Option<String>,
    clients: HashMap<u64, Client>,
}

impl Room {
    pub fn new() -> Room {
        Room {
            state: GameState::new(),
            last_move: None,
            clients: HashMap::new(),
        }
    }

    /// Register a connection; the first free seat of {X, O} is assigned,
    /// otherwise the client spectates.
    pub fn join(&mut self, id: u64, sender: UnboundedSender<String>) -> Role {
        let role = if !self.role_taken(Role::X, id) {
            Role::X
        } else if !self.role_taken(Role::O, id) {
            Role::O
        } else {
            Role::Spectator
        };
        self.clients.insert(
            id,
            Client {
                role,
                name: "anon".to_string(),
                sender,
            },
        );
        role
    }

    pub fn leave(&mut self, id: u64) {
        self.clients.remove(&id);
    }

    pub fn role_of(&self, id: u64) -> Option<Role> {
        self.clients.get(&id).map(|c| c.role)
    }

    pub fn describe(&self, id: u64) -> String {
        match self.clients.get(&id) {
            Some(client) => format!("You are {} ({})", client.role.name(), client.name),
            None => "You are nobody".to_string(),
        }
    }

    fn role_taken(&self, role: Role, requester: u64) -> bool {
        if role == Role::Spectator {
            return false;
        }
        self.clients
            .iter()
            .any(|(&id, client)| id != requester && client.role == role)
    }

    /// Handle `ROLE <role> [<name> [<model>]]`. `-` keeps the current role;
    /// the model token is accepted and ignored.
    pub fn set_role(&mut self, id: u64, payload: &str) -> Result<String, String> {
        let mut tokens = payload.split_whitespace();
        let role_token = tokens.next().ok_or("ROLE requires a target role")?;
        let name_token = tokens.next();

        let requested = match role_token.to_ascii_uppercase().as_str() {
            "-" => self.role_of(id).ok_or("unknown client")?,
            "X" => Role::X,
            "O" => Role::O,
            "SPECTATOR" | "SPEC" => Role::Spectator,
            other => return Err(format!("Unknown role: {other}")),
        };

        if self.role_taken(requested, id) {
            return Err(format!("{} already taken", requested.name()));
        }

        let client = self.clients.get_mut(&id).ok_or("unknown client")?;
        client.role = requested;
        if let Some(name) = name_token {
            if name != "-" {
                client.name = name.to_string();
            }
        }
        Ok(self.describe(id))
    }

    /// Handle `MOVE <literal>` from a seated client. On success the caller
    /// broadcasts the new state.
    pub fn submit_move(&mut self, id: u64, literal: &str) -> Result<(), String> {
        let role = self.role_of(id).ok_or("unknown client")?;
        let player = role.player();
        if player == Player::None {
            return Err("Spectators cannot submit moves".to_string());
        }
        if self.status() != "ongoing" {
            return Err("Game is over".to_string());
        }
        if player != self.state.to_move {
            return Err(format!(
                "It is {}'s turn",
                symbol(self.state.to_move)
            ));
        }

        let mv = codec::parse_move(literal).map_err(|e| e.to_string())?;
        if !rules::legal_moves(&self.state).contains(&mv) {
            return Err("Illegal move according to core rules".to_string());
        }

        self.state.apply_move(&mv);
        self.last_move = Some(codec::format_move(&mv));
        Ok(())
    }

    pub fn status(&self) -> String {
        if rules::is_win(&self.state, Player::Black) {
            return "X_win".to_string();
        }
        if rules::is_win(&self.state, Player::White) {
            return "O_win".to_string();
        }
        if !rules::has_any_move(&self.state) {
            return format!("{}_win", symbol(self.state.to_move.opponent()));
        }
        "ongoing".to_string()
    }

    /// Full snapshot as a `STATE ... END` block.
    pub fn snapshot(&self) -> String {
        let mut out = String::from("STATE\n");
        out.push_str(&format!("TURN {}\n", symbol(self.state.to_move)));
        out.push_str(&format!("STATUS {}\n", self.status()));
        out.push_str(&format!(
            "LAST {}\n",
            self.last_move.as_deref().unwrap_or("-")
        ));

        let black_inv = self.state.inventory(Player::Black);
        let white_inv = self.state.inventory(Player::White);
        out.push_str(&format!("STOCK X {} {}\n", black_inv.black, black_inv.gray));
        out.push_str(&format!("STOCK O {} {}\n", white_inv.black, white_inv.gray));

        for y in 0..BOARD_H {
            for x in 0..BOARD_W {
                let cell = self.state.board.at(x, y);
                let coord = codec::format_square(Square::new(x, y));
                if cell.occupant != Player::None {
                    out.push_str(&format!("PIECE {coord} {}\n", symbol(cell.occupant)));
                }
                match cell.tile {
                    TileType::Black => out.push_str(&format!("TILE {coord} b\n")),
                    TileType::Gray => out.push_str(&format!("TILE {coord} g\n")),
                    TileType::None => {}
                }
            }
        }

        out.push_str("END\n");
        out
    }

    pub fn send_to(&self, id: u64, message: String) {
        if let Some(client) = self.clients.get(&id) {
            // A dead receiver is cleaned up when its reader task exits
            let _ = client.sender.send(message);
        }
    }

    pub fn broadcast(&self, message: &str) {
        for client in self.clients.values() {
            let _ = client.sender.send(message.to_string());
        }
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}
