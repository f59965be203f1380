//! Training statistics: lifetime counters plus the rolling window that
//! drives curriculum promotion. Owned by the updater thread; workers never
//! touch it.

use std::collections::VecDeque;

use contrast_core::Player;

use crate::game::GameRecord;

#[derive(Debug)]
pub struct TrainingStats {
    pub games: u32,
    pub learner_wins: u32,
    pub opponent_wins: u32,
    pub draws: u32,
    pub black_wins: u32,
    pub white_wins: u32,
    pub total_moves: u64,

    window: VecDeque<bool>,
    window_wins: u32,
    window_capacity: usize,
}

impl TrainingStats {
    pub fn new(window_capacity: usize) -> TrainingStats {
        TrainingStats {
            games: 0,
            learner_wins: 0,
            opponent_wins: 0,
            draws: 0,
            black_wins: 0,
            white_wins: 0,
            total_moves: 0,
            window: VecDeque::with_capacity(window_capacity),
            window_wins: 0,
            window_capacity,
        }
    }

    /// Record one finished game; returns whether the learner won it.
    pub fn record(&mut self, record: &GameRecord) -> bool {
        let learner_side = if record.learner_was_black {
            Player::Black
        } else {
            Player::White
        };

        self.games += 1;
        self.total_moves += record.moves as u64;
        match record.winner {
            Player::None => self.draws += 1,
            Player::Black => self.black_wins += 1,
            Player::White => self.white_wins += 1,
        }

        let learner_won = record.winner == learner_side;
        if learner_won {
            self.learner_wins += 1;
        } else if record.winner != Player::None {
            self.opponent_wins += 1;
        }

        self.window.push_back(learner_won);
        if learner_won {
            self.window_wins += 1;
        }
        if self.window.len() > self.window_capacity {
            if self.window.pop_front() == Some(true) {
                self.window_wins -= 1;
            }
        }

        learner_won
    }

    /// Learner win rate over the rolling window.
    pub fn rolling_rate(&self) -> f32 {
        if self.window.is_empty() {
            0.0
        } else {
            self.window_wins as f32 / self.window.len() as f32
        }
    }

    pub fn window_full(&self) -> bool {
        self.window.len() >= self.window_capacity
    }

    /// Clear the rolling window (done on every curriculum transition).
    pub fn reset_window(&mut self) {
        self.window.clear();
        self.window_wins = 0;
    }

    pub fn learner_rate(&self) -> f32 {
        let decided = self.learner_wins + self.opponent_wins;
        if decided == 0 {
            0.0
        } else {
            self.learner_wins as f32 / decided as f32
        }
    }

    pub fn average_moves(&self) -> f32 {
        if self.games == 0 {
            0.0
        } else {
            self.total_moves as f32 / self.games as f32
        }
    }
}
