//! Shared learner and opponent handles.
//!
//! The learner is one mutable network behind a mutex: evaluations and TD
//! updates both take the lock, so a full `evaluate` always sees one coherent
//! weight set. The opponent is an immutable value behind a swappable
//! reference-counted pointer: workers load it once per game and keep their
//! `Arc` for the whole game, so a promotion mid-game never tears an opponent
//! out from under a running worker.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use rand_chacha::ChaCha20Rng;

use contrast_ai::{
    epsilon_greedy_move, greedy_move, rule_based_move, Evaluator, NTupleNetwork, WeightsError,
};
use contrast_core::{GameState, Move};

/// The mutable learner network, serialised behind a mutex.
pub struct SharedNetwork {
    inner: Mutex<NTupleNetwork>,
}

impl SharedNetwork {
    pub fn new(network: NTupleNetwork) -> SharedNetwork {
        SharedNetwork {
            inner: Mutex::new(network),
        }
    }

    pub fn evaluate(&self, state: &GameState) -> f32 {
        self.inner.lock().unwrap().evaluate(state)
    }

    pub fn td_update(&self, state: &GameState, target: f32, learning_rate: f32) {
        self.inner
            .lock()
            .unwrap()
            .td_update(state, target, learning_rate)
    }

    /// Value-copy of the current weights, taken under the lock.
    pub fn snapshot(&self) -> NTupleNetwork {
        self.inner.lock().unwrap().clone()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WeightsError> {
        self.inner.lock().unwrap().save(path)
    }

    pub fn num_weights(&self) -> usize {
        self.inner.lock().unwrap().num_weights()
    }
}

impl Evaluator for SharedNetwork {
    fn evaluate(&self, state: &GameState) -> f32 {
        SharedNetwork::evaluate(self, state)
    }
}

/// The opponent a worker plays against. Deterministic policies carry no
/// state; a snapshot is a frozen value-copy of the learner.
pub enum Opponent {
    Greedy,
    RuleBased,
    Snapshot(NTupleNetwork),
}

impl Opponent {
    /// Pick the opponent's move; snapshots play value-greedy (epsilon 0).
    pub fn pick(&self, state: &GameState, rng: &mut ChaCha20Rng) -> Option<Move> {
        match self {
            Opponent::Greedy => greedy_move(state, rng),
            Opponent::RuleBased => rule_based_move(state, rng),
            Opponent::Snapshot(network) => epsilon_greedy_move(state, network, 0.0, rng),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, Opponent::Snapshot(_))
    }
}

/// Atomically swappable opponent slot.
pub struct OpponentSlot {
    current: RwLock<Arc<Opponent>>,
}

impl OpponentSlot {
    pub fn new(opponent: Opponent) -> OpponentSlot {
        OpponentSlot {
            current: RwLock::new(Arc::new(opponent)),
        }
    }

    /// Load the current opponent. Callers hold the returned `Arc` for a full
    /// game; a concurrent `replace` does not affect games in flight.
    pub fn load(&self) -> Arc<Opponent> {
        Arc::clone(&self.current.read().unwrap())
    }

    /// Swap in a new opponent as a whole.
    pub fn replace(&self, opponent: Opponent) {
        *self.current.write().unwrap() = Arc::new(opponent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contrast_core::rules;
    use rand::SeedableRng;

    #[test]
    fn shared_network_evaluates_and_updates_consistently() {
        let shared = SharedNetwork::new(NTupleNetwork::new());
        let state = GameState::new();

        assert!((shared.evaluate(&state) - 0.5).abs() < 1e-5);
        shared.td_update(&state, 1.0, 0.1);
        assert!(shared.evaluate(&state) > 0.5);
    }

    #[test]
    fn snapshot_is_a_value_copy() {
        let shared = SharedNetwork::new(NTupleNetwork::new());
        let state = GameState::new();

        let frozen = shared.snapshot();
        shared.td_update(&state, 1.0, 0.1);

        // The learner moved, the snapshot did not
        assert!(shared.evaluate(&state) > 0.5);
        assert!((frozen.evaluate(&state) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn opponents_pick_legal_moves() {
        let state = GameState::new();
        let legal = rules::legal_moves(&state);
        let mut rng = ChaCha20Rng::seed_from_u64(9);

        for opponent in [
            Opponent::Greedy,
            Opponent::RuleBased,
            Opponent::Snapshot(NTupleNetwork::new()),
        ] {
            let mv = opponent.pick(&state, &mut rng).unwrap();
            assert!(legal.contains(&mv));
        }
    }

    #[test]
    fn slot_replacement_leaves_held_arcs_alone() {
        let slot = OpponentSlot::new(Opponent::Greedy);
        let held = slot.load();
        slot.replace(Opponent::RuleBased);

        assert!(matches!(*held, Opponent::Greedy));
        assert!(matches!(*slot.load(), Opponent::RuleBased));
    }
}
