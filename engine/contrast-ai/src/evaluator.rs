//! The evaluator seam.
//!
//! Policies and MCTS only need a position's value from the side to move's
//! perspective. Abstracting that behind a trait lets the same selection code
//! run against a bare network, a shared mutex-guarded learner, or a frozen
//! opponent snapshot behind an `Arc`.

use contrast_core::GameState;
use std::sync::Arc;

/// A value function over game states, scored from the perspective of the
/// side to move (positive is good for the mover).
pub trait Evaluator {
    fn evaluate(&self, state: &GameState) -> f32;
}

impl<E: Evaluator + ?Sized> Evaluator for &E {
    fn evaluate(&self, state: &GameState) -> f32 {
        (**self).evaluate(state)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Arc<E> {
    fn evaluate(&self, state: &GameState) -> f32 {
        (**self).evaluate(state)
    }
}
