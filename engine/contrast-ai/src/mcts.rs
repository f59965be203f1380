//! Monte-Carlo Tree Search (UCT) with an evaluator in place of rollouts.
//!
//! Nodes live in an arena (`Vec` indexed by `NodeId`) so parent links are
//! plain indices rather than pointers; the whole tree is allocated per search
//! call and dropped when the chosen move is returned.
//!
//! Leaf values come from the evaluator instead of random playouts; terminal
//! leaves score +1/0/-1 from the side-to-move perspective of that leaf (a
//! position with no legal reply is a loss for the side to move). Values are
//! negated on every backup step (negamax).

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use contrast_core::{rules, GameState, Move, Player};

use crate::evaluator::Evaluator;
use crate::policy::Policy;

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(u32);

impl NodeId {
    const NONE: NodeId = NodeId(u32::MAX);
}

#[derive(Debug)]
struct Node {
    state: GameState,
    parent: NodeId,
    move_from_parent: Option<Move>,
    children: Vec<NodeId>,
    /// Legal moves not yet expanded; materialised on first expansion.
    untried: Vec<Move>,
    /// Whether `untried` has been materialised.
    expanded: bool,
    fully_expanded: bool,
    /// Game-over value from this node's side-to-move perspective.
    terminal_value: Option<f32>,
    visits: u32,
    total_value: f32,
}

impl Node {
    fn new(state: GameState, parent: NodeId, move_from_parent: Option<Move>) -> Node {
        let terminal_value = if rules::is_win(&state, Player::Black) {
            Some(side_value(state.to_move, Player::Black))
        } else if rules::is_win(&state, Player::White) {
            Some(side_value(state.to_move, Player::White))
        } else if !rules::has_any_move(&state) {
            // No legal reply is a loss for the side to move
            Some(-1.0)
        } else {
            None
        };

        Node {
            state,
            parent,
            move_from_parent,
            children: Vec::new(),
            untried: Vec::new(),
            expanded: false,
            fully_expanded: false,
            terminal_value,
            visits: 0,
            total_value: 0.0,
        }
    }

    /// UCB1 score; unvisited children are explored first.
    fn ucb(&self, parent_visits_ln: f32, exploration: f32) -> f32 {
        if self.visits == 0 {
            return f32::INFINITY;
        }
        let exploitation = self.total_value / self.visits as f32;
        exploitation + exploration * (parent_visits_ln / self.visits as f32).sqrt()
    }
}

fn side_value(to_move: Player, winner: Player) -> f32 {
    if to_move == winner {
        1.0
    } else {
        -1.0
    }
}

/// Summary of one finished search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    pub iterations: u32,
    pub nodes: usize,
    pub root_visits: u32,
}

#[derive(Clone, Copy)]
enum Budget {
    Iterations(u32),
    WallClock(Duration),
}

/// UCT searcher over any evaluator.
pub struct Mcts<E> {
    evaluator: E,
    exploration: f32,
    rng: ChaCha20Rng,
}

impl<E: Evaluator> Mcts<E> {
    pub fn new(evaluator: E) -> Mcts<E> {
        Mcts {
            evaluator,
            exploration: std::f32::consts::SQRT_2,
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Mcts<E> {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
        self
    }

    /// Search with a fixed iteration budget.
    pub fn search(&mut self, state: &GameState, iterations: u32) -> Option<Move> {
        self.run(state, Budget::Iterations(iterations)).best_move
    }

    /// Search until the wall-clock budget runs out, checking the clock
    /// between iterations.
    pub fn search_time(&mut self, state: &GameState, budget: Duration) -> Option<Move> {
        self.run(state, Budget::WallClock(budget)).best_move
    }

    /// Search with a fixed iteration budget, returning tree statistics
    /// alongside the chosen move.
    pub fn search_outcome(&mut self, state: &GameState, iterations: u32) -> SearchOutcome {
        self.run(state, Budget::Iterations(iterations))
    }

    fn run(&mut self, state: &GameState, budget: Budget) -> SearchOutcome {
        let mut arena = vec![Node::new(*state, NodeId::NONE, None)];
        let started = Instant::now();
        let mut iterations = 0u32;

        loop {
            match budget {
                Budget::Iterations(n) => {
                    if iterations >= n {
                        break;
                    }
                }
                Budget::WallClock(limit) => {
                    if started.elapsed() >= limit {
                        break;
                    }
                }
            }
            self.iterate(&mut arena);
            iterations += 1;
        }

        let best_move = best_root_move(&arena);
        let outcome = SearchOutcome {
            best_move,
            iterations,
            nodes: arena.len(),
            root_visits: arena[0].visits,
        };
        trace!(
            iterations = outcome.iterations,
            nodes = outcome.nodes,
            root_visits = outcome.root_visits,
            "search finished"
        );
        outcome
    }

    /// One selection / expansion / evaluation / backpropagation pass.
    fn iterate(&mut self, arena: &mut Vec<Node>) {
        // Selection: descend by UCB while fully expanded and non-terminal
        let mut id = 0usize;
        loop {
            let node = &arena[id];
            if node.terminal_value.is_some() || !node.fully_expanded {
                break;
            }
            let parent_visits_ln = (node.visits.max(1) as f32).ln();
            let mut best = None;
            let mut best_score = f32::NEG_INFINITY;
            for &child in &node.children {
                let score = arena[child.0 as usize].ucb(parent_visits_ln, self.exploration);
                if score > best_score {
                    best_score = score;
                    best = Some(child);
                }
            }
            match best {
                Some(child) => id = child.0 as usize,
                None => break,
            }
        }

        // Expansion: materialise untried moves once, then attach one child
        let leaf = if arena[id].terminal_value.is_some() {
            id
        } else {
            if !arena[id].expanded {
                let untried = rules::legal_moves(&arena[id].state);
                arena[id].untried = untried;
                arena[id].expanded = true;
            }
            if arena[id].untried.is_empty() {
                id
            } else {
                let pick = self.rng.gen_range(0..arena[id].untried.len());
                let mv = arena[id].untried.swap_remove(pick);
                if arena[id].untried.is_empty() {
                    arena[id].fully_expanded = true;
                }

                let mut next = arena[id].state;
                next.apply_move(&mv);
                let child = Node::new(next, NodeId(id as u32), Some(mv));
                arena.push(child);
                let child_id = arena.len() - 1;
                arena[id].children.push(NodeId(child_id as u32));
                child_id
            }
        };

        // Evaluation: the value network replaces random rollouts
        let value = match arena[leaf].terminal_value {
            Some(v) => v,
            None => self.evaluator.evaluate(&arena[leaf].state),
        };

        // Backpropagation with negamax sign flips
        let mut current = leaf;
        let mut v = value;
        loop {
            arena[current].visits += 1;
            arena[current].total_value += v;
            let parent = arena[current].parent;
            if parent == NodeId::NONE {
                break;
            }
            v = -v;
            current = parent.0 as usize;
        }
    }
}

/// Root child with the most visits; ties break toward higher total value.
fn best_root_move(arena: &[Node]) -> Option<Move> {
    arena[0]
        .children
        .iter()
        .map(|&id| &arena[id.0 as usize])
        .max_by(|a, b| {
            a.visits
                .cmp(&b.visits)
                .then(a.total_value.total_cmp(&b.total_value))
        })
        .and_then(|node| node.move_from_parent)
}

/// A `Policy` that runs a fixed-budget search per move.
pub struct MctsPolicy<E> {
    mcts: Mcts<E>,
    iterations: u32,
}

impl<E: Evaluator> MctsPolicy<E> {
    pub fn new(evaluator: E, iterations: u32) -> MctsPolicy<E> {
        MctsPolicy {
            mcts: Mcts::new(evaluator),
            iterations,
        }
    }

    pub fn seeded(evaluator: E, iterations: u32, seed: u64) -> MctsPolicy<E> {
        MctsPolicy {
            mcts: Mcts::new(evaluator).with_seed(seed),
            iterations,
        }
    }
}

impl<E: Evaluator + Send> Policy for MctsPolicy<E> {
    fn pick(&mut self, state: &GameState) -> Option<Move> {
        self.mcts.search(state, self.iterations)
    }
}
