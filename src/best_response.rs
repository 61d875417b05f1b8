//! Best response, exploitability, and head-to-head evaluation.
//!
//! The best-response pass reuses the shared traversal machinery: reaches
//! under the opponent's fixed strategy, leaf values for the responder, then
//! a bottom-up max at the responder's nodes. Tie-breaking is deliberate:
//! candidates are scanned in increasing action order and replaced only on
//! strict improvement, so the first best action wins. Changing that would
//! change which equilibrium the fictitious-play loop selects.

use std::sync::Arc;

use rayon::prelude::*;

use crate::error::SolverResult;
use crate::game::Game;
use crate::math_engine::vector_sum;
use crate::public_tree::{unroll_full_tree, Tree};
use crate::solver::initial_beliefs;
use crate::strategy::{zero_strategy, TreeStrategy};
use crate::traverser::{compute_reach_probabilities, terminal_values, TreeTraverser};
use crate::value_net::ValueNet;

pub struct BrSolver {
    pub traversal: TreeTraverser,
    br_strategies: TreeStrategy,
}

impl BrSolver {
    pub fn new(game: Game, tree: Tree, value_net: Option<Arc<dyn ValueNet>>) -> SolverResult<Self> {
        let traversal = TreeTraverser::new(game, tree, value_net)?;
        let br_strategies = zero_strategy(&traversal.game, &traversal.tree);
        Ok(BrSolver {
            traversal,
            br_strategies,
        })
    }

    /// Best response of `traverser` against `opponent_strategy`. Returns
    /// the one-hot best-response strategy (rows are only meaningful at the
    /// traverser's own decision nodes) and the per-hand root values.
    pub fn compute_br(
        &mut self,
        traverser: usize,
        opponent_strategy: &TreeStrategy,
        initial_beliefs: &[Vec<f64>; 2],
    ) -> (TreeStrategy, Vec<f64>) {
        self.traversal
            .precompute_reaches_both(opponent_strategy, initial_beliefs);
        self.traversal.precompute_leaf_values(traverser);

        let game = &self.traversal.game;
        let tree = &self.traversal.tree;
        let num_hands = game.num_hands();

        let mut best_action = vec![0usize; num_hands];
        for node_id in (0..tree.len()).rev() {
            let node = tree.node(node_id);
            if node.is_leaf() {
                continue;
            }
            let (head, tail) = self.traversal.values.split_at_mut(node_id + 1);
            let value = &mut head[node_id];
            value.iter_mut().for_each(|v| *v = 0.0);

            if node.state.player_id == traverser {
                for (k, (child, action)) in tree.children_with_actions(game, node_id).enumerate() {
                    let child_value = &tail[child - node_id - 1];
                    for hand in 0..num_hands {
                        if k == 0 || child_value[hand] > value[hand] {
                            value[hand] = child_value[hand];
                            best_action[hand] = action;
                        }
                    }
                }
                for hand in 0..num_hands {
                    let row = &mut self.br_strategies[node_id][hand];
                    row.iter_mut().for_each(|p| *p = 0.0);
                    row[best_action[hand]] = 1.0;
                }
            } else {
                for child in node.children() {
                    let child_value = &tail[child - node_id - 1];
                    for hand in 0..num_hands {
                        value[hand] += child_value[hand];
                    }
                }
            }
        }

        (self.br_strategies.clone(), self.traversal.values[0].clone())
    }
}

/// Best-response value of each player against `strategy` on the full tree
/// for `public_hand`, averaged over hands under uniform priors.
pub fn compute_exploitability2(game: &Game, strategy: &TreeStrategy, public_hand: usize) -> [f64; 2] {
    let tree = unroll_full_tree(game, public_hand);
    assert_eq!(
        tree.len(),
        strategy.len(),
        "strategy shape does not match the full tree"
    );
    let beliefs = initial_beliefs(game);
    let mut solver = BrSolver::new(game.clone(), tree, None)
        .expect("full tree has only terminal leaves");
    let (_, values0) = solver.compute_br(0, strategy, &beliefs);
    let (_, values1) = solver.compute_br(1, strategy, &beliefs);
    [
        vector_sum(&values0) / values0.len() as f64,
        vector_sum(&values1) / values1.len() as f64,
    ]
}

/// Mean of both players' best-response values: zero iff `strategy` is an
/// exact equilibrium.
pub fn compute_exploitability(game: &Game, strategy: &TreeStrategy, public_hand: usize) -> f64 {
    let [e0, e1] = compute_exploitability2(game, strategy, public_hand);
    (e0 + e1) / 2.0
}

/// Exploitability of independently solved strategies averaged over every
/// public hand. `solve` maps a public hand to its solved strategy; hands
/// run in parallel since solver instances share nothing mutable.
pub fn average_exploitability<F>(game: &Game, solve: F) -> f64
where
    F: Fn(usize) -> TreeStrategy + Sync,
{
    log::info!(
        "averaging exploitability over {} public hands",
        game.num_public_hands()
    );
    let total: f64 = (0..game.num_public_hands())
        .into_par_iter()
        .map(|public_hand| compute_exploitability(game, &solve(public_hand), public_hand))
        .sum();
    total / game.num_public_hands() as f64
}

/// Expected per-hand root value for player 0 playing `strategy0` against
/// `strategy1`, on the full tree for `public_hand` with uniform priors.
pub fn compute_ev(
    game: &Game,
    strategy0: &TreeStrategy,
    strategy1: &TreeStrategy,
    public_hand: usize,
) -> Vec<f64> {
    let tree = unroll_full_tree(game, public_hand);
    assert_eq!(tree.len(), strategy0.len());
    assert_eq!(tree.len(), strategy1.len());
    let player = 0;
    let beliefs = initial_beliefs(game);
    let num_hands = game.num_hands();

    let mut op_reach = vec![vec![0.0; num_hands]; tree.len()];
    compute_reach_probabilities(game, &tree, strategy1, &beliefs[0], 1 - player, &mut op_reach);

    let mut values = vec![vec![0.0; num_hands]; tree.len()];
    for node_id in (0..tree.len()).rev() {
        let node = tree.node(node_id);
        if node.is_leaf() {
            values[node_id] = terminal_values(
                game,
                &node.state,
                node.state.player_id != player,
                &op_reach[node_id],
            );
        } else if node.state.player_id == player {
            for (child, action) in tree.children_with_actions(game, node_id) {
                for hand in 0..num_hands {
                    let weighted = strategy0[node_id][hand][action] * values[child][hand];
                    values[node_id][hand] += weighted;
                }
            }
        } else {
            for child in node.children() {
                for hand in 0..num_hands {
                    let child_value = values[child][hand];
                    values[node_id][hand] += child_value;
                }
            }
        }
    }
    values.swap_remove(0)
}

/// `strategy0`'s expected value in both seats against `strategy1`.
pub fn compute_ev2(
    game: &Game,
    strategy0: &TreeStrategy,
    strategy1: &TreeStrategy,
    public_hand: usize,
) -> [f64; 2] {
    let as_first = vector_sum(&compute_ev(game, strategy0, strategy1, public_hand))
        / game.num_hands() as f64;
    let as_second = -vector_sum(&compute_ev(game, strategy1, strategy0, public_hand))
        / game.num_hands() as f64;
    [as_first, as_second]
}
