//! Reach propagation and leaf evaluation, shared by every solver.
//!
//! `TreeTraverser` owns the per-player reach tables and the traverser-value
//! table for one tree. Solvers precompute reaches for a strategy, ask for
//! all leaf values (terminals exactly, pseudo-leaves through the value
//! net), then run their own bottom-up pass over `values`.

use std::sync::Arc;

use crate::error::{SolverError, SolverResult};
use crate::game::{Event, Game, PartialPublicState};
use crate::math_engine::vector_sum;
use crate::public_tree::Tree;
use crate::strategy::TreeStrategy;
use crate::value_net::{encode_query, ValueNet};

/// For each node and hand, the probability that `player` reaches the node
/// holding that hand: prior belief times the product of `player`'s own
/// strategy entries along the path. Opponent decisions pass through
/// unchanged; their filtering happens through the opponent's own table.
pub fn compute_reach_probabilities(
    game: &Game,
    tree: &Tree,
    strategy: &TreeStrategy,
    initial_beliefs: &[f64],
    player: usize,
    reach: &mut [Vec<f64>],
) {
    assert_eq!(initial_beliefs.len(), game.num_hands());
    reach[0].copy_from_slice(initial_beliefs);
    for node_id in 1..tree.len() {
        let node = tree.node(node_id);
        let parent = node.parent.expect("non-root node must have a parent");
        let last_action = game.deduce_last_action(&node.state);
        // Parents always precede children, so splitting at node_id gives
        // the parent row immutably and the node row mutably.
        let (done, rest) = reach.split_at_mut(node_id);
        let parent_row = &done[parent];
        let row = &mut rest[0];
        if tree.node(parent).state.player_id == player {
            for hand in 0..game.num_hands() {
                row[hand] = parent_row[hand] * strategy[parent][hand][last_action];
            }
        } else {
            row.copy_from_slice(parent_row);
        }
    }
}

/// Expected payoff vector for the traverser at a terminal state, given the
/// opponent's unnormalized reach. `inverse` flips the sign and is set when
/// the traverser is not the player to move at the terminal:
/// - fold: the player to move is the non-folder and wins `last_bid - 1`
///   from every opponent hand still in range;
/// - call: values come straight from the utility table in the traverser's
///   perspective, so no flip is applied.
pub fn terminal_values(
    game: &Game,
    state: &PartialPublicState,
    inverse: bool,
    op_reach: &[f64],
) -> Vec<f64> {
    let op_mass = vector_sum(op_reach);
    match state.event {
        Event::Folded => {
            let pot = op_mass * (state.last_bid - 1) as f64;
            let value = if inverse { -pot } else { pot };
            vec![value; game.num_hands()]
        }
        Event::Called => {
            let mut values = win_probability_mass(game, state.public_hand, op_reach);
            for value in &mut values {
                // 2*win - mass maps the win mass onto [-mass, +mass].
                *value = (*value * 2.0 - op_mass) * state.last_bid as f64;
            }
            values
        }
        Event::InProgress => panic!("terminal_values on a non-terminal state {state}"),
    }
}

/// For each of our hands, the opponent-reach-weighted probability of
/// winning the showdown: `Σ_op op_reach[op] * utility(hand, op, public)`.
pub fn win_probability_mass(game: &Game, public_hand: usize, op_reach: &[f64]) -> Vec<f64> {
    let mut values = vec![0.0; game.num_hands()];
    for (my_hand, value) in values.iter_mut().enumerate() {
        for (op_hand, &mass) in op_reach.iter().enumerate() {
            *value += mass * game.utility(my_hand, op_hand, public_hand);
        }
    }
    values
}

/// Per-tree traversal state: reach tables for both players and the
/// traverser-value table populated at the leaves.
pub struct TreeTraverser {
    pub game: Game,
    pub tree: Tree,
    /// `[player][node][hand]` reach probabilities, filled by
    /// `precompute_reaches`.
    pub reach_probabilities: [Vec<Vec<f64>>; 2],
    /// `[node][hand]` expected payoff for the current traverser. Leaves are
    /// set by `precompute_leaf_values`; inner nodes belong to the caller.
    pub values: Vec<Vec<f64>>,
    pseudo_leaves: Vec<usize>,
    terminals: Vec<usize>,
    value_net: Option<Arc<dyn ValueNet>>,
}

impl TreeTraverser {
    /// Fails fast if the tree has depth-cutoff leaves but no value net to
    /// evaluate them: that is a configuration error, not a runtime one.
    pub fn new(game: Game, tree: Tree, value_net: Option<Arc<dyn ValueNet>>) -> SolverResult<Self> {
        let mut pseudo_leaves = Vec::new();
        let mut terminals = Vec::new();
        for (node_id, node) in tree.iter().enumerate() {
            if game.is_terminal(&node.state) {
                terminals.push(node_id);
            } else if node.is_leaf() {
                pseudo_leaves.push(node_id);
            }
        }
        if value_net.is_none() {
            if let Some(&node_id) = pseudo_leaves.first() {
                return Err(SolverError::NonFinalLeaf {
                    state: tree.node(node_id).state.to_string(),
                });
            }
        }
        log::debug!(
            "traverser over {} nodes: {} terminals, {} pseudo-leaves",
            tree.len(),
            terminals.len(),
            pseudo_leaves.len()
        );

        let num_hands = game.num_hands();
        let num_nodes = tree.len();
        Ok(TreeTraverser {
            game,
            tree,
            reach_probabilities: [
                vec![vec![0.0; num_hands]; num_nodes],
                vec![vec![0.0; num_hands]; num_nodes],
            ],
            values: vec![vec![0.0; num_hands]; num_nodes],
            pseudo_leaves,
            terminals,
            value_net,
        })
    }

    pub fn precompute_reaches(
        &mut self,
        strategy: &TreeStrategy,
        initial_beliefs: &[f64],
        player: usize,
    ) {
        compute_reach_probabilities(
            &self.game,
            &self.tree,
            strategy,
            initial_beliefs,
            player,
            &mut self.reach_probabilities[player],
        );
    }

    pub fn precompute_reaches_both(
        &mut self,
        strategy: &TreeStrategy,
        initial_beliefs: &[Vec<f64>; 2],
    ) {
        self.precompute_reaches(strategy, &initial_beliefs[0], 0);
        self.precompute_reaches(strategy, &initial_beliefs[1], 1);
    }

    /// Fill `values` at every leaf for `traverser`. Reaches for both
    /// players must be precomputed.
    pub fn precompute_leaf_values(&mut self, traverser: usize) {
        self.query_value_net(traverser);
        self.precompute_terminal_values(traverser);
    }

    /// Encode the query for `node_id` as seen by `traverser`.
    pub fn query_at(&self, node_id: usize, traverser: usize) -> Vec<f32> {
        encode_query(
            &self.game,
            traverser,
            &self.tree.node(node_id).state,
            &self.reach_probabilities[0][node_id],
            &self.reach_probabilities[1][node_id],
        )
    }

    /// Submit the root query with `values` as the training target.
    pub fn add_training_example(&self, traverser: usize, values: Vec<f64>) {
        if let Some(net) = &self.value_net {
            net.add_training_example(self.query_at(0, traverser), values);
        }
    }

    /// Batch-query the net for every pseudo-leaf and scale the per-unit
    /// answers by the opponent's reach mass at each leaf.
    fn query_value_net(&mut self, traverser: usize) {
        if self.pseudo_leaves.is_empty() {
            return;
        }
        let net = self
            .value_net
            .as_ref()
            .expect("pseudo-leaves require a value net");

        let queries: Vec<Vec<f32>> = self
            .pseudo_leaves
            .iter()
            .map(|&node_id| self.query_at(node_id, traverser))
            .collect();
        let results = net.compute_values(&queries);
        assert_eq!(results.len(), self.pseudo_leaves.len());

        for (&node_id, mut leaf_values) in self.pseudo_leaves.iter().zip(results) {
            assert_eq!(leaf_values.len(), self.game.num_hands());
            let scale = vector_sum(&self.reach_probabilities[1 - traverser][node_id]);
            for value in &mut leaf_values {
                *value *= scale;
            }
            self.values[node_id] = leaf_values;
        }
    }

    fn precompute_terminal_values(&mut self, traverser: usize) {
        for &node_id in &self.terminals {
            let state = self.tree.node(node_id).state;
            self.values[node_id] = terminal_values(
                &self.game,
                &state,
                state.player_id != traverser,
                &self.reach_probabilities[1 - traverser][node_id],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Game, CALL, FOLD, RAISE};
    use crate::public_tree::{unroll_full_tree, unroll_tree};
    use crate::solver::initial_beliefs;
    use crate::strategy::uniform_strategy;
    use crate::value_net::ZeroValueNet;
    use approx::assert_relative_eq;

    fn uniform_reach_setup(game: &Game) -> (Tree, TreeStrategy, [Vec<f64>; 2]) {
        let tree = unroll_full_tree(game, 0);
        let strategy = uniform_strategy(game, &tree);
        (tree, strategy, initial_beliefs(game))
    }

    #[test]
    fn root_reach_equals_prior() {
        let game = Game::standard();
        let (tree, strategy, beliefs) = uniform_reach_setup(&game);
        let mut reach = vec![vec![0.0; game.num_hands()]; tree.len()];
        compute_reach_probabilities(&game, &tree, &strategy, &beliefs[0], 0, &mut reach);
        assert_eq!(reach[0], beliefs[0]);
    }

    #[test]
    fn opponent_nodes_pass_through() {
        let game = Game::standard();
        let (tree, strategy, beliefs) = uniform_reach_setup(&game);
        let mut reach = vec![vec![0.0; game.num_hands()]; tree.len()];
        // Player 1 does not act at the root, so every root child carries
        // the prior unchanged in player 1's table.
        compute_reach_probabilities(&game, &tree, &strategy, &beliefs[1], 1, &mut reach);
        for child in tree.root().children() {
            assert_eq!(reach[child], beliefs[1]);
        }
    }

    #[test]
    fn own_nodes_multiply_by_strategy() {
        let game = Game::standard();
        let (tree, strategy, beliefs) = uniform_reach_setup(&game);
        let mut reach = vec![vec![0.0; game.num_hands()]; tree.len()];
        compute_reach_probabilities(&game, &tree, &strategy, &beliefs[0], 0, &mut reach);
        let prior = 1.0 / game.num_hands() as f64;
        for child in tree.root().children() {
            for hand in 0..game.num_hands() {
                assert_relative_eq!(reach[child][hand], prior / 3.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn reach_monotone_along_paths() {
        let game = Game::standard();
        let (tree, strategy, beliefs) = uniform_reach_setup(&game);
        let mut reach = vec![vec![0.0; game.num_hands()]; tree.len()];
        compute_reach_probabilities(&game, &tree, &strategy, &beliefs[0], 0, &mut reach);
        for node_id in 1..tree.len() {
            let parent = tree.node(node_id).parent.unwrap();
            for hand in 0..game.num_hands() {
                assert!(reach[node_id][hand] <= reach[parent][hand] + 1e-15);
            }
        }
    }

    #[test]
    fn propagation_is_idempotent() {
        let game = Game::standard();
        let (tree, strategy, beliefs) = uniform_reach_setup(&game);
        let mut first = vec![vec![0.0; game.num_hands()]; tree.len()];
        let mut second = vec![vec![0.0; game.num_hands()]; tree.len()];
        compute_reach_probabilities(&game, &tree, &strategy, &beliefs[0], 0, &mut first);
        compute_reach_probabilities(&game, &tree, &strategy, &beliefs[0], 0, &mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn fold_value_signs() {
        let game = Game::standard();
        // Raise to 5, then fold: player to move at the terminal wins 4.
        let mut state = game.initial_state(0);
        for _ in 0..3 {
            state = game.act(&state, RAISE);
        }
        assert_eq!(state.last_bid, 5);
        let folded = game.act(&state, FOLD);

        let op_reach = vec![0.5; game.num_hands()];
        let mass = vector_sum(&op_reach);

        let winner = terminal_values(&game, &folded, false, &op_reach);
        let loser = terminal_values(&game, &folded, true, &op_reach);
        for hand in 0..game.num_hands() {
            assert_relative_eq!(winner[hand], 4.0 * mass);
            assert_relative_eq!(loser[hand], -4.0 * mass);
        }
    }

    #[test]
    fn call_values_scale_with_bid() {
        let game = Game::standard();
        let called = game.act(&game.initial_state(7), CALL);
        assert_eq!(called.last_bid, 2);
        let op_reach = vec![1.0 / 36.0; 36];
        let values = terminal_values(&game, &called, false, &op_reach);
        // Zero-sum over a uniform matchup: values average to zero.
        let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
        assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
        // And every value is bounded by ±mass×bid.
        for &v in &values {
            assert!(v.abs() <= 2.0 + 1e-12);
        }
    }

    #[test]
    fn missing_value_net_is_rejected() {
        let game = Game::standard();
        let tree = unroll_tree(&game, &game.initial_state(0), 2);
        let result = TreeTraverser::new(game, tree, None);
        assert!(matches!(result, Err(SolverError::NonFinalLeaf { .. })));
    }

    #[test]
    fn full_tree_needs_no_net() {
        let game = Game::standard();
        let tree = unroll_full_tree(&game, 0);
        assert!(TreeTraverser::new(game, tree, None).is_ok());
    }

    #[test]
    fn zero_net_zeroes_pseudo_leaves() {
        let game = Game::standard();
        let tree = unroll_tree(&game, &game.initial_state(0), 2);
        let net: Arc<dyn ValueNet> = Arc::new(ZeroValueNet::new(&game));
        let mut traverser = TreeTraverser::new(game.clone(), tree, Some(net)).unwrap();
        let strategy = uniform_strategy(&game, &traverser.tree);
        let beliefs = initial_beliefs(&game);
        traverser.precompute_reaches_both(&strategy, &beliefs);
        traverser.precompute_leaf_values(0);
        for (node_id, node) in traverser.tree.iter().enumerate() {
            if node.is_leaf() && !game.is_terminal(&node.state) {
                assert!(traverser.values[node_id].iter().all(|&v| v == 0.0));
            }
        }
    }
}
