//! Counterfactual regret minimization over the public tree.
//!
//! Vector-form CFR: one bottom-up sweep per step updates the regrets of
//! every (node, hand) pair the traverser acts at, then regret matching
//! (with a small floor) produces the next iteration's strategy and the
//! reach-weighted strategy sum produces the running average. Discounting
//! supports vanilla CFR, linear averaging, and DCFR; linear and DCFR are
//! mutually exclusive.

use std::io::{self, Write};
use std::sync::Arc;

use crate::error::{SolverError, SolverResult};
use crate::game::Game;
use crate::math_engine::{normalize_in_place, normalize_probabilities, REGRET_SMOOTHING_EPS};
use crate::public_tree::Tree;
use crate::solver::{SubgameSolver, SubgameSolvingParams};
use crate::strategy::{
    uniform_reach_weighted_strategy, uniform_strategy, write_strategy, zero_strategy, TreeStrategy,
};
use crate::traverser::{compute_reach_probabilities, TreeTraverser};
use crate::value_net::ValueNet;

pub struct CfrSolver {
    params: SubgameSolvingParams,
    traversal: TreeTraverser,
    /// Steps completed per player.
    num_steps: [usize; 2],
    initial_beliefs: [Vec<f64>; 2],
    average_strategies: TreeStrategy,
    sum_strategies: TreeStrategy,
    last_strategies: TreeStrategy,
    regrets: TreeStrategy,
    root_values: [Vec<f64>; 2],
    root_values_means: [Vec<f64>; 2],
    /// Reach under `last_strategies` for the player being updated.
    reach_buffer: Vec<Vec<f64>>,
}

impl CfrSolver {
    pub fn new(
        game: Game,
        tree: Tree,
        value_net: Option<Arc<dyn ValueNet>>,
        initial_beliefs: [Vec<f64>; 2],
        params: SubgameSolvingParams,
    ) -> SolverResult<Self> {
        if !params.use_cfr {
            return Err(SolverError::WrongSolverKind {
                expected: "use_cfr",
                actual: "fictitious-play params",
            });
        }
        if params.linear_update && params.dcfr {
            return Err(SolverError::ConflictingDiscountModes);
        }
        let traversal = TreeTraverser::new(game, tree, value_net)?;
        let average_strategies = uniform_strategy(&traversal.game, &traversal.tree);
        let sum_strategies =
            uniform_reach_weighted_strategy(&traversal.game, &traversal.tree, &initial_beliefs);
        let regrets = zero_strategy(&traversal.game, &traversal.tree);
        let num_hands = traversal.game.num_hands();
        let num_nodes = traversal.tree.len();

        Ok(CfrSolver {
            params,
            last_strategies: average_strategies.clone(),
            average_strategies,
            sum_strategies,
            regrets,
            num_steps: [0, 0],
            initial_beliefs,
            root_values: [vec![0.0; num_hands], vec![0.0; num_hands]],
            root_values_means: [vec![0.0; num_hands], vec![0.0; num_hands]],
            reach_buffer: vec![vec![0.0; num_hands]; num_nodes],
            traversal,
        })
    }

    /// Accumulate regrets for `last_strategies` and leave the traverser's
    /// expected values of that strategy in `traversal.values`.
    fn update_regrets(&mut self, traverser: usize) {
        self.traversal
            .precompute_reaches_both(&self.last_strategies, &self.initial_beliefs);
        self.traversal.precompute_leaf_values(traverser);

        let game = &self.traversal.game;
        let tree = &self.traversal.tree;
        let num_hands = game.num_hands();

        for node_id in (0..tree.len()).rev() {
            let node = tree.node(node_id);
            if node.is_leaf() {
                // Leaf values were set by precompute_leaf_values.
                continue;
            }
            let (head, tail) = self.traversal.values.split_at_mut(node_id + 1);
            let value = &mut head[node_id];
            value.iter_mut().for_each(|v| *v = 0.0);

            if node.state.player_id == traverser {
                for (child, action) in tree.children_with_actions(game, node_id) {
                    let child_value = &tail[child - node_id - 1];
                    for hand in 0..num_hands {
                        self.regrets[node_id][hand][action] += child_value[hand];
                        value[hand] +=
                            child_value[hand] * self.last_strategies[node_id][hand][action];
                    }
                }
                for hand in 0..num_hands {
                    for (_, action) in tree.children_with_actions(game, node_id) {
                        self.regrets[node_id][hand][action] -= value[hand];
                    }
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
    }

    fn discounts(&self, traverser: usize) -> (f64, f64, f64) {
        // The uniform seed counts as one strategy, hence +1.
        let num_strategies = (self.num_steps[traverser] + 1) as f64;
        if self.params.linear_update {
            let d = num_strategies / (num_strategies + 1.0);
            (d, d, d)
        } else if self.params.dcfr {
            let pos = if self.params.dcfr_alpha >= 5.0 {
                1.0
            } else {
                let p = num_strategies.powf(self.params.dcfr_alpha);
                p / (p + 1.0)
            };
            let neg = if self.params.dcfr_beta <= -5.0 {
                0.0
            } else {
                let p = num_strategies.powf(self.params.dcfr_beta);
                p / (p + 1.0)
            };
            let strat =
                (num_strategies / (num_strategies + 1.0)).powf(self.params.dcfr_gamma);
            (pos, neg, strat)
        } else {
            (1.0, 1.0, 1.0)
        }
    }
}

impl SubgameSolver for CfrSolver {
    fn step(&mut self, traverser: usize) {
        self.update_regrets(traverser);

        self.root_values[traverser].copy_from_slice(&self.traversal.values[0]);
        let alpha = if self.params.linear_update {
            2.0 / (self.num_steps[traverser] + 2) as f64
        } else {
            1.0 / (self.num_steps[traverser] + 1) as f64
        };
        for (mean, &value) in self.root_values_means[traverser]
            .iter_mut()
            .zip(self.root_values[traverser].iter())
        {
            *mean += (value - *mean) * alpha;
        }

        let (pos_discount, neg_discount, strat_discount) = self.discounts(traverser);

        let game = &self.traversal.game;
        let tree = &self.traversal.tree;
        let num_hands = game.num_hands();

        // Regret matching with an epsilon floor keeps the strategy fully
        // mixed, so reach never collapses to an exact zero.
        for (node_id, node) in tree.iter().enumerate() {
            if node.is_leaf() || node.state.player_id != traverser {
                continue;
            }
            let range = game.action_range(&node.state);
            for hand in 0..num_hands {
                let row = &mut self.last_strategies[node_id][hand];
                for action in range.clone() {
                    row[action] = self.regrets[node_id][hand][action].max(REGRET_SMOOTHING_EPS);
                }
                normalize_in_place(row);
            }
        }

        compute_reach_probabilities(
            game,
            tree,
            &self.last_strategies,
            &self.initial_beliefs[traverser],
            traverser,
            &mut self.reach_buffer,
        );

        for (node_id, node) in tree.iter().enumerate() {
            if node.is_leaf() || node.state.player_id != traverser {
                continue;
            }
            let range = game.action_range(&node.state);
            for hand in 0..num_hands {
                for action in range.clone() {
                    let regret = &mut self.regrets[node_id][hand][action];
                    *regret *= if *regret > 0.0 { pos_discount } else { neg_discount };
                }
                for action in range.clone() {
                    self.sum_strategies[node_id][hand][action] *= strat_discount;
                }
                for action in range.clone() {
                    self.sum_strategies[node_id][hand][action] += self.reach_buffer[node_id][hand]
                        * self.last_strategies[node_id][hand][action];
                }
                normalize_probabilities(
                    &self.sum_strategies[node_id][hand],
                    &mut self.average_strategies[node_id][hand],
                );
            }
        }

        self.num_steps[traverser] += 1;
    }

    fn num_iters(&self) -> usize {
        self.params.num_iters
    }

    fn get_strategy(&self) -> &TreeStrategy {
        &self.average_strategies
    }

    fn get_sampling_strategy(&self) -> &TreeStrategy {
        &self.last_strategies
    }

    fn get_hand_values(&self, player_id: usize) -> &[f64] {
        &self.root_values_means[player_id]
    }

    fn update_value_network(&self) {
        assert!(
            self.num_steps[0] > 0 && self.num_steps[1] > 0,
            "update_value_network before both players stepped"
        );
        for player in 0..2 {
            self.traversal
                .add_training_example(player, self.root_values_means[player].clone());
        }
    }

    fn get_tree(&self) -> &Tree {
        &self.traversal.tree
    }

    fn write_strategy(&self, out: &mut dyn Write) -> io::Result<()> {
        write_strategy(
            &self.traversal.game,
            &self.traversal.tree,
            &self.average_strategies,
            out,
        )
    }
}
