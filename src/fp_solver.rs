//! Fictitious play over the public tree.
//!
//! Each step computes an exact best response to the opponent's current
//! average strategy and folds the responder's belief-weighted visitation
//! of that response into the strategy sums. The visitation walk is an
//! explicit worklist over node indices, so traversal order is auditable
//! and stack depth stays bounded.

use std::io::{self, Write};
use std::sync::Arc;

use crate::best_response::BrSolver;
use crate::error::{SolverError, SolverResult};
use crate::game::Game;
use crate::math_engine::{normalize_probabilities, normalize_probabilities_sum};
use crate::public_tree::Tree;
use crate::solver::{SubgameSolver, SubgameSolvingParams};
use crate::strategy::{
    uniform_reach_weighted_strategy, uniform_strategy, write_strategy, TreeStrategy,
};
use crate::value_net::ValueNet;

pub struct FpSolver {
    params: SubgameSolvingParams,
    /// Updates accumulated into the strategy sums, both players together.
    num_strategies: usize,
    initial_beliefs: [Vec<f64>; 2],
    average_strategies: TreeStrategy,
    sum_strategies: TreeStrategy,
    last_strategies: TreeStrategy,
    root_values: [Vec<f64>; 2],
    root_values_means: [Vec<f64>; 2],
    br_solver: BrSolver,
}

impl FpSolver {
    pub fn new(
        game: Game,
        tree: Tree,
        value_net: Option<Arc<dyn ValueNet>>,
        initial_beliefs: [Vec<f64>; 2],
        params: SubgameSolvingParams,
    ) -> SolverResult<Self> {
        if params.use_cfr {
            return Err(SolverError::WrongSolverKind {
                expected: "fictitious-play",
                actual: "cfr params",
            });
        }
        let br_solver = BrSolver::new(game, tree, value_net)?;
        let game = &br_solver.traversal.game;
        let tree = &br_solver.traversal.tree;
        let average_strategies = uniform_strategy(game, tree);
        let sum_strategies = uniform_reach_weighted_strategy(game, tree, &initial_beliefs);
        let num_hands = game.num_hands();

        Ok(FpSolver {
            params,
            num_strategies: 0,
            initial_beliefs,
            last_strategies: average_strategies.clone(),
            average_strategies,
            sum_strategies,
            root_values: [vec![0.0; num_hands], vec![0.0; num_hands]],
            root_values_means: [vec![0.0; num_hands], vec![0.0; num_hands]],
            br_solver,
        })
    }
}

impl SubgameSolver for FpSolver {
    fn step(&mut self, traverser: usize) {
        let (br_strategy, values) =
            self.br_solver
                .compute_br(traverser, &self.average_strategies, &self.initial_beliefs);
        self.root_values[traverser] = values;

        // Updates done for this traverser so far, assuming alternation.
        let num_update = self.num_strategies / 2 + 1;
        let alpha = if self.params.linear_update {
            2.0 / (num_update + 1) as f64
        } else {
            1.0 / num_update as f64
        };
        for (mean, &value) in self.root_values_means[traverser]
            .iter_mut()
            .zip(self.root_values[traverser].iter())
        {
            *mean += (value - *mean) * alpha;
        }

        let game = &self.br_solver.traversal.game;
        let tree = &self.br_solver.traversal.tree;
        let num_hands = game.num_hands();

        // Push the responder's belief mass down the tree: split by the
        // best response at its own nodes, pass through at the opponent's.
        let mut worklist: Vec<(usize, Vec<f64>)> =
            vec![(0, self.initial_beliefs[traverser].clone())];
        while let Some((node_id, beliefs)) = worklist.pop() {
            let node = tree.node(node_id);
            if node.is_leaf() {
                continue;
            }
            if node.state.player_id == traverser {
                for (child, action) in tree.children_with_actions(game, node_id) {
                    let mut child_beliefs = vec![0.0; num_hands];
                    for hand in 0..num_hands {
                        let weight = beliefs[hand] * br_strategy[node_id][hand][action];
                        self.sum_strategies[node_id][hand][action] += weight;
                        self.last_strategies[node_id][hand][action] = weight;
                        child_beliefs[hand] = weight;
                    }
                    worklist.push((child, child_beliefs));
                }
            } else {
                for child in node.children() {
                    worklist.push((child, beliefs.clone()));
                }
            }
        }

        for (node_id, node) in tree.iter().enumerate() {
            if node.is_leaf() || node.state.player_id != traverser {
                continue;
            }
            for hand in 0..num_hands {
                if self.params.linear_update {
                    let scale = (num_update + 1) as f64 / (num_update + 2) as f64;
                    for value in &mut self.sum_strategies[node_id][hand] {
                        *value *= scale;
                    }
                }
                if self.params.optimistic {
                    normalize_probabilities_sum(
                        &self.sum_strategies[node_id][hand],
                        &self.last_strategies[node_id][hand],
                        &mut self.average_strategies[node_id][hand],
                    );
                } else {
                    normalize_probabilities(
                        &self.sum_strategies[node_id][hand],
                        &mut self.average_strategies[node_id][hand],
                    );
                }
            }
        }

        self.num_strategies += 1;
    }

    fn num_iters(&self) -> usize {
        self.params.num_iters
    }

    fn get_strategy(&self) -> &TreeStrategy {
        &self.average_strategies
    }

    fn get_sampling_strategy(&self) -> &TreeStrategy {
        &self.average_strategies
    }

    fn get_hand_values(&self, player_id: usize) -> &[f64] {
        assert!(
            self.num_strategies >= 2,
            "root values need at least one step per player"
        );
        &self.root_values_means[player_id]
    }

    fn update_value_network(&self) {
        for player in 0..2 {
            self.br_solver
                .traversal
                .add_training_example(player, self.root_values_means[player].clone());
        }
    }

    fn get_tree(&self) -> &Tree {
        &self.br_solver.traversal.tree
    }

    fn write_strategy(&self, out: &mut dyn Write) -> io::Result<()> {
        write_strategy(
            &self.br_solver.traversal.game,
            &self.br_solver.traversal.tree,
            &self.average_strategies,
            out,
        )
    }
}
