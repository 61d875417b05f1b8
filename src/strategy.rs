//! Strategy tables and their construction.
//!
//! A `TreeStrategy` is a `[node][hand][action]` table; each `(node, hand)`
//! row is a probability simplex over the feasible actions at that node,
//! with zeros for infeasible actions. The same shape stores the running
//! average strategy, the per-iteration strategy, and the unnormalized
//! regret and strategy-sum accumulators.

use std::io::{self, Write};

use crate::game::Game;
use crate::public_tree::Tree;
use crate::traverser::compute_reach_probabilities;

/// `[node][hand][action]` probability (or accumulator) table.
pub type TreeStrategy = Vec<Vec<Vec<f64>>>;

/// All-zero table shaped for `tree`.
pub fn zero_strategy(game: &Game, tree: &Tree) -> TreeStrategy {
    vec![vec![vec![0.0; game.num_actions()]; game.num_hands()]; tree.len()]
}

/// Uniform probability over each node's feasible action range; zero
/// elsewhere. Leaves keep all-zero rows.
pub fn uniform_strategy(game: &Game, tree: &Tree) -> TreeStrategy {
    let mut strategy = zero_strategy(game, tree);
    for (node_id, node) in tree.iter().enumerate() {
        if node.is_leaf() {
            continue;
        }
        let range = game.action_range(&node.state);
        let probability = 1.0 / range.len() as f64;
        for hand_row in &mut strategy[node_id] {
            for action in range.clone() {
                hand_row[action] = probability;
            }
        }
    }
    strategy
}

/// Uniform strategy additionally weighted, at each player's own decision
/// nodes, by that player's reach under the uniform strategy. Seeds the
/// strategy-sum accumulators so the very first average already reflects
/// reachability.
pub fn uniform_reach_weighted_strategy(
    game: &Game,
    tree: &Tree,
    initial_beliefs: &[Vec<f64>; 2],
) -> TreeStrategy {
    let mut strategy = uniform_strategy(game, tree);
    let mut reach = vec![vec![0.0; game.num_hands()]; tree.len()];
    for traverser in 0..2 {
        compute_reach_probabilities(
            game,
            tree,
            &strategy,
            &initial_beliefs[traverser],
            traverser,
            &mut reach,
        );
        for (node_id, node) in tree.iter().enumerate() {
            if node.is_leaf() || node.state.player_id != traverser {
                continue;
            }
            let range = game.action_range(&node.state);
            for hand in 0..game.num_hands() {
                for action in range.clone() {
                    strategy[node_id][hand][action] *= reach[node_id][hand];
                }
            }
        }
    }
    strategy
}

/// Dump a strategy for manual inspection: one block per non-leaf node,
/// one probability row per private hand. Debug format, not stable.
pub fn write_strategy<W: Write + ?Sized>(
    game: &Game,
    tree: &Tree,
    strategy: &TreeStrategy,
    out: &mut W,
) -> io::Result<()> {
    assert_eq!(tree.len(), strategy.len());
    writeln!(out, "Printing strategies per node")?;
    for (node_id, node) in tree.iter().enumerate() {
        if node.is_leaf() {
            continue;
        }
        writeln!(out, "Node={}\t{}", node_id, node.state)?;
        for (hand, row) in strategy[node_id].iter().enumerate() {
            write!(out, "| hand={hand} ")?;
            for value in row {
                write!(out, "{value:.2} ")?;
            }
            if (hand + 1) % game.num_faces() == 0 {
                writeln!(out)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::public_tree::unroll_full_tree;
    use crate::solver::initial_beliefs;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_rows_sum_to_one() {
        let game = Game::standard();
        let tree = unroll_full_tree(&game, 0);
        let strategy = uniform_strategy(&game, &tree);
        for (node_id, node) in tree.iter().enumerate() {
            if node.is_leaf() {
                continue;
            }
            for row in &strategy[node_id] {
                let total: f64 = row.iter().sum();
                assert_relative_eq!(total, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn uniform_zero_outside_feasible_range() {
        let game = Game::standard();
        let tree = unroll_full_tree(&game, 0);
        let strategy = uniform_strategy(&game, &tree);
        for (node_id, node) in tree.iter().enumerate() {
            let range = game.action_range(&node.state);
            for row in &strategy[node_id] {
                for action in range.end..game.num_actions() {
                    assert_eq!(row[action], 0.0);
                }
            }
        }
    }

    #[test]
    fn reach_weighting_scales_by_own_probability() {
        let game = Game::standard();
        let tree = unroll_full_tree(&game, 0);
        let beliefs = initial_beliefs(&game);
        let weighted = uniform_reach_weighted_strategy(&game, &tree, &beliefs);

        // Root: player 0 acts with reach = prior belief.
        let prior = 1.0 / game.num_hands() as f64;
        for hand in 0..game.num_hands() {
            assert_relative_eq!(weighted[0][hand][0], prior / 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn dump_mentions_every_decision_node() {
        let game = Game::standard();
        let tree = unroll_full_tree(&game, 0);
        let strategy = uniform_strategy(&game, &tree);
        let mut buffer = Vec::new();
        write_strategy(&game, &tree, &strategy, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let decision_nodes = tree.iter().filter(|n| !n.is_leaf()).count();
        assert_eq!(text.matches("Node=").count(), decision_nodes);
    }
}
