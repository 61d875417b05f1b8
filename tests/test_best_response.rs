//! Best-response and exploitability behavior.

use approx::assert_relative_eq;

use dicenash::best_response::{
    average_exploitability, compute_ev, compute_ev2, compute_exploitability,
    compute_exploitability2, BrSolver,
};
use dicenash::game::{Game, CALL, FOLD};
use dicenash::public_tree::unroll_full_tree;
use dicenash::solver::{build_solver, initial_beliefs, SubgameSolver, SubgameSolvingParams};
use dicenash::strategy::{uniform_strategy, zero_strategy, TreeStrategy};

const PUBLIC_HAND: usize = 7;

fn solved_strategy(game: &Game, iters: usize) -> TreeStrategy {
    let params = SubgameSolvingParams {
        num_iters: iters,
        max_depth: game.max_bid() + 2,
        use_cfr: true,
        linear_update: true,
        ..Default::default()
    };
    let mut solver = build_solver(
        game.clone(),
        &game.initial_state(PUBLIC_HAND),
        initial_beliefs(game),
        params,
        None,
    )
    .unwrap();
    solver.multistep();
    solver.get_strategy().clone()
}

#[test]
fn br_strategy_is_one_hot_at_own_nodes() {
    let game = Game::standard();
    let tree = unroll_full_tree(&game, PUBLIC_HAND);
    let opponent = uniform_strategy(&game, &tree);
    let mut solver = BrSolver::new(game.clone(), tree, None).unwrap();
    let beliefs = initial_beliefs(&game);

    for traverser in 0..2 {
        let (br, _) = solver.compute_br(traverser, &opponent, &beliefs);
        for (node_id, node) in solver.traversal.tree.iter().enumerate() {
            if node.is_leaf() || node.state.player_id != traverser {
                continue;
            }
            let range = game.action_range(&node.state);
            for row in &br[node_id] {
                assert_eq!(row.iter().filter(|&&p| p == 1.0).count(), 1);
                assert_eq!(row.iter().filter(|&&p| p == 0.0).count(), row.len() - 1);
                // The chosen action is feasible.
                let chosen = row.iter().position(|&p| p == 1.0).unwrap();
                assert!(range.contains(&chosen));
            }
        }
    }
}

#[test]
fn br_is_deterministic() {
    let game = Game::standard();
    let tree = unroll_full_tree(&game, PUBLIC_HAND);
    let mut all_fold = zero_strategy(&game, &tree);
    for (node_id, node) in tree.iter().enumerate() {
        if node.is_leaf() {
            continue;
        }
        for row in &mut all_fold[node_id] {
            row[FOLD] = 1.0;
        }
    }
    let mut solver = BrSolver::new(game.clone(), tree, None).unwrap();
    let beliefs = initial_beliefs(&game);
    let (br, values) = solver.compute_br(0, &all_fold, &beliefs);
    let (br_again, values_again) = solver.compute_br(0, &all_fold, &beliefs);
    assert_eq!(br, br_again);
    assert_eq!(values, values_again);
}

#[test]
fn exploitability_decreases_with_solving() {
    let game = Game::standard();
    let tree = unroll_full_tree(&game, PUBLIC_HAND);
    let uniform = uniform_strategy(&game, &tree);
    let solved = solved_strategy(&game, 2048);

    let uniform_exploitability = compute_exploitability(&game, &uniform, PUBLIC_HAND);
    let solved_exploitability = compute_exploitability(&game, &solved, PUBLIC_HAND);
    assert!(
        solved_exploitability < uniform_exploitability,
        "solving must reduce exploitability ({uniform_exploitability} -> {solved_exploitability})"
    );
}

#[test]
fn exploitability_pair_is_consistent_with_mean() {
    let game = Game::standard();
    let tree = unroll_full_tree(&game, PUBLIC_HAND);
    let uniform = uniform_strategy(&game, &tree);
    let pair = compute_exploitability2(&game, &uniform, PUBLIC_HAND);
    let mean = compute_exploitability(&game, &uniform, PUBLIC_HAND);
    assert_relative_eq!(mean, (pair[0] + pair[1]) / 2.0, epsilon = 1e-12);
}

#[test]
fn ev_of_identical_strategies_is_antisymmetric() {
    let game = Game::standard();
    let tree = unroll_full_tree(&game, PUBLIC_HAND);
    let uniform = uniform_strategy(&game, &tree);
    let [as_first, as_second] = compute_ev2(&game, &uniform, &uniform, PUBLIC_HAND);
    assert_relative_eq!(as_first, -as_second, epsilon = 1e-9);
}

#[test]
fn solved_strategy_beats_uniform_head_to_head() {
    let game = Game::standard();
    let tree = unroll_full_tree(&game, PUBLIC_HAND);
    let uniform = uniform_strategy(&game, &tree);
    let solved = solved_strategy(&game, 2048);
    let [as_first, as_second] = compute_ev2(&game, &solved, &uniform, PUBLIC_HAND);
    assert!(
        as_first + as_second > 0.0,
        "equilibrium strategy should profit against uniform: {as_first} + {as_second}"
    );
}

#[test]
fn average_exploitability_over_small_game() {
    // Three faces keep the public-hand sweep cheap: 27 hands in parallel.
    let game = Game::new(2, 3, 4);
    let mean = average_exploitability(&game, |public_hand| {
        let tree = unroll_full_tree(&game, public_hand);
        uniform_strategy(&game, &tree)
    });
    assert!(mean > 0.0, "uniform play is exploitable on average");
    assert!(mean.is_finite());
}

#[test]
fn always_call_ev_matches_win_probabilities() {
    let game = Game::standard();
    let tree = unroll_full_tree(&game, PUBLIC_HAND);
    // Both players call at the first opportunity: the game always ends at
    // the root's call child with last_bid 2.
    let mut always_call = zero_strategy(&game, &tree);
    for (node_id, node) in tree.iter().enumerate() {
        if node.is_leaf() {
            continue;
        }
        for row in &mut always_call[node_id] {
            row[CALL] = 1.0;
        }
    }
    let values = compute_ev(&game, &always_call, &always_call, PUBLIC_HAND);
    // Per-hand value = 2 * (2 * win_mass - 1), bounded by the pot.
    for &value in &values {
        assert!(value.abs() <= 2.0 + 1e-9);
    }
    let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
    assert_relative_eq!(mean, 0.0, epsilon = 1e-9);
}
