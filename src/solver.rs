//! Solver configuration and the common solver contract.

use std::io::{self, Write};
use std::sync::Arc;

use crate::cfr_solver::CfrSolver;
use crate::error::{SolverError, SolverResult};
use crate::fp_solver::FpSolver;
use crate::game::{Game, PartialPublicState};
use crate::public_tree::{unroll_tree, Tree};
use crate::strategy::TreeStrategy;
use crate::value_net::ValueNet;

/// Numeric configuration for a single subgame solve.
#[derive(Debug, Clone)]
pub struct SubgameSolvingParams {
    pub num_iters: usize,
    pub max_depth: usize,
    /// Linear averaging: discount regrets and strategy sums by t/(t+1).
    pub linear_update: bool,
    /// FP only: count the last strategy once more in the average.
    pub optimistic: bool,
    /// Select CFR instead of fictitious play.
    pub use_cfr: bool,
    /// Discounted CFR with the three exponents below.
    pub dcfr: bool,
    pub dcfr_alpha: f64,
    pub dcfr_beta: f64,
    pub dcfr_gamma: f64,
}

impl Default for SubgameSolvingParams {
    fn default() -> Self {
        SubgameSolvingParams {
            num_iters: 10,
            max_depth: 2,
            linear_update: false,
            optimistic: false,
            use_cfr: false,
            dcfr: false,
            dcfr_alpha: 0.0,
            dcfr_beta: 0.0,
            dcfr_gamma: 0.0,
        }
    }
}

impl SubgameSolvingParams {
    /// Configuration errors are fatal and detected before any solving.
    pub fn validate(&self) -> SolverResult<()> {
        if self.linear_update && self.dcfr {
            return Err(SolverError::ConflictingDiscountModes);
        }
        if self.num_iters == 0 {
            return Err(SolverError::NoIterations);
        }
        Ok(())
    }
}

/// Uniform prior over private hands for both players.
pub fn initial_beliefs(game: &Game) -> [Vec<f64>; 2] {
    let uniform = vec![1.0 / game.num_hands() as f64; game.num_hands()];
    [uniform.clone(), uniform]
}

/// Common contract of the equilibrium solvers. A solver owns its tree and
/// strategy tables exclusively; independent instances share nothing
/// mutable, so parallelism happens across instances, never inside one.
pub trait SubgameSolver {
    /// One iteration for `traverser`. Callers alternate 0, 1, 0, ...
    fn step(&mut self, traverser: usize);

    /// Run `num_iters` alternating steps.
    fn multistep(&mut self) {
        for iter in 0..self.num_iters() {
            self.step(iter % 2);
        }
    }

    fn num_iters(&self) -> usize;

    /// The running average strategy: the equilibrium estimate.
    fn get_strategy(&self) -> &TreeStrategy;

    /// The last per-iteration strategy, for action sampling.
    fn get_sampling_strategy(&self) -> &TreeStrategy;

    /// Smoothed per-hand values at the root for `player_id`.
    fn get_hand_values(&self, player_id: usize) -> &[f64];

    /// Submit the root query and current root values to the value net's
    /// training side, for both traversers.
    fn update_value_network(&self);

    fn get_tree(&self) -> &Tree;

    fn write_strategy(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Build the solver the params ask for, over a tree unrolled to
/// `params.max_depth` from `root`.
pub fn build_solver(
    game: Game,
    root: &PartialPublicState,
    beliefs: [Vec<f64>; 2],
    params: SubgameSolvingParams,
    value_net: Option<Arc<dyn ValueNet>>,
) -> SolverResult<Box<dyn SubgameSolver>> {
    params.validate()?;
    let tree = unroll_tree(&game, root, params.max_depth);
    if params.use_cfr {
        Ok(Box::new(CfrSolver::new(game, tree, value_net, beliefs, params)?))
    } else {
        Ok(Box::new(FpSolver::new(game, tree, value_net, beliefs, params)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_discount_modes_rejected() {
        let params = SubgameSolvingParams {
            use_cfr: true,
            linear_update: true,
            dcfr: true,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(SolverError::ConflictingDiscountModes)
        ));
    }

    #[test]
    fn default_params_validate() {
        assert!(SubgameSolvingParams::default().validate().is_ok());
    }

    #[test]
    fn beliefs_are_uniform() {
        let game = Game::standard();
        let beliefs = initial_beliefs(&game);
        for player in 0..2 {
            assert_eq!(beliefs[player].len(), 36);
            for &b in &beliefs[player] {
                assert_eq!(b, 1.0 / 36.0);
            }
        }
    }
}
