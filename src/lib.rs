//! Approximate-Nash solver for two-player poker dice.
//!
//! The crate builds the public game tree for a dice-bidding game, carries
//! per-hand belief vectors through it, and refines a mixed strategy at
//! every decision point with either counterfactual regret minimization or
//! fictitious play. Depth-limited trees delegate their frontier values to
//! an external value function behind the [`value_net::ValueNet`] trait.

pub mod best_response;
pub mod cfr_solver;
pub mod cli;
pub mod display;
pub mod error;
pub mod fp_solver;
pub mod game;
pub mod hand_evaluator;
pub mod math_engine;
pub mod public_tree;
pub mod solver;
pub mod strategy;
pub mod traverser;
pub mod value_net;
