use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::best_response::{compute_ev2, compute_exploitability2};
use crate::display::{
    print_error, private_hand_display, public_hand_display, score_table_display, state_display,
    strategy_node_table, styled_action,
};
use crate::error::{SolverError, SolverResult};
use crate::game::{action_name, Event, Game, PartialPublicState};
use crate::hand_evaluator::score_five;
use crate::solver::{build_solver, initial_beliefs, SubgameSolver, SubgameSolvingParams};
use crate::strategy::TreeStrategy;
use crate::value_net::{ValueNet, ZeroValueNet};

#[derive(Parser)]
#[command(
    name = "dicenash",
    version = "0.1.0",
    about = "Poker dice equilibrium solver — CFR, fictitious play, and exploitability."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Algorithm {
    Cfr,
    Fp,
}

impl Algorithm {
    fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Cfr => "cfr",
            Algorithm::Fp => "fp",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one public hand and report strategy and exploitability
    Solve {
        /// Public hand index (0-215 for the standard game)
        #[arg(long = "public-hand", default_value = "152")]
        public_hand: usize,
        /// Solver iterations
        #[arg(short = 'n', long, default_value = "1024")]
        iterations: usize,
        /// Equilibrium algorithm
        #[arg(short, long, default_value = "cfr")]
        algorithm: Algorithm,
        /// Linear averaging of regrets and strategy sums
        #[arg(long)]
        linear: bool,
        /// Optimistic averaging (fp only)
        #[arg(long)]
        optimistic: bool,
        /// Discounted CFR
        #[arg(long)]
        dcfr: bool,
        /// DCFR positive-regret exponent
        #[arg(long, default_value = "1.5")]
        dcfr_alpha: f64,
        /// DCFR negative-regret exponent
        #[arg(long, default_value = "0.0")]
        dcfr_beta: f64,
        /// DCFR strategy-sum exponent
        #[arg(long, default_value = "2.0")]
        dcfr_gamma: f64,
        /// Depth limit; omit to solve the full tree
        #[arg(long)]
        depth: Option<usize>,
        /// Evaluate depth-limited leaves with an all-zero value function
        #[arg(long = "zero-net")]
        zero_net: bool,
        /// Print the strategy table for these node ids
        #[arg(long = "node")]
        nodes: Vec<usize>,
        /// Write the solution as JSON
        #[arg(long)]
        json: Option<std::path::PathBuf>,
    },
    /// Score five dice and show the hand breakdown
    Score {
        /// Five die faces, 1-6
        dice: Vec<u8>,
    },
    /// Exhibition match: CFR strategy vs fictitious-play strategy
    Play {
        /// Iterations for each solver
        #[arg(short = 'n', long, default_value = "512")]
        iterations: usize,
        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Serializable solve summary, for downstream tooling.
#[derive(Debug, Serialize, Deserialize)]
pub struct Solution {
    pub public_hand: usize,
    pub iterations: usize,
    pub algorithm: String,
    /// Per-player exploitability on the full tree; absent for
    /// depth-limited solves.
    pub exploitability: Option<[f64; 2]>,
    pub strategies: Vec<NodeStrategy>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStrategy {
    pub node_id: usize,
    pub player: usize,
    pub state: String,
    pub actions: Vec<String>,
    /// Average strategy frequencies: [hand][action].
    pub frequencies: Vec<Vec<f64>>,
}

pub fn run() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Solve {
            public_hand,
            iterations,
            algorithm,
            linear,
            optimistic,
            dcfr,
            dcfr_alpha,
            dcfr_beta,
            dcfr_gamma,
            depth,
            zero_net,
            nodes,
            json,
        } => cmd_solve(
            public_hand,
            iterations,
            algorithm,
            linear,
            optimistic,
            dcfr,
            (dcfr_alpha, dcfr_beta, dcfr_gamma),
            depth,
            zero_net,
            &nodes,
            json.as_deref(),
        ),
        Commands::Score { dice } => cmd_score(&dice),
        Commands::Play { iterations, seed } => cmd_play(iterations, seed),
    };
    if let Err(err) = result {
        print_error(&err.to_string());
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_solve(
    public_hand: usize,
    iterations: usize,
    algorithm: Algorithm,
    linear: bool,
    optimistic: bool,
    dcfr: bool,
    (dcfr_alpha, dcfr_beta, dcfr_gamma): (f64, f64, f64),
    depth: Option<usize>,
    zero_net: bool,
    nodes: &[usize],
    json: Option<&std::path::Path>,
) -> SolverResult<()> {
    let game = Game::standard();
    if public_hand >= game.num_public_hands() {
        return Err(SolverError::PublicHandOutOfRange {
            index: public_hand,
            max: game.num_public_hands() - 1,
        });
    }

    let full_depth = game.max_bid() + 2;
    let max_depth = depth.unwrap_or(full_depth);
    let full_tree = max_depth >= full_depth;

    let params = SubgameSolvingParams {
        num_iters: iterations,
        max_depth,
        linear_update: linear,
        optimistic,
        use_cfr: matches!(algorithm, Algorithm::Cfr),
        dcfr,
        dcfr_alpha,
        dcfr_beta,
        dcfr_gamma,
    };
    let value_net = zero_net.then(|| Arc::new(ZeroValueNet::new(&game)) as Arc<dyn ValueNet>);

    let root = game.initial_state(public_hand);
    let mut solver = build_solver(game.clone(), &root, initial_beliefs(&game), params, value_net)?;

    println!(
        "  {} public hand {} [{}]  |  {}  |  {} iterations",
        "Solving".bold(),
        public_hand,
        public_hand_display(&game, public_hand),
        algorithm.as_str(),
        iterations
    );

    for iter in 0..iterations {
        solver.step(iter % 2);
        // Exploitability trace at powers of two; only defined against the
        // full tree.
        if full_tree && (((iter + 1) & iter) == 0 || iter + 1 == iterations) {
            let values = compute_exploitability2(&game, solver.get_strategy(), public_hand);
            println!(
                "  iter={:8}  exploitability=({:.3e}, {:.3e})  sum={:.3e}",
                iter + 1,
                values[0],
                values[1],
                (values[0] + values[1]) / 2.0
            );
        }
    }

    for &node_id in nodes {
        if node_id < solver.get_tree().len() {
            println!();
            println!(
                "{}",
                strategy_node_table(&game, solver.get_tree(), solver.get_strategy(), node_id)
            );
        }
    }

    let exploitability = full_tree
        .then(|| compute_exploitability2(&game, solver.get_strategy(), public_hand));
    if let Some([e0, e1]) = exploitability {
        println!();
        println!("  {}  {:.5}", "Exploitability".bold(), (e0 + e1) / 2.0);
    }

    if let Some(path) = json {
        let solution = build_solution(
            &game,
            solver.as_ref(),
            public_hand,
            iterations,
            algorithm,
            exploitability,
        );
        std::fs::write(path, serde_json::to_string_pretty(&solution)?)?;
        println!("  Solution written to {}", path.display());
    }
    Ok(())
}

fn build_solution(
    game: &Game,
    solver: &dyn SubgameSolver,
    public_hand: usize,
    iterations: usize,
    algorithm: Algorithm,
    exploitability: Option<[f64; 2]>,
) -> Solution {
    let tree = solver.get_tree();
    let strategy = solver.get_strategy();
    let strategies = tree
        .iter()
        .enumerate()
        .filter(|(_, node)| !node.is_leaf())
        .map(|(node_id, node)| NodeStrategy {
            node_id,
            player: node.state.player_id,
            state: node.state.to_string(),
            actions: game
                .action_range(&node.state)
                .map(|a| action_name(a).to_string())
                .collect(),
            frequencies: strategy[node_id].clone(),
        })
        .collect();
    Solution {
        public_hand,
        iterations,
        algorithm: algorithm.as_str().to_string(),
        exploitability,
        strategies,
    }
}

fn cmd_score(dice: &[u8]) -> SolverResult<()> {
    if dice.len() != 5 {
        return Err(SolverError::WrongDiceCount {
            need: 5,
            got: dice.len(),
        });
    }
    let mut faces = [0u8; 5];
    for (slot, &die) in faces.iter_mut().zip(dice.iter()) {
        if !(1..=6).contains(&die) {
            return Err(SolverError::InvalidFace(die.to_string()));
        }
        *slot = die - 1;
    }
    let score = score_five(faces);
    println!("{}", score_table_display(score));
    Ok(())
}

fn cmd_play(iterations: usize, seed: Option<u64>) -> SolverResult<()> {
    let game = Game::standard();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let public_hand = rng.gen_range(0..game.num_public_hands());
    let hands = [
        rng.gen_range(0..game.num_hands()),
        rng.gen_range(0..game.num_hands()),
    ];

    println!(
        "\n  {}  CFR is Player 0, fictitious play is Player 1",
        "New game".bold()
    );
    println!("  Public dice:  {}", public_hand_display(&game, public_hand));
    println!("  P0 holds:     {}", private_hand_display(&game, hands[0]));
    println!("  P1 holds:     {}", private_hand_display(&game, hands[1]));

    let root = game.initial_state(public_hand);
    let beliefs = initial_beliefs(&game);
    let full_depth = game.max_bid() + 2;

    let cfr_params = SubgameSolvingParams {
        num_iters: iterations,
        max_depth: full_depth,
        use_cfr: true,
        linear_update: true,
        ..Default::default()
    };
    let fp_params = SubgameSolvingParams {
        num_iters: iterations,
        max_depth: full_depth,
        linear_update: true,
        ..Default::default()
    };

    let mut cfr = build_solver(game.clone(), &root, beliefs.clone(), cfr_params, None)?;
    let mut fp = build_solver(game.clone(), &root, beliefs, fp_params, None)?;
    cfr.multistep();
    fp.multistep();

    let strategies: [&TreeStrategy; 2] = [cfr.get_strategy(), fp.get_strategy()];

    let mut state = root;
    let mut node_id = 0usize;
    println!();
    while !game.is_terminal(&state) {
        println!("  {}", state_display(&state));
        let player = state.player_id;
        let row = &strategies[player][node_id][hands[player]];
        let action = sample_action(&mut rng, row, &game, &state);
        println!("    P{} chooses {}", player, styled_action(action));

        // Children are laid out in action order right after the ones
        // already visited; re-find the child index in the shared tree.
        let tree = if player == 0 { cfr.get_tree() } else { fp.get_tree() };
        let child = tree
            .children_with_actions(&game, node_id)
            .find(|&(_, a)| a == action)
            .map(|(child, _)| child)
            .expect("feasible action must have a child");
        node_id = child;
        state = game.act(&state, action);
    }

    println!();
    match state.event {
        Event::Folded => {
            println!(
                "  Player {} wins {} (opponent folded)",
                state.player_id,
                state.last_bid - 1
            );
        }
        Event::Called => {
            let value = game.utility(hands[0], hands[1], public_hand);
            if value == 0.5 {
                println!("  Tie at bid {}", state.last_bid);
            } else {
                let winner = if value == 1.0 { 0 } else { 1 };
                println!("  Player {} wins {} at showdown", winner, state.last_bid);
            }
        }
        Event::InProgress => unreachable!(),
    }

    let ev = compute_ev2(&game, strategies[0], strategies[1], public_hand);
    println!(
        "\n  Head-to-head EV (CFR perspective): as P0 {:+.4}, as P1 {:+.4}",
        ev[0], ev[1]
    );
    Ok(())
}

fn sample_action(rng: &mut StdRng, row: &[f64], game: &Game, state: &PartialPublicState) -> usize {
    let range = game.action_range(state);
    let total: f64 = range.clone().map(|a| row[a]).sum();
    let mut draw = rng.gen::<f64>() * total;
    for action in range.clone() {
        draw -= row[action];
        if draw <= 0.0 {
            return action;
        }
    }
    range.end - 1
}
