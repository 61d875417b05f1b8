//! Boundary to the external value function.
//!
//! Depth-limited trees end in non-terminal pseudo-leaves; their values come
//! from an external estimator queried through [`ValueNet`]. The solver side
//! of the contract is a synchronous batched call: collect every pseudo-leaf
//! query, send one batch, get one per-hand value vector back per query.
//! Implementations must tolerate concurrent read-only queries from
//! independent solver instances.

use crate::game::{Game, PartialPublicState};
use crate::math_engine::{normalize_probabilities_safe, REACH_SMOOTHING_EPS};

/// Encoded query width for `game`: player id, traverser, one-hot bid,
/// one-hot public hand, then both players' normalized reach vectors.
pub fn query_size(game: &Game) -> usize {
    1 + 1 + game.max_bid() + game.num_public_hands() + game.num_hands() * 2
}

/// Encode one query into `buffer`, which must be `query_size` long.
/// Reach vectors are normalized with additive smoothing so an all-zero
/// row (a provably eliminated belief) stays representable.
pub fn write_query(
    game: &Game,
    traverser: usize,
    state: &PartialPublicState,
    reaches0: &[f64],
    reaches1: &[f64],
    buffer: &mut [f32],
) {
    assert_eq!(buffer.len(), query_size(game));
    let mut index = 0;
    buffer[index] = state.player_id as f32;
    index += 1;
    buffer[index] = traverser as f32;
    index += 1;

    for bid in 0..game.max_bid() {
        buffer[index] = (bid == state.last_bid) as u8 as f32;
        index += 1;
    }
    for public_hand in 0..game.num_public_hands() {
        buffer[index] = (public_hand == state.public_hand) as u8 as f32;
        index += 1;
    }

    let mut normalized = vec![0.0f64; game.num_hands()];
    for reaches in [reaches0, reaches1] {
        normalize_probabilities_safe(reaches, REACH_SMOOTHING_EPS, &mut normalized);
        for &value in &normalized {
            buffer[index] = value as f32;
            index += 1;
        }
    }
    debug_assert_eq!(index, buffer.len());
}

/// Allocating variant of [`write_query`].
pub fn encode_query(
    game: &Game,
    traverser: usize,
    state: &PartialPublicState,
    reaches0: &[f64],
    reaches1: &[f64],
) -> Vec<f32> {
    let mut buffer = vec![0.0f32; query_size(game)];
    write_query(game, traverser, state, reaches0, reaches1, &mut buffer);
    buffer
}

/// External per-unit-mass value estimator.
///
/// `compute_values` returns one vector of per-hand values for each query,
/// in order. `add_training_example` hands a solved query/target pair to
/// the training side; the receiving buffer is expected to provide its own
/// thread-safe enqueue.
pub trait ValueNet: Send + Sync {
    fn compute_values(&self, queries: &[Vec<f32>]) -> Vec<Vec<f64>>;
    fn add_training_example(&self, query: Vec<f32>, values: Vec<f64>);
}

/// Estimator that values every hand at zero and discards training
/// examples. Lets depth-limited solves run without a trained net.
pub struct ZeroValueNet {
    num_hands: usize,
}

impl ZeroValueNet {
    pub fn new(game: &Game) -> Self {
        ZeroValueNet {
            num_hands: game.num_hands(),
        }
    }
}

impl ValueNet for ZeroValueNet {
    fn compute_values(&self, queries: &[Vec<f32>]) -> Vec<Vec<f64>> {
        queries.iter().map(|_| vec![0.0; self.num_hands]).collect()
    }

    fn add_training_example(&self, _query: Vec<f32>, _values: Vec<f64>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn query_width_standard_game() {
        let game = Game::standard();
        // 1 + 1 + 9 + 216 + 36 + 36
        assert_eq!(query_size(&game), 299);
    }

    #[test]
    fn bid_and_public_hand_one_hot() {
        let game = Game::standard();
        let state = game.act(&game.initial_state(5), crate::game::RAISE);
        let reaches = vec![1.0 / 36.0; 36];
        let query = encode_query(&game, 1, &state, &reaches, &reaches);

        assert_eq!(query[0], state.player_id as f32);
        assert_eq!(query[1], 1.0);

        let bids = &query[2..2 + 9];
        assert_eq!(bids.iter().filter(|&&v| v == 1.0).count(), 1);
        assert_eq!(bids[3], 1.0);

        let publics = &query[11..11 + 216];
        assert_eq!(publics.iter().filter(|&&v| v == 1.0).count(), 1);
        assert_eq!(publics[5], 1.0);
    }

    #[test]
    fn reach_blocks_are_normalized() {
        let game = Game::standard();
        let state = game.initial_state(0);
        let mut reaches = vec![0.0; 36];
        reaches[4] = 0.2;
        reaches[9] = 0.6;
        let query = encode_query(&game, 0, &state, &reaches, &reaches);

        for block in [&query[227..263], &query[263..299]] {
            let total: f32 = block.iter().sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-5);
        }
        assert!(query[227 + 9] > query[227 + 4]);
    }

    #[test]
    fn zero_mass_reach_encodable() {
        let game = Game::standard();
        let state = game.initial_state(0);
        let zeros = vec![0.0; 36];
        let query = encode_query(&game, 0, &state, &zeros, &zeros);
        let block = &query[227..263];
        let total: f32 = block.iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_net_shapes_match() {
        let game = Game::standard();
        let net = ZeroValueNet::new(&game);
        let queries = vec![vec![0.0f32; query_size(&game)]; 3];
        let values = net.compute_values(&queries);
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|v| v.len() == 36));
    }
}
