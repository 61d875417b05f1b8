//! Game rules for two-player poker dice.
//!
//! Each player rolls `num_dice` private dice; three public dice are shared.
//! Player 0 implicitly opens the bidding at 1, so the first decision state
//! carries a standing bid of 2. Players alternate fold / call / raise until
//! someone folds (conceding `last_bid - 1`) or calls (showdown for
//! `last_bid`, decided by the hand evaluator over all five dice).

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::hand_evaluator::score_table;

/// Action id. Feasible actions at a state always form a contiguous range
/// starting at 0, which is what lets tree children map 1:1 onto actions.
pub type Action = usize;

pub const FOLD: Action = 0;
pub const CALL: Action = 1;
pub const RAISE: Action = 2;
pub const NUM_ACTIONS: usize = 3;

pub fn action_name(action: Action) -> &'static str {
    match action {
        FOLD => "fold",
        CALL => "call",
        RAISE => "raise",
        _ => panic!("unknown action {action}"),
    }
}

/// How a betting sequence ended, if it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    InProgress,
    Folded,
    Called,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::InProgress => write!(f, "raise"),
            Event::Folded => write!(f, "fold"),
            Event::Called => write!(f, "call"),
        }
    }
}

/// A public decision point: everything both players can observe. The
/// public hand is fixed at the deal and carried unchanged through every
/// descendant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialPublicState {
    pub last_bid: usize,
    pub event: Event,
    pub player_id: usize,
    pub public_hand: usize,
}

impl PartialPublicState {
    pub fn is_terminal(&self) -> bool {
        self.event != Event::InProgress
    }
}

impl fmt::Display for PartialPublicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(pid={},pub-hand={},last={},event={})",
            self.player_id, self.public_hand, self.last_bid, self.event
        )
    }
}

/// Immutable game definition. Cheap to clone: the score table is behind an
/// `Arc` and shared between instances.
#[derive(Clone)]
pub struct Game {
    num_dice: usize,
    num_faces: usize,
    max_bid: usize,
    num_hands: usize,
    num_public_hands: usize,
    scores: Arc<Vec<u32>>,
}

impl Game {
    /// A game with `num_dice` private dice per player and `num_faces`-sided
    /// dice. Public dice fill the hand up to five. Bids run 1..=max_bid.
    pub fn new(num_dice: usize, num_faces: usize, max_bid: usize) -> Self {
        assert!(num_dice >= 1 && num_dice < 5, "private dice must be 1..=4");
        assert!(num_faces >= 2 && num_faces <= 6, "faces must be 2..=6");
        assert!(max_bid >= 2, "max_bid must leave room for the opening bid");
        Game {
            num_dice,
            num_faces,
            max_bid,
            num_hands: num_faces.pow(num_dice as u32),
            num_public_hands: num_faces.pow(5 - num_dice as u32),
            scores: score_table(num_faces),
        }
    }

    /// The standard configuration: 2 private dice, 6 faces, bids up to 9.
    pub fn standard() -> Self {
        Game::new(2, 6, 9)
    }

    pub fn num_dice(&self) -> usize {
        self.num_dice
    }

    pub fn num_faces(&self) -> usize {
        self.num_faces
    }

    pub fn max_bid(&self) -> usize {
        self.max_bid
    }

    /// Distinct private hands per player (realizations of the chance deal).
    pub fn num_hands(&self) -> usize {
        self.num_hands
    }

    /// Distinct public dice combinations.
    pub fn num_public_hands(&self) -> usize {
        self.num_public_hands
    }

    /// Maximum number of actions at any state.
    pub fn num_actions(&self) -> usize {
        NUM_ACTIONS
    }

    /// Upper bound on tree depth: the bid can only rise `max_bid` times.
    pub fn max_depth(&self) -> usize {
        self.max_bid
    }

    /// The state right after player 0's forced opening bid.
    pub fn initial_state(&self, public_hand: usize) -> PartialPublicState {
        assert!(
            public_hand < self.num_public_hands,
            "public hand {public_hand} out of range"
        );
        PartialPublicState {
            last_bid: 2,
            event: Event::InProgress,
            player_id: 0,
            public_hand,
        }
    }

    /// Feasible actions at `state` as a contiguous id range. Terminal
    /// states have none; at the bid cap only fold and call remain.
    pub fn action_range(&self, state: &PartialPublicState) -> Range<Action> {
        if state.is_terminal() {
            0..0
        } else if state.last_bid == self.max_bid {
            0..2
        } else {
            0..3
        }
    }

    pub fn is_terminal(&self, state: &PartialPublicState) -> bool {
        state.is_terminal()
    }

    /// Apply `action`, producing the successor state. The action must lie
    /// in `action_range(state)`; anything else is a caller bug.
    pub fn act(&self, state: &PartialPublicState, action: Action) -> PartialPublicState {
        let range = self.action_range(state);
        assert!(
            range.contains(&action),
            "action {action} infeasible at {state}"
        );
        let (last_bid, event) = match action {
            FOLD => (state.last_bid, Event::Folded),
            CALL => (state.last_bid, Event::Called),
            _ => (state.last_bid + 1, Event::InProgress),
        };
        PartialPublicState {
            last_bid,
            event,
            player_id: 1 - state.player_id,
            public_hand: state.public_hand,
        }
    }

    /// The action that produced `state` from its parent. Transitions are
    /// injective on the event/bid pair, so the state alone determines it.
    pub fn deduce_last_action(&self, state: &PartialPublicState) -> Action {
        match state.event {
            Event::InProgress => RAISE,
            Event::Folded => FOLD,
            Event::Called => CALL,
        }
    }

    /// Packed score of a private hand combined with the public dice.
    pub fn score(&self, hand: usize, public_hand: usize) -> u32 {
        assert!(hand < self.num_hands, "hand {hand} out of range");
        assert!(
            public_hand < self.num_public_hands,
            "public hand {public_hand} out of range"
        );
        self.scores[public_hand * self.num_hands + hand]
    }

    /// Showdown utility for `my_hand` against `op_hand`: 1 on a win, 0 on
    /// a loss, exactly 0.5 on a tie.
    pub fn utility(&self, my_hand: usize, op_hand: usize, public_hand: usize) -> f64 {
        let my_score = self.score(my_hand, public_hand);
        let op_score = self.score(op_hand, public_hand);
        match my_score.cmp(&op_score) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Less => 0.0,
            std::cmp::Ordering::Equal => 0.5,
        }
    }

    /// 0-based faces of a private hand index, lowest digit first.
    pub fn private_faces(&self, hand: usize) -> Vec<u8> {
        let mut faces = Vec::with_capacity(self.num_dice);
        let mut rest = hand;
        for _ in 0..self.num_dice {
            faces.push((rest % self.num_faces) as u8);
            rest /= self.num_faces;
        }
        faces
    }

    /// 0-based faces of a public hand index, lowest digit first.
    pub fn public_faces(&self, public_hand: usize) -> Vec<u8> {
        let num_public = 5 - self.num_dice;
        let mut faces = Vec::with_capacity(num_public);
        let mut rest = public_hand;
        for _ in 0..num_public {
            faces.push((rest % self.num_faces) as u8);
            rest /= self.num_faces;
        }
        faces
    }
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("num_dice", &self.num_dice)
            .field("num_faces", &self.num_faces)
            .field("max_bid", &self.max_bid)
            .finish()
    }
}
