//! Poker-dice hand scoring.
//!
//! A hand is the player's 2 private dice plus the 3 public dice. The five
//! faces are classified into one category and packed into a `u32` of seven
//! 3-bit fields so that two scores compare with ordinary integer ordering:
//!
//!   bits 18-20  quints      (face, 1-based, 0 if absent)
//!   bits 15-17  quads
//!   bits 12-14  straight    (lowest face; 7 marks a full house)
//!   bits  9-11  triple
//!   bits  6-8   high pair
//!   bits  3-5   low pair
//!   bits  0-2   single      (highest kicker)
//!
//! The full table over `faces^5` combinations is precomputed once and
//! shared between games via `Arc`.

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use once_cell::sync::Lazy;

/// Sentinel written into the straight field to mark a full house. A real
/// straight's lowest face never exceeds `faces - 4`, so 7 is unambiguous.
pub const FULL_HOUSE_FLAG: u32 = 7;

/// Shared table for the standard six-face dice; independent solver
/// instances (one per self-play thread) clone the `Arc`, not the table.
static STANDARD_TABLE: Lazy<Arc<Vec<u32>>> = Lazy::new(|| Arc::new(build_score_table(6)));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    FullHouse = 5,
    FourOfAKind = 6,
    FiveOfAKind = 7,
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandCategory::HighCard => write!(f, "High Card"),
            HandCategory::OnePair => write!(f, "One Pair"),
            HandCategory::TwoPair => write!(f, "Two Pair"),
            HandCategory::ThreeOfAKind => write!(f, "Three of a Kind"),
            HandCategory::Straight => write!(f, "Straight"),
            HandCategory::FullHouse => write!(f, "Full House"),
            HandCategory::FourOfAKind => write!(f, "Four of a Kind"),
            HandCategory::FiveOfAKind => write!(f, "Five of a Kind"),
        }
    }
}

/// A packed score split back into its seven fields (faces are 1-based,
/// 0 = absent). Used for display and tests, never on the solve path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreFields {
    pub single: u32,
    pub low_pair: u32,
    pub high_pair: u32,
    pub triple: u32,
    pub straight: u32,
    pub quads: u32,
    pub quints: u32,
}

impl ScoreFields {
    pub fn unpack(score: u32) -> Self {
        ScoreFields {
            single: score & 7,
            low_pair: (score >> 3) & 7,
            high_pair: (score >> 6) & 7,
            triple: (score >> 9) & 7,
            straight: (score >> 12) & 7,
            quads: (score >> 15) & 7,
            quints: (score >> 18) & 7,
        }
    }

    pub fn category(&self) -> HandCategory {
        if self.quints > 0 {
            HandCategory::FiveOfAKind
        } else if self.quads > 0 {
            HandCategory::FourOfAKind
        } else if self.straight == FULL_HOUSE_FLAG {
            HandCategory::FullHouse
        } else if self.straight > 0 {
            HandCategory::Straight
        } else if self.triple > 0 {
            HandCategory::ThreeOfAKind
        } else if self.high_pair > 0 {
            HandCategory::TwoPair
        } else if self.low_pair > 0 {
            HandCategory::OnePair
        } else {
            HandCategory::HighCard
        }
    }
}

impl fmt::Display for ScoreFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[1x={} 2lo={} 2hi={} 3x={} st={} 4x={} 5x={}]",
            self.single,
            self.low_pair,
            self.high_pair,
            self.triple,
            self.straight,
            self.quads,
            self.quints,
        )
    }
}

/// Score five dice given as 0-based face indices.
///
/// Classification works on the sorted faces with ordered equality checks;
/// exactly one category applies to any hand.
pub fn score_five(dice: [u8; 5]) -> u32 {
    let d: Vec<u8> = dice.iter().copied().sorted_unstable().collect();

    let mut single = 0u32;
    let mut low_pair = 0u32;
    let mut high_pair = 0u32;
    let mut triple = 0u32;
    let mut straight = 0u32;
    let mut quads = 0u32;
    let mut quints = 0u32;

    if d[4] == d[3] + 1 && d[3] == d[2] + 1 && d[2] == d[1] + 1 && d[1] == d[0] + 1 {
        // Lowest face of the run.
        straight = d[0] as u32 + 1;
    } else if d[0] == d[4] {
        quints = d[0] as u32 + 1;
    } else if d[0] == d[3] {
        quads = d[0] as u32 + 1;
        single = d[4] as u32 + 1;
    } else if d[1] == d[4] {
        quads = d[1] as u32 + 1;
        single = d[0] as u32 + 1;
    } else if d[0] == d[2] {
        triple = d[0] as u32 + 1;
        if d[3] == d[4] {
            high_pair = d[3] as u32 + 1;
            straight = FULL_HOUSE_FLAG;
        } else {
            single = d[4] as u32 + 1;
        }
    } else if d[1] == d[3] {
        triple = d[1] as u32 + 1;
        single = d[4] as u32 + 1;
    } else if d[2] == d[4] {
        triple = d[2] as u32 + 1;
        if d[0] == d[1] {
            high_pair = d[0] as u32 + 1;
            straight = FULL_HOUSE_FLAG;
        } else {
            single = d[1] as u32 + 1;
        }
    } else {
        // At most pairs left; find them on the sorted run.
        let pair_positions: Vec<usize> = (0..4).filter(|&i| d[i] == d[i + 1]).collect();
        match pair_positions.len() {
            0 => single = d[4] as u32 + 1,
            1 => {
                let p = pair_positions[0];
                low_pair = d[p] as u32 + 1;
                single = if p == 3 { d[2] } else { d[4] } as u32 + 1;
            }
            _ => {
                let (lo, hi) = (pair_positions[0], pair_positions[1]);
                low_pair = d[lo] as u32 + 1;
                high_pair = d[hi] as u32 + 1;
                // The one die in neither pair.
                let kicker = 10 - (lo * 2 + 1) - (hi * 2 + 1);
                single = d[kicker] as u32 + 1;
            }
        }
    }

    (((((quints << 3 | quads) << 3 | straight) << 3 | triple) << 3 | high_pair) << 3 | low_pair)
        << 3
        | single
}

/// Build the score table for all `faces^5` dice combinations.
///
/// Index layout matches the combined hand index used by `Game::score`:
/// `d0 + d1*faces + d2*faces^2 + d3*faces^3 + d4*faces^4`.
pub fn build_score_table(faces: usize) -> Vec<u32> {
    let mut table = vec![0u32; faces.pow(5)];
    for d0 in 0..faces {
        for d1 in 0..faces {
            for d2 in 0..faces {
                for d3 in 0..faces {
                    for d4 in 0..faces {
                        let index = d0
                            + d1 * faces
                            + d2 * faces.pow(2)
                            + d3 * faces.pow(3)
                            + d4 * faces.pow(4);
                        table[index] =
                            score_five([d0 as u8, d1 as u8, d2 as u8, d3 as u8, d4 as u8]);
                    }
                }
            }
        }
    }
    table
}

/// Score table handle; the standard six-face table is built once per
/// process and shared.
pub fn score_table(faces: usize) -> Arc<Vec<u32>> {
    if faces == 6 {
        Arc::clone(&STANDARD_TABLE)
    } else {
        Arc::new(build_score_table(faces))
    }
}
