//! Pure scoring helpers shared by the game machines.

use serde::{Deserialize, Serialize};

/// Card counts left in a player's hand at the end of a phase-progression
/// hand, bucketed by point value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardCount {
    /// Cards 1-9, worth 5 points each.
    #[serde(default)]
    pub low: u32,
    /// Cards 10-12, worth 10 points each.
    #[serde(default)]
    pub high: u32,
    /// Skip cards, worth 15 points each.
    #[serde(default)]
    pub skip: u32,
    /// Wild cards, worth 25 points each.
    #[serde(default)]
    pub wild: u32,
}

impl CardCount {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            low: 0,
            high: 0,
            skip: 0,
            wild: 0,
        }
    }

    #[must_use]
    pub const fn total_cards(&self) -> u32 {
        self.low + self.high + self.skip + self.wild
    }
}

/// Penalty points for the cards left in hand. Weights are ordered
/// low < high < skip < wild.
#[must_use]
pub const fn score_from_card_counts(cards: &CardCount) -> u32 {
    cards.low * 5 + cards.high * 10 + cards.skip * 15 + cards.wild * 25
}

/// Canonical goal text for phases 1 through 10.
pub const PHASE_GOALS: [&str; 10] = [
    "2 sets of 3",
    "1 set of 3 + 1 run of 4",
    "1 set of 4 + 1 run of 4",
    "1 run of 7",
    "1 run of 8",
    "1 run of 9",
    "2 sets of 4",
    "7 cards of one color",
    "1 set of 5 + 1 set of 2",
    "1 set of 5 + 1 set of 3",
];

/// Goal text for a 1-based phase number, if it exists.
#[must_use]
pub fn phase_goal(phase: u8) -> Option<&'static str> {
    if phase == 0 {
        return None;
    }
    PHASE_GOALS.get(usize::from(phase) - 1).copied()
}
