//! Cross-game stakes ledger. Written at game creation, read-only afterward.

use serde::{Deserialize, Serialize};

use crate::game::GameType;

/// One recorded stake. Amount stays a string; the engine never does
/// currency arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    pub game_type: GameType,
    pub amount: String,
    pub currency: String,
    /// Player display names at the time the stake was posted.
    pub players: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<u64>,
}

impl StakeEntry {
    /// Banner text like `"5 USD"`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} {}", self.amount, self.currency)
    }
}

/// Stake parameters supplied when a game is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosting {
    pub amount: String,
    pub currency: String,
}

impl StakePosting {
    #[must_use]
    pub fn new(amount: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            currency: currency.into(),
        }
    }
}
