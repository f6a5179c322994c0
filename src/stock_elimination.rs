//! Stock-elimination machine: pile counters plus a generic partial-state
//! merge. Move legality and win detection live with the caller; the engine
//! only keeps the authoritative counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::audit::PauseSnapshot;
use crate::game::GameStatus;
use crate::player::Player;

/// Discard and build piles are top-card stacks of card values.
pub type CardPile = Vec<u8>;

/// Each player gets four discard piles; the table shares four build piles.
pub const PILES_PER_SET: usize = 4;

/// Starting hand size for every player.
pub const INITIAL_HAND_SIZE: u32 = 5;

/// Stock size by table size: 30 cards up to four players, 20 beyond.
#[must_use]
pub const fn initial_stock_count(player_count: usize) -> u32 {
    if player_count <= 4 { 30 } else { 20 }
}

/// Why a state merge was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StockError {
    #[error("game is already completed")]
    GameCompleted,
    #[error("player {0:?} is not in the roster")]
    UnknownPlayer(String),
}

/// Partial update of the mutable fields. Present fields replace the stored
/// value wholesale; absent fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdate {
    #[serde(default)]
    pub current_player_id: Option<String>,
    #[serde(default)]
    pub stock_piles: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub hand_sizes: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub discard_piles: Option<BTreeMap<String, [CardPile; PILES_PER_SET]>>,
    #[serde(default)]
    pub build_piles: Option<[CardPile; PILES_PER_SET]>,
}

/// Authoritative state of one stock-elimination game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockGame {
    pub id: String,
    pub players: Vec<Player>,
    pub current_dealer_id: String,
    pub current_player_id: String,
    pub stock_piles: BTreeMap<String, u32>,
    pub hand_sizes: BTreeMap<String, u32>,
    pub discard_piles: BTreeMap<String, [CardPile; PILES_PER_SET]>,
    pub build_piles: [CardPile; PILES_PER_SET],
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    pub status: GameStatus,
}

impl StockGame {
    /// Build a fresh game with full stock piles and dealt hand counts.
    /// Roster is assumed validated.
    #[must_use]
    pub fn new(id: String, players: Vec<Player>, dealer_id: String, now: u64) -> Self {
        let stock = initial_stock_count(players.len());
        let stock_piles = players.iter().map(|p| (p.id.clone(), stock)).collect();
        let hand_sizes = players
            .iter()
            .map(|p| (p.id.clone(), INITIAL_HAND_SIZE))
            .collect();
        let discard_piles = players
            .iter()
            .map(|p| (p.id.clone(), std::array::from_fn(|_| CardPile::new())))
            .collect();
        let current_player_id = players
            .iter()
            .find(|p| p.id != dealer_id)
            .map_or_else(|| dealer_id.clone(), |p| p.id.clone());
        Self {
            id,
            players,
            current_dealer_id: dealer_id,
            current_player_id,
            stock_piles,
            hand_sizes,
            discard_piles,
            build_piles: std::array::from_fn(|_| CardPile::new()),
            started_at: now,
            ended_at: None,
            winner_id: None,
            status: GameStatus::Active,
        }
    }

    #[must_use]
    pub fn stock_remaining(&self, player_id: &str) -> u32 {
        self.stock_piles.get(player_id).copied().unwrap_or(0)
    }

    /// Apply a partial-state merge. The caller is trusted to send only
    /// deltas that correspond to legal play.
    ///
    /// # Errors
    ///
    /// Returns [`StockError`] when the game is completed or the update
    /// names a player outside the roster. The game is unchanged on error.
    pub fn merge_state(&mut self, update: StockUpdate) -> Result<(), StockError> {
        if self.status == GameStatus::Completed {
            return Err(StockError::GameCompleted);
        }
        let known = |id: &str| self.players.iter().any(|p| p.id == id);
        if let Some(player_id) = &update.current_player_id {
            if !known(player_id) {
                return Err(StockError::UnknownPlayer(player_id.clone()));
            }
        }
        for map_keys in [
            update.stock_piles.as_ref().map(|m| m.keys()),
            update.hand_sizes.as_ref().map(|m| m.keys()),
        ]
        .into_iter()
        .flatten()
        {
            for key in map_keys {
                if !known(key) {
                    return Err(StockError::UnknownPlayer(key.clone()));
                }
            }
        }
        if let Some(piles) = &update.discard_piles {
            for key in piles.keys() {
                if !known(key) {
                    return Err(StockError::UnknownPlayer(key.clone()));
                }
            }
        }

        if let Some(current_player_id) = update.current_player_id {
            self.current_player_id = current_player_id;
        }
        if let Some(stock_piles) = update.stock_piles {
            self.stock_piles = stock_piles;
        }
        if let Some(hand_sizes) = update.hand_sizes {
            self.hand_sizes = hand_sizes;
        }
        if let Some(discard_piles) = update.discard_piles {
            self.discard_piles = discard_piles;
        }
        if let Some(build_piles) = update.build_piles {
            self.build_piles = build_piles;
        }
        Ok(())
    }

    /// Minimal resume-banner summary. Remaining stock doubles as the
    /// score display.
    #[must_use]
    pub fn build_pause_snapshot(&self) -> PauseSnapshot {
        PauseSnapshot {
            dealer_id: self.current_dealer_id.clone(),
            current_player_id: self.current_player_id.clone(),
            round: None,
            scores: Some(self.stock_piles.clone()),
        }
    }
}
