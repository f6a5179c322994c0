//! Player roster types and construction-time validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A participant in a game. Identity is stable for the game's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Player {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
        }
    }

    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// Allowed roster size range for a game variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLimits {
    pub min: usize,
    pub max: usize,
}

impl PlayerLimits {
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// Why a proposed roster cannot form a game.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("needs at least {min} players (got {actual})")]
    TooFewPlayers { min: usize, actual: usize },
    #[error("allows at most {max} players (got {actual})")]
    TooManyPlayers { max: usize, actual: usize },
    #[error("player id may not be empty")]
    EmptyPlayerId,
    #[error("duplicate player id {0:?}")]
    DuplicatePlayerId(String),
    #[error("dealer {0:?} is not in the roster")]
    DealerNotInRoster(String),
}

/// Validate a roster before a game instance is created.
///
/// # Errors
///
/// Returns a [`RosterError`] when the roster size is out of range, ids are
/// empty or duplicated, or the starting dealer is not part of the roster.
pub fn validate_roster(
    players: &[Player],
    limits: PlayerLimits,
    dealer_id: &str,
) -> Result<(), RosterError> {
    if players.len() < limits.min {
        return Err(RosterError::TooFewPlayers {
            min: limits.min,
            actual: players.len(),
        });
    }
    if players.len() > limits.max {
        return Err(RosterError::TooManyPlayers {
            max: limits.max,
            actual: players.len(),
        });
    }
    let mut seen = HashSet::with_capacity(players.len());
    for player in players {
        if player.id.is_empty() {
            return Err(RosterError::EmptyPlayerId);
        }
        if !seen.insert(player.id.as_str()) {
            return Err(RosterError::DuplicatePlayerId(player.id.clone()));
        }
    }
    if !players.iter().any(|p| p.id == dealer_id) {
        return Err(RosterError::DealerNotInRoster(dealer_id.to_string()));
    }
    Ok(())
}
