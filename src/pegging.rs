//! Pegging machine: cumulative score tracking with a two-peg board and a
//! fixed winning threshold. There is no per-event history, so individual
//! point awards cannot be undone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::audit::PauseSnapshot;
use crate::game::GameStatus;
use crate::player::Player;

/// First player to reach this score wins.
pub const WINNING_SCORE: u32 = 121;

/// Two-peg leapfrog position for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PegState {
    pub player_id: String,
    pub front_peg: u32,
    pub back_peg: u32,
}

/// Why a score update was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeggingError {
    #[error("game is already completed")]
    GameCompleted,
    #[error("player {0:?} is not in the roster")]
    UnknownPlayer(String),
}

/// Result of a score update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOutcome {
    pub new_score: u32,
    /// Set when this update crossed the winning threshold.
    pub winner_id: Option<String>,
}

/// Authoritative state of one pegging game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeggingGame {
    pub id: String,
    pub players: Vec<Player>,
    pub current_dealer_id: String,
    pub scores: BTreeMap<String, u32>,
    pub peg_state: Vec<PegState>,
    pub round: u32,
    pub who_has_crib: String,
    pub current_player_id: String,
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_snapshot: Option<PauseSnapshot>,
}

impl PeggingGame {
    /// Build a fresh game. The crib starts with the dealer; the first
    /// non-dealer seat plays first. Roster is assumed validated.
    #[must_use]
    pub fn new(id: String, players: Vec<Player>, dealer_id: String, now: u64) -> Self {
        let scores = players.iter().map(|p| (p.id.clone(), 0)).collect();
        let peg_state = players
            .iter()
            .map(|p| PegState {
                player_id: p.id.clone(),
                front_peg: 0,
                back_peg: 0,
            })
            .collect();
        let current_player_id = players
            .iter()
            .find(|p| p.id != dealer_id)
            .map_or_else(|| dealer_id.clone(), |p| p.id.clone());
        Self {
            id,
            players,
            current_dealer_id: dealer_id.clone(),
            scores,
            peg_state,
            round: 1,
            who_has_crib: dealer_id,
            current_player_id,
            started_at: now,
            ended_at: None,
            winner_id: None,
            status: GameStatus::Active,
            pause_snapshot: None,
        }
    }

    #[must_use]
    pub fn score_of(&self, player_id: &str) -> u32 {
        self.scores.get(player_id).copied().unwrap_or(0)
    }

    /// Award points to one player, leapfrogging their pegs. Crossing the
    /// winning threshold completes the game on the spot.
    ///
    /// # Errors
    ///
    /// Returns [`PeggingError`] when the game is completed or the player is
    /// unknown. The game is unchanged on error.
    pub fn update_score(
        &mut self,
        player_id: &str,
        points: u32,
        now: u64,
    ) -> Result<ScoreOutcome, PeggingError> {
        if self.status == GameStatus::Completed {
            return Err(PeggingError::GameCompleted);
        }
        if !self.players.iter().any(|p| p.id == player_id) {
            return Err(PeggingError::UnknownPlayer(player_id.to_string()));
        }

        let new_score = self.score_of(player_id).saturating_add(points);
        if let Some(peg) = self
            .peg_state
            .iter_mut()
            .find(|p| p.player_id == player_id)
        {
            peg.back_peg = peg.front_peg;
            peg.front_peg = new_score;
        }
        self.scores.insert(player_id.to_string(), new_score);

        let winner_id = if new_score >= WINNING_SCORE {
            self.status = GameStatus::Completed;
            self.winner_id = Some(player_id.to_string());
            self.ended_at = Some(now);
            Some(player_id.to_string())
        } else {
            None
        };

        Ok(ScoreOutcome {
            new_score,
            winner_id,
        })
    }

    /// Minimal resume-banner summary.
    #[must_use]
    pub fn build_pause_snapshot(&self) -> PauseSnapshot {
        PauseSnapshot {
            dealer_id: self.current_dealer_id.clone(),
            current_player_id: self.current_player_id.clone(),
            round: Some(self.round),
            scores: Some(self.scores.clone()),
        }
    }
}
