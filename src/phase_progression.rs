//! Phase-progression machine: a ten-phase race where leftover cards score
//! penalty points and the lowest-scoring finisher wins.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::audit::PauseSnapshot;
use crate::game::GameStatus;
use crate::player::Player;
use crate::rotation::{RotationError, next_dealer};
use crate::scoring::{CardCount, score_from_card_counts};

/// Highest phase; laying it down finishes the race.
pub const FINAL_PHASE: u8 = 10;

/// Hand count at which the fixed-length variant ends the game.
pub const FIXED_VARIANT_HANDS: usize = 10;

/// Rule variant selected at game creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseVariant {
    #[default]
    Standard,
    /// Even-numbered phases only; progression rules are unchanged.
    Evens,
    /// Exactly ten hands, lowest total wins regardless of phase progress.
    FixedTen,
}

/// How an optional table stake applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeBasis {
    #[default]
    PerGame,
    PerHand,
}

/// Table rules fixed at creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default)]
    pub strict_phase_enforcement: bool,
    #[serde(default)]
    pub variant: PhaseVariant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_stake: Option<String>,
    #[serde(default)]
    pub stake_basis: StakeBasis,
}

/// One player's computed line in a recorded hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandScore {
    pub player_id: String,
    pub phase_laid: bool,
    /// Phase the player was attempting when the hand was played. A label
    /// captured at record time; not re-derived when earlier history is
    /// deleted or patched.
    pub phase_number: u8,
    pub cards_left: u32,
    pub score: u32,
    pub cards: CardCount,
    #[serde(default)]
    pub hits: bool,
    #[serde(default)]
    pub skipped_this_hand: bool,
}

/// Inline capacity matches the variant's maximum roster size.
pub type HandScores = SmallVec<[HandScore; 6]>;

/// A recorded hand. Immutable once appended, except through
/// [`PhaseGame::update_hand`] which re-derives downstream state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    pub id: String,
    pub hand_number: u32,
    pub dealer_id: String,
    pub winner_id: String,
    pub scores: HandScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub timestamp: u64,
}

/// Derived per-player aggregate. Always equal to the fold of the hand
/// history; never trusted incrementally after a delete or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: String,
    pub current_phase: u8,
    pub total_score: u32,
    pub hands_won: u32,
    pub completed_all_phases: bool,
}

impl PlayerState {
    #[must_use]
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            current_phase: 1,
            total_score: 0,
            hands_won: 0,
            completed_all_phases: false,
        }
    }
}

/// One player's raw inputs for a hand about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandScoreInput {
    pub player_id: String,
    pub phase_laid: bool,
    pub cards: CardCount,
    #[serde(default)]
    pub hits: bool,
    #[serde(default)]
    pub skipped_this_hand: bool,
}

/// A hand as submitted by the caller. Scores are computed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandInput {
    pub dealer_id: String,
    pub winner_id: String,
    pub scores: Vec<HandScoreInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Patch for one player's line in an existing hand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandScorePatch {
    pub player_id: String,
    #[serde(default)]
    pub cards: Option<CardCount>,
    #[serde(default)]
    pub phase_laid: Option<bool>,
}

/// Partial update of a recorded hand. Derived player state is re-derived
/// by full replay after the patch is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandUpdate {
    #[serde(default)]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub dealer_id: Option<String>,
    #[serde(default)]
    pub stake: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub scores: Vec<HandScorePatch>,
}

/// Why a hand command was rejected. Rejection always leaves the game
/// unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandError {
    #[error("game is already completed")]
    GameCompleted,
    #[error("winner {0:?} is not in the roster")]
    UnknownWinner(String),
    #[error("dealer {0:?} is not in the roster")]
    UnknownDealer(String),
    #[error("score entry references unknown player {0:?}")]
    UnknownScorePlayer(String),
    #[error("hand {0:?} not found")]
    HandNotFound(String),
    #[error(transparent)]
    Rotation(#[from] RotationError),
}

/// Result of recording a hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandOutcome {
    pub hand_id: String,
    /// Set when this hand completed the game.
    pub winner_id: Option<String>,
}

/// Authoritative state of one phase-progression game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseGame {
    pub id: String,
    pub players: Vec<Player>,
    pub player_states: Vec<PlayerState>,
    pub hands: Vec<Hand>,
    pub current_dealer_id: String,
    pub settings: GameSettings,
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    pub status: GameStatus,
}

impl PhaseGame {
    /// Build a fresh game. The roster is assumed validated by the caller.
    #[must_use]
    pub fn new(
        id: String,
        players: Vec<Player>,
        dealer_id: String,
        settings: GameSettings,
        now: u64,
    ) -> Self {
        let player_states = players
            .iter()
            .map(|p| PlayerState::new(p.id.clone()))
            .collect();
        Self {
            id,
            players,
            player_states,
            hands: Vec::new(),
            current_dealer_id: dealer_id,
            settings,
            started_at: now,
            ended_at: None,
            winner_id: None,
            status: GameStatus::Active,
        }
    }

    #[must_use]
    pub fn player_state(&self, player_id: &str) -> Option<&PlayerState> {
        self.player_states.iter().find(|s| s.player_id == player_id)
    }

    fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    /// Record a completed hand: compute scores, fold them into player
    /// states, check completion, and rotate the dealer. The hand id is
    /// requested only once validation has passed.
    ///
    /// # Errors
    ///
    /// Returns [`HandError`] when the game is completed or any referenced
    /// player is unknown. The game is unchanged on error.
    pub fn record_hand(
        &mut self,
        input: HandInput,
        hand_id: impl FnOnce() -> String,
        now: u64,
    ) -> Result<HandOutcome, HandError> {
        if self.status == GameStatus::Completed {
            return Err(HandError::GameCompleted);
        }
        if !self.has_player(&input.winner_id) {
            return Err(HandError::UnknownWinner(input.winner_id));
        }
        if !self.has_player(&input.dealer_id) {
            return Err(HandError::UnknownDealer(input.dealer_id));
        }
        for entry in &input.scores {
            if !self.has_player(&entry.player_id) {
                return Err(HandError::UnknownScorePlayer(entry.player_id.clone()));
            }
        }
        let next_dealer_id = next_dealer(&self.players, &self.current_dealer_id)?
            .id
            .clone();
        let hand_id = hand_id();

        // Store lines in roster order regardless of input order.
        let mut scores = HandScores::new();
        for player in &self.players {
            let Some(entry) = input.scores.iter().find(|s| s.player_id == player.id) else {
                continue;
            };
            let is_winner = player.id == input.winner_id;
            let phase_number = self
                .player_state(&player.id)
                .map_or(1, |s| s.current_phase);
            scores.push(HandScore {
                player_id: player.id.clone(),
                phase_laid: entry.phase_laid,
                phase_number,
                cards_left: entry.cards.total_cards(),
                score: if is_winner {
                    0
                } else {
                    score_from_card_counts(&entry.cards)
                },
                cards: entry.cards,
                hits: entry.hits,
                skipped_this_hand: entry.skipped_this_hand,
            });
        }

        let hand = Hand {
            id: hand_id.clone(),
            hand_number: u32::try_from(self.hands.len() + 1).unwrap_or(u32::MAX),
            dealer_id: input.dealer_id,
            winner_id: input.winner_id,
            scores,
            stake: input.stake,
            notes: input.notes,
            timestamp: now,
        };

        for state in &mut self.player_states {
            let entry = hand.scores.iter().find(|s| s.player_id == state.player_id);
            apply_hand_entry(state, entry, state.player_id == hand.winner_id);
        }
        self.hands.push(hand);

        self.check_completion(now);
        self.current_dealer_id = next_dealer_id;

        Ok(HandOutcome {
            hand_id,
            winner_id: if self.status == GameStatus::Completed {
                self.winner_id.clone()
            } else {
                None
            },
        })
    }

    /// Completion check: any phase completer ends the game in favor of the
    /// lowest-scoring completer; the fixed-length variant ends after the
    /// tenth hand in favor of the lowest total overall. Ties go to the
    /// earlier seat.
    fn check_completion(&mut self, now: u64) {
        let completers: Vec<&PlayerState> = self
            .player_states
            .iter()
            .filter(|s| s.completed_all_phases)
            .collect();
        if let Some(winner) = lowest_total(&completers) {
            self.status = GameStatus::Completed;
            self.ended_at = Some(now);
            self.winner_id = Some(winner.player_id.clone());
        }

        if self.settings.variant == PhaseVariant::FixedTen && self.hands.len() >= FIXED_VARIANT_HANDS
        {
            let all: Vec<&PlayerState> = self.player_states.iter().collect();
            if let Some(winner) = lowest_total(&all) {
                self.status = GameStatus::Completed;
                self.ended_at = Some(now);
                self.winner_id = Some(winner.player_id.clone());
            }
        }
    }

    /// Patch a recorded hand, then re-derive all player states by replay.
    /// Completion status is not re-evaluated (see DESIGN.md).
    ///
    /// # Errors
    ///
    /// Returns [`HandError`] when the hand or any patched player is unknown.
    pub fn update_hand(&mut self, hand_id: &str, update: HandUpdate) -> Result<(), HandError> {
        if let Some(winner_id) = &update.winner_id {
            if !self.has_player(winner_id) {
                return Err(HandError::UnknownWinner(winner_id.clone()));
            }
        }
        if let Some(dealer_id) = &update.dealer_id {
            if !self.has_player(dealer_id) {
                return Err(HandError::UnknownDealer(dealer_id.clone()));
            }
        }
        let hand = self
            .hands
            .iter_mut()
            .find(|h| h.id == hand_id)
            .ok_or_else(|| HandError::HandNotFound(hand_id.to_string()))?;
        for patch in &update.scores {
            if !hand.scores.iter().any(|s| s.player_id == patch.player_id) {
                return Err(HandError::UnknownScorePlayer(patch.player_id.clone()));
            }
        }

        if let Some(winner_id) = update.winner_id {
            hand.winner_id = winner_id;
        }
        if let Some(dealer_id) = update.dealer_id {
            hand.dealer_id = dealer_id;
        }
        if let Some(stake) = update.stake {
            hand.stake = Some(stake);
        }
        if let Some(notes) = update.notes {
            hand.notes = Some(notes);
        }
        for patch in update.scores {
            let Some(line) = hand
                .scores
                .iter_mut()
                .find(|s| s.player_id == patch.player_id)
            else {
                continue;
            };
            if let Some(cards) = patch.cards {
                line.cards = cards;
                line.cards_left = cards.total_cards();
            }
            if let Some(phase_laid) = patch.phase_laid {
                line.phase_laid = phase_laid;
            }
        }
        // Winner or cards may have changed; recompute every line's score.
        let winner_id = hand.winner_id.clone();
        for line in &mut hand.scores {
            line.score = if line.player_id == winner_id {
                0
            } else {
                score_from_card_counts(&line.cards)
            };
        }

        self.recompute_player_states();
        Ok(())
    }

    /// Remove a hand and re-derive every player state by replaying the
    /// remaining history from phase 1. Status and winner are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::HandNotFound`] when no hand has the given id.
    pub fn delete_hand(&mut self, hand_id: &str) -> Result<(), HandError> {
        let idx = self
            .hands
            .iter()
            .position(|h| h.id == hand_id)
            .ok_or_else(|| HandError::HandNotFound(hand_id.to_string()))?;
        self.hands.remove(idx);
        self.recompute_player_states();
        Ok(())
    }

    /// Delete the most recently recorded hand. Returns the deleted id.
    pub fn undo_last_hand(&mut self) -> Option<String> {
        let last_id = self
            .hands
            .iter()
            .max_by_key(|h| h.hand_number)
            .map(|h| h.id.clone())?;
        self.delete_hand(&last_id).ok()?;
        Some(last_id)
    }

    /// Replay the full hand history into fresh player states.
    fn recompute_player_states(&mut self) {
        let mut states: Vec<PlayerState> = self
            .players
            .iter()
            .map(|p| PlayerState::new(p.id.clone()))
            .collect();
        for hand in &self.hands {
            for state in &mut states {
                let entry = hand.scores.iter().find(|s| s.player_id == state.player_id);
                apply_hand_entry(state, entry, state.player_id == hand.winner_id);
            }
        }
        self.player_states = states;
    }

    /// Minimal resume-banner summary.
    #[must_use]
    pub fn build_pause_snapshot(&self) -> PauseSnapshot {
        let scores: BTreeMap<String, u32> = self
            .player_states
            .iter()
            .map(|s| (s.player_id.clone(), s.total_score))
            .collect();
        PauseSnapshot {
            dealer_id: self.current_dealer_id.clone(),
            current_player_id: self.current_dealer_id.clone(),
            round: Some(u32::try_from(self.hands.len() + 1).unwrap_or(u32::MAX)),
            scores: Some(scores),
        }
    }
}

/// The single transition shared by incremental recording and replay, so
/// that recomputed state can never drift from accumulated state.
fn apply_hand_entry(state: &mut PlayerState, entry: Option<&HandScore>, is_winner: bool) {
    if is_winner {
        state.hands_won = state.hands_won.saturating_add(1);
    }
    let Some(entry) = entry else {
        return;
    };
    state.total_score = state.total_score.saturating_add(entry.score);
    if entry.phase_laid {
        if state.current_phase < FINAL_PHASE {
            state.current_phase += 1;
        } else {
            state.completed_all_phases = true;
        }
    }
}

/// First state with the lowest total score, in roster order.
fn lowest_total<'a>(states: &[&'a PlayerState]) -> Option<&'a PlayerState> {
    states
        .iter()
        .copied()
        .fold(None, |best: Option<&PlayerState>, s| match best {
            Some(b) if b.total_score <= s.total_score => Some(b),
            _ => Some(s),
        })
}
