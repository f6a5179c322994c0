//! Domino-train machine: thirteen rounds counting the engine tile down
//! from double-12, pip totals accumulating against each player. Lowest
//! total wins when the engine runs out.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::audit::PauseSnapshot;
use crate::game::GameStatus;
use crate::player::Player;
use crate::rotation::{RotationError, next_dealer};

/// Engine tile for the first round; counts down to zero.
pub const STARTING_ENGINE: u8 = 12;

/// One player's pip count for a finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRoundScore {
    pub player_id: String,
    /// Pips left in hand when the round ended. Forced to zero for the
    /// round winner.
    pub pips: u32,
}

/// Inline capacity matches the variant's maximum roster size.
pub type TrainRoundScores = SmallVec<[TrainRoundScore; 8]>;

/// A recorded round. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRound {
    pub id: String,
    pub round_number: u32,
    /// Engine tile that was in play for this round.
    pub engine: u8,
    pub dealer_id: String,
    pub winner_id: String,
    pub scores: TrainRoundScores,
    pub timestamp: u64,
}

/// Derived per-player aggregate, recomputed on any history change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainPlayerState {
    pub player_id: String,
    /// Running pip total; lower is better.
    pub total_score: u32,
    /// Times this player went out first.
    pub rounds_won: u32,
}

impl TrainPlayerState {
    #[must_use]
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            total_score: 0,
            rounds_won: 0,
        }
    }
}

/// A round as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRoundInput {
    pub winner_id: String,
    pub scores: Vec<TrainRoundScore>,
}

/// Why a round command was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrainError {
    #[error("game is already completed")]
    GameCompleted,
    #[error("winner {0:?} is not in the roster")]
    UnknownWinner(String),
    #[error("score entry references unknown player {0:?}")]
    UnknownScorePlayer(String),
    #[error("round {0:?} not found")]
    RoundNotFound(String),
    #[error(transparent)]
    Rotation(#[from] RotationError),
}

/// Result of recording a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round_id: String,
    /// Set when this round completed the game.
    pub winner_id: Option<String>,
}

/// Authoritative state of one domino-train game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainGame {
    pub id: String,
    pub players: Vec<Player>,
    pub player_states: Vec<TrainPlayerState>,
    pub rounds: Vec<TrainRound>,
    pub current_dealer_id: String,
    /// Engine tile for the upcoming round; clamped at zero for display
    /// once the game completes.
    pub current_engine: u8,
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_snapshot: Option<PauseSnapshot>,
}

impl TrainGame {
    /// Build a fresh game starting at the double-12 engine. Roster is
    /// assumed validated.
    #[must_use]
    pub fn new(id: String, players: Vec<Player>, dealer_id: String, now: u64) -> Self {
        let player_states = players
            .iter()
            .map(|p| TrainPlayerState::new(p.id.clone()))
            .collect();
        Self {
            id,
            players,
            player_states,
            rounds: Vec::new(),
            current_dealer_id: dealer_id,
            current_engine: STARTING_ENGINE,
            started_at: now,
            ended_at: None,
            winner_id: None,
            status: GameStatus::Active,
            pause_snapshot: None,
        }
    }

    /// 1-based display number of the round about to be played.
    #[must_use]
    pub const fn display_round(&self) -> u32 {
        13 - self.current_engine as u32
    }

    #[must_use]
    pub fn player_state(&self, player_id: &str) -> Option<&TrainPlayerState> {
        self.player_states.iter().find(|s| s.player_id == player_id)
    }

    fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    /// Record a finished round: zero the winner's pips, accumulate totals,
    /// step the engine down, and rotate the dealer. Recording the round
    /// played on the double-0 engine completes the game. The round id is
    /// requested only once validation has passed.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError`] when the game is completed or any referenced
    /// player is unknown. The game is unchanged on error.
    pub fn record_round(
        &mut self,
        input: TrainRoundInput,
        round_id: impl FnOnce() -> String,
        now: u64,
    ) -> Result<RoundOutcome, TrainError> {
        if self.status == GameStatus::Completed {
            return Err(TrainError::GameCompleted);
        }
        if !self.has_player(&input.winner_id) {
            return Err(TrainError::UnknownWinner(input.winner_id));
        }
        for entry in &input.scores {
            if !self.has_player(&entry.player_id) {
                return Err(TrainError::UnknownScorePlayer(entry.player_id.clone()));
            }
        }
        let next_dealer_id = next_dealer(&self.players, &self.current_dealer_id)?
            .id
            .clone();
        let round_id = round_id();

        // The winner went out; their submitted pips are not trusted.
        let mut scores = TrainRoundScores::new();
        for player in &self.players {
            let Some(entry) = input.scores.iter().find(|s| s.player_id == player.id) else {
                continue;
            };
            scores.push(TrainRoundScore {
                player_id: player.id.clone(),
                pips: if player.id == input.winner_id {
                    0
                } else {
                    entry.pips
                },
            });
        }

        let round = TrainRound {
            id: round_id.clone(),
            round_number: u32::try_from(self.rounds.len() + 1).unwrap_or(u32::MAX),
            engine: self.current_engine,
            dealer_id: self.current_dealer_id.clone(),
            winner_id: input.winner_id,
            scores,
            timestamp: now,
        };

        for state in &mut self.player_states {
            let entry = round.scores.iter().find(|s| s.player_id == state.player_id);
            apply_round_entry(state, entry, state.player_id == round.winner_id);
        }
        self.rounds.push(round);

        let game_over = self.current_engine == 0;
        if game_over {
            self.status = GameStatus::Completed;
            self.ended_at = Some(now);
            self.winner_id = self.lowest_total().map(|s| s.player_id.clone());
        } else {
            self.current_engine -= 1;
        }
        self.current_dealer_id = next_dealer_id;

        Ok(RoundOutcome {
            round_id,
            winner_id: if game_over { self.winner_id.clone() } else { None },
        })
    }

    /// Remove a round and re-derive player states and the engine counter
    /// by replaying the remaining history. Status and winner are
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::RoundNotFound`] when no round has the given
    /// id.
    pub fn delete_round(&mut self, round_id: &str) -> Result<(), TrainError> {
        let idx = self
            .rounds
            .iter()
            .position(|r| r.id == round_id)
            .ok_or_else(|| TrainError::RoundNotFound(round_id.to_string()))?;
        self.rounds.remove(idx);
        self.recompute_player_states();
        Ok(())
    }

    /// Replay the full round history into fresh player states and the
    /// matching engine counter.
    fn recompute_player_states(&mut self) {
        let mut states: Vec<TrainPlayerState> = self
            .players
            .iter()
            .map(|p| TrainPlayerState::new(p.id.clone()))
            .collect();
        for round in &self.rounds {
            for state in &mut states {
                let entry = round.scores.iter().find(|s| s.player_id == state.player_id);
                apply_round_entry(state, entry, state.player_id == round.winner_id);
            }
        }
        self.player_states = states;
        let played = u8::try_from(self.rounds.len()).unwrap_or(u8::MAX);
        self.current_engine = STARTING_ENGINE.saturating_sub(played);
    }

    /// First player with the lowest pip total, in roster order.
    fn lowest_total(&self) -> Option<&TrainPlayerState> {
        self.player_states
            .iter()
            .fold(None, |best: Option<&TrainPlayerState>, s| match best {
                Some(b) if b.total_score <= s.total_score => Some(b),
                _ => Some(s),
            })
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
            round: Some(self.display_round()),
            scores: Some(scores),
        }
    }
}

fn apply_round_entry(state: &mut TrainPlayerState, entry: Option<&TrainRoundScore>, is_winner: bool) {
    if is_winner {
        state.rounds_won = state.rounds_won.saturating_add(1);
    }
    if let Some(entry) = entry {
        state.total_score = state.total_score.saturating_add(entry.pips);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_game() -> TrainGame {
        let players = vec![Player::new("p1", "Ana"), Player::new("p2", "Ben")];
        TrainGame::new("g1".to_string(), players, "p1".to_string(), 1_000)
    }

    fn round_input(winner: &str, pips: &[(&str, u32)]) -> TrainRoundInput {
        TrainRoundInput {
            winner_id: winner.to_string(),
            scores: pips
                .iter()
                .map(|(id, pips)| TrainRoundScore {
                    player_id: (*id).to_string(),
                    pips: *pips,
                })
                .collect(),
        }
    }

    #[test]
    fn winner_pips_are_forced_to_zero() {
        let mut game = two_player_game();
        // Submitted winner pips of 7 must be discarded.
        let input = round_input("p1", &[("p1", 7), ("p2", 23)]);
        let outcome = game
            .record_round(input, || "r1".to_string(), 2_000)
            .expect("round records");
        assert_eq!(outcome.winner_id, None);

        let p1 = game.player_state("p1").expect("p1 state");
        assert_eq!(p1.total_score, 0);
        assert_eq!(p1.rounds_won, 1);
        let p2 = game.player_state("p2").expect("p2 state");
        assert_eq!(p2.total_score, 23);
        assert_eq!(game.current_engine, 11);
        assert_eq!(game.display_round(), 2);
        assert_eq!(game.current_dealer_id, "p2");
    }

    #[test]
    fn engine_zero_round_completes_with_lowest_total() {
        let mut game = two_player_game();
        game.current_engine = 0;
        for state in &mut game.player_states {
            state.total_score = if state.player_id == "p1" { 40 } else { 55 };
        }
        let input = round_input("p2", &[("p1", 5), ("p2", 0)]);
        let outcome = game
            .record_round(input, || "r13".to_string(), 2_000)
            .expect("round records");

        // p1: 45, p2: 55 - p1 takes the game even though p2 went out.
        assert_eq!(outcome.winner_id.as_deref(), Some("p1"));
        assert_eq!(game.status, GameStatus::Completed);
        assert_eq!(game.current_engine, 0);
        assert_eq!(game.ended_at, Some(2_000));
    }

    #[test]
    fn final_tie_breaks_to_earlier_seat() {
        let mut game = two_player_game();
        game.current_engine = 0;
        let input = round_input("p2", &[("p1", 0), ("p2", 0)]);
        let outcome = game
            .record_round(input, || "r13".to_string(), 2_000)
            .expect("round records");
        assert_eq!(outcome.winner_id.as_deref(), Some("p1"));
    }

    #[test]
    fn completed_game_rejects_further_rounds() {
        let mut game = two_player_game();
        game.status = GameStatus::Completed;
        let err = game
            .record_round(round_input("p1", &[]), || "r1".to_string(), 2_000)
            .expect_err("rejected");
        assert_eq!(err, TrainError::GameCompleted);
    }

    #[test]
    fn unknown_ids_are_rejected_without_changes() {
        let mut game = two_player_game();
        let before = game.clone();
        let err = game
            .record_round(round_input("zz", &[]), || "r1".to_string(), 2_000)
            .expect_err("rejected");
        assert_eq!(err, TrainError::UnknownWinner("zz".to_string()));
        let err = game
            .record_round(
                round_input("p1", &[("zz", 3)]),
                || "r1".to_string(),
                2_000,
            )
            .expect_err("rejected");
        assert_eq!(err, TrainError::UnknownScorePlayer("zz".to_string()));
        assert_eq!(game, before);
    }

    #[test]
    fn delete_round_replays_history_and_engine() {
        let mut game = two_player_game();
        game.record_round(
            round_input("p1", &[("p1", 0), ("p2", 10)]),
            || "r1".to_string(),
            2_000,
        )
        .expect("round records");
        game.record_round(
            round_input("p2", &[("p1", 8), ("p2", 0)]),
            || "r2".to_string(),
            3_000,
        )
        .expect("round records");
        assert_eq!(game.current_engine, 10);

        game.delete_round("r2").expect("round deletes");
        assert_eq!(game.current_engine, 11);
        let p1 = game.player_state("p1").expect("p1 state");
        assert_eq!(p1.total_score, 0);
        assert_eq!(p1.rounds_won, 1);
        let p2 = game.player_state("p2").expect("p2 state");
        assert_eq!(p2.total_score, 10);
        assert_eq!(p2.rounds_won, 0);

        assert_eq!(
            game.delete_round("r9"),
            Err(TrainError::RoundNotFound("r9".to_string()))
        );
    }

    #[test]
    fn replay_matches_incremental_accumulation() {
        let mut game = two_player_game();
        let rounds = [
            ("p1", [("p1", 0u32), ("p2", 14u32)]),
            ("p2", [("p1", 9), ("p2", 0)]),
            ("p1", [("p1", 0), ("p2", 21)]),
        ];
        for (i, (winner, pips)) in rounds.iter().enumerate() {
            game.record_round(
                round_input(winner, pips),
                || format!("r{i}"),
                2_000 + i as u64,
            )
            .expect("round records");
        }
        let incremental = game.player_states.clone();
        let engine_before = game.current_engine;
        game.recompute_player_states();
        assert_eq!(game.player_states, incremental);
        assert_eq!(game.current_engine, engine_before);
    }
}
