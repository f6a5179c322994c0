//! The game sum type and the state shared by every variant.

use serde::{Deserialize, Serialize};

use crate::audit::PauseSnapshot;
use crate::domino_train::TrainGame;
use crate::pegging::PeggingGame;
use crate::phase_progression::PhaseGame;
use crate::player::{Player, PlayerLimits};
use crate::stock_elimination::StockGame;

/// The four supported game variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    PhaseProgression,
    Pegging,
    StockElimination,
    DominoTrain,
}

impl GameType {
    /// Roster size range for this variant.
    #[must_use]
    pub const fn player_limits(self) -> PlayerLimits {
        match self {
            Self::PhaseProgression | Self::StockElimination => PlayerLimits::new(2, 6),
            Self::Pegging => PlayerLimits::new(2, 3),
            Self::DominoTrain => PlayerLimits::new(2, 8),
        }
    }
}

/// Lifecycle status shared by every variant. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Setup,
    Active,
    Paused,
    Completed,
}

/// One game instance, dispatched by tag. Variant rules never leak across
/// arms; shared fields are reached through the accessors below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "game_type", rename_all = "snake_case")]
pub enum Game {
    PhaseProgression(PhaseGame),
    Pegging(PeggingGame),
    StockElimination(StockGame),
    DominoTrain(TrainGame),
}

impl Game {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::PhaseProgression(g) => &g.id,
            Self::Pegging(g) => &g.id,
            Self::StockElimination(g) => &g.id,
            Self::DominoTrain(g) => &g.id,
        }
    }

    #[must_use]
    pub const fn game_type(&self) -> GameType {
        match self {
            Self::PhaseProgression(_) => GameType::PhaseProgression,
            Self::Pegging(_) => GameType::Pegging,
            Self::StockElimination(_) => GameType::StockElimination,
            Self::DominoTrain(_) => GameType::DominoTrain,
        }
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        match self {
            Self::PhaseProgression(g) => &g.players,
            Self::Pegging(g) => &g.players,
            Self::StockElimination(g) => &g.players,
            Self::DominoTrain(g) => &g.players,
        }
    }

    #[must_use]
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players().iter().find(|p| p.id == player_id)
    }

    #[must_use]
    pub const fn status(&self) -> GameStatus {
        match self {
            Self::PhaseProgression(g) => g.status,
            Self::Pegging(g) => g.status,
            Self::StockElimination(g) => g.status,
            Self::DominoTrain(g) => g.status,
        }
    }

    #[must_use]
    pub fn current_dealer_id(&self) -> &str {
        match self {
            Self::PhaseProgression(g) => &g.current_dealer_id,
            Self::Pegging(g) => &g.current_dealer_id,
            Self::StockElimination(g) => &g.current_dealer_id,
            Self::DominoTrain(g) => &g.current_dealer_id,
        }
    }

    #[must_use]
    pub fn winner_id(&self) -> Option<&str> {
        match self {
            Self::PhaseProgression(g) => g.winner_id.as_deref(),
            Self::Pegging(g) => g.winner_id.as_deref(),
            Self::StockElimination(g) => g.winner_id.as_deref(),
            Self::DominoTrain(g) => g.winner_id.as_deref(),
        }
    }

    #[must_use]
    pub const fn started_at(&self) -> u64 {
        match self {
            Self::PhaseProgression(g) => g.started_at,
            Self::Pegging(g) => g.started_at,
            Self::StockElimination(g) => g.started_at,
            Self::DominoTrain(g) => g.started_at,
        }
    }

    #[must_use]
    pub const fn ended_at(&self) -> Option<u64> {
        match self {
            Self::PhaseProgression(g) => g.ended_at,
            Self::Pegging(g) => g.ended_at,
            Self::StockElimination(g) => g.ended_at,
            Self::DominoTrain(g) => g.ended_at,
        }
    }

    fn set_status(&mut self, status: GameStatus) {
        match self {
            Self::PhaseProgression(g) => g.status = status,
            Self::Pegging(g) => g.status = status,
            Self::StockElimination(g) => g.status = status,
            Self::DominoTrain(g) => g.status = status,
        }
    }

    /// Variant-appropriate resume-banner summary of the current position.
    #[must_use]
    pub fn build_pause_snapshot(&self) -> PauseSnapshot {
        match self {
            Self::PhaseProgression(g) => g.build_pause_snapshot(),
            Self::Pegging(g) => g.build_pause_snapshot(),
            Self::StockElimination(g) => g.build_pause_snapshot(),
            Self::DominoTrain(g) => g.build_pause_snapshot(),
        }
    }

    /// Force-complete with an explicit winner, regardless of variant rules.
    pub fn mark_completed(&mut self, winner_id: &str, now: u64) {
        self.set_status(GameStatus::Completed);
        match self {
            Self::PhaseProgression(g) => {
                g.winner_id = Some(winner_id.to_string());
                g.ended_at = Some(now);
            }
            Self::Pegging(g) => {
                g.winner_id = Some(winner_id.to_string());
                g.ended_at = Some(now);
            }
            Self::StockElimination(g) => {
                g.winner_id = Some(winner_id.to_string());
                g.ended_at = Some(now);
            }
            Self::DominoTrain(g) => {
                g.winner_id = Some(winner_id.to_string());
                g.ended_at = Some(now);
            }
        }
    }

    /// Pause in place. Pegging and domino-train keep the caller-provided
    /// resume snapshot; the other variants only change status.
    pub fn pause(&mut self, snapshot: Option<PauseSnapshot>) {
        self.set_status(GameStatus::Paused);
        match self {
            Self::Pegging(g) => g.pause_snapshot = snapshot,
            Self::DominoTrain(g) => g.pause_snapshot = snapshot,
            Self::PhaseProgression(_) | Self::StockElimination(_) => {}
        }
    }

    /// Resume a paused game. Completed games stay completed.
    pub fn resume(&mut self) {
        if self.status() != GameStatus::Completed {
            self.set_status(GameStatus::Active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase_progression::GameSettings;

    fn phase_game() -> Game {
        let players = vec![Player::new("p1", "Ana"), Player::new("p2", "Ben")];
        Game::PhaseProgression(PhaseGame::new(
            "g1".to_string(),
            players,
            "p1".to_string(),
            GameSettings::default(),
            1_000,
        ))
    }

    #[test]
    fn limits_match_each_variant() {
        assert_eq!(
            GameType::PhaseProgression.player_limits(),
            PlayerLimits::new(2, 6)
        );
        assert_eq!(GameType::Pegging.player_limits(), PlayerLimits::new(2, 3));
        assert_eq!(
            GameType::StockElimination.player_limits(),
            PlayerLimits::new(2, 6)
        );
        assert_eq!(
            GameType::DominoTrain.player_limits(),
            PlayerLimits::new(2, 8)
        );
    }

    #[test]
    fn accessors_reach_common_fields() {
        let game = phase_game();
        assert_eq!(game.id(), "g1");
        assert_eq!(game.game_type(), GameType::PhaseProgression);
        assert_eq!(game.current_dealer_id(), "p1");
        assert_eq!(game.status(), GameStatus::Active);
        assert_eq!(game.winner_id(), None);
        assert_eq!(game.started_at(), 1_000);
        assert!(game.player("p2").is_some());
        assert!(game.player("zz").is_none());
    }

    #[test]
    fn pause_resume_round_trip() {
        let mut game = phase_game();
        game.pause(None);
        assert_eq!(game.status(), GameStatus::Paused);
        game.resume();
        assert_eq!(game.status(), GameStatus::Active);
    }

    #[test]
    fn resume_never_reopens_a_completed_game() {
        let mut game = phase_game();
        game.mark_completed("p2", 5_000);
        game.resume();
        assert_eq!(game.status(), GameStatus::Completed);
        assert_eq!(game.winner_id(), Some("p2"));
        assert_eq!(game.ended_at(), Some(5_000));
    }

    #[test]
    fn serialization_tags_by_game_type() {
        let game = phase_game();
        let value = serde_json::to_value(&game).expect("serializes");
        assert_eq!(value["game_type"], "phase_progression");
        let back: Game = serde_json::from_value(value).expect("deserializes");
        assert_eq!(back, game);
    }
}
