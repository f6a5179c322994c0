//! Session directory: owns every game instance, the lifecycle ledgers,
//! and the single command dispatch point. Commands addressing a missing
//! game or record are no-ops that report nothing happened; they never
//! panic and never leave partial state.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditAction, AuditEntry, PauseSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::domino_train::{TrainGame, TrainRoundInput};
use crate::game::{Game, GameType};
use crate::ids::IdSource;
use crate::pegging::PeggingGame;
use crate::phase_progression::{GameSettings, HandInput, HandUpdate, PhaseGame};
use crate::player::{Player, RosterError, validate_roster};
use crate::stakes::{StakeEntry, StakePosting};
use crate::stock_elimination::{StockGame, StockUpdate};

/// One line of the cross-game win history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameHistoryEntry {
    pub id: String,
    pub game_type: GameType,
    pub winner_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake: Option<String>,
    pub date: u64,
}

/// The process-wide state tree. Single writer; every mutation goes
/// through a command method and observes fully up-to-date prior state.
pub struct SessionDirectory {
    pub(crate) games: Vec<Game>,
    pub(crate) current_game_id: Option<String>,
    pub(crate) active_game_id: Option<String>,
    pub(crate) game_history: Vec<GameHistoryEntry>,
    pub(crate) audit_log: Vec<AuditEntry>,
    pub(crate) stakes_history: Vec<StakeEntry>,
    pub(crate) selected_game_type: GameType,
    ids: IdSource,
    clock: Box<dyn Clock>,
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionDirectory {
    /// Directory for an interactive session: wall clock, entropy ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sources(Box::new(SystemClock), IdSource::from_entropy())
    }

    /// Directory with explicit time and id sources, for tests and replays.
    #[must_use]
    pub fn with_sources(clock: Box<dyn Clock>, ids: IdSource) -> Self {
        Self {
            games: Vec::new(),
            current_game_id: None,
            active_game_id: None,
            game_history: Vec::new(),
            audit_log: Vec::new(),
            stakes_history: Vec::new(),
            selected_game_type: GameType::PhaseProgression,
            ids,
            clock,
        }
    }

    // ---- queries ----

    #[must_use]
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    #[must_use]
    pub fn game(&self, game_id: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.id() == game_id)
    }

    fn game_mut(&mut self, game_id: &str) -> Option<&mut Game> {
        self.games.iter_mut().find(|g| g.id() == game_id)
    }

    #[must_use]
    pub fn current_game(&self) -> Option<&Game> {
        self.current_game_id
            .as_deref()
            .and_then(|id| self.game(id))
    }

    #[must_use]
    pub fn active_game(&self) -> Option<&Game> {
        self.active_game_id.as_deref().and_then(|id| self.game(id))
    }

    #[must_use]
    pub fn current_game_id(&self) -> Option<&str> {
        self.current_game_id.as_deref()
    }

    #[must_use]
    pub fn active_game_id(&self) -> Option<&str> {
        self.active_game_id.as_deref()
    }

    #[must_use]
    pub fn win_history(&self) -> &[GameHistoryEntry] {
        &self.game_history
    }

    #[must_use]
    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit_log
    }

    #[must_use]
    pub fn stakes_history(&self) -> &[StakeEntry] {
        &self.stakes_history
    }

    #[must_use]
    pub const fn selected_game_type(&self) -> GameType {
        self.selected_game_type
    }

    // ---- session-level commands ----

    pub fn set_game_type(&mut self, game_type: GameType) {
        self.selected_game_type = game_type;
    }

    /// Point the display at a game, or clear it. Unknown ids are ignored.
    pub fn set_current_game(&mut self, game_id: Option<String>) {
        match game_id {
            None => self.current_game_id = None,
            Some(id) if self.game(&id).is_some() => self.current_game_id = Some(id),
            Some(id) => debug!("set_current_game ignoring unknown game {id}"),
        }
    }

    /// Make a game both displayed and active, with a `switched` audit
    /// entry. Returns false when the game does not exist.
    pub fn switch_game(&mut self, game_id: &str) -> bool {
        if self.game(game_id).is_none() {
            debug!("switch_game ignoring unknown game {game_id}");
            return false;
        }
        self.append_audit(game_id, AuditAction::Switched);
        self.current_game_id = Some(game_id.to_string());
        self.active_game_id = Some(game_id.to_string());
        true
    }

    /// Pause the displayed game in place, storing the caller's resume
    /// snapshot where the variant keeps one.
    pub fn pause_game(&mut self, snapshot: Option<PauseSnapshot>) -> bool {
        let Some(game_id) = self.current_game_id.clone() else {
            return false;
        };
        if self.game(&game_id).is_none() {
            debug!("pause_game ignoring stale game {game_id}");
            return false;
        }
        self.append_audit(&game_id, AuditAction::Paused);
        if let Some(game) = self.game_mut(&game_id) {
            game.pause(snapshot);
        }
        true
    }

    /// Resume the given game (or the displayed one), making it both
    /// displayed and active.
    pub fn resume_game(&mut self, game_id: Option<&str>) -> bool {
        let Some(target) = game_id
            .map(str::to_string)
            .or_else(|| self.current_game_id.clone())
        else {
            return false;
        };
        if self.game(&target).is_none() {
            debug!("resume_game ignoring stale game {target}");
            return false;
        }
        self.append_audit(&target, AuditAction::Resumed);
        if let Some(game) = self.game_mut(&target) {
            game.resume();
        }
        self.current_game_id = Some(target.clone());
        self.active_game_id = Some(target);
        true
    }

    /// Remove a game outright, clearing any pointer that referenced it.
    pub fn delete_game(&mut self, game_id: &str) -> bool {
        let before = self.games.len();
        self.games.retain(|g| g.id() != game_id);
        if self.games.len() == before {
            return false;
        }
        if self.current_game_id.as_deref() == Some(game_id) {
            self.current_game_id = None;
        }
        if self.active_game_id.as_deref() == Some(game_id) {
            self.active_game_id = None;
        }
        true
    }

    /// Force-complete the displayed game with an explicit winner,
    /// recording a win-history entry with the game's stake if present.
    pub fn end_game(&mut self, winner_id: &str) -> bool {
        let Some(game_id) = self.current_game_id.clone() else {
            return false;
        };
        let now = self.clock.now_millis();
        let Some(game) = self.game_mut(&game_id) else {
            debug!("end_game ignoring stale game {game_id}");
            return false;
        };
        let Some(winner) = game.player(winner_id) else {
            debug!("end_game ignoring unknown winner {winner_id}");
            return false;
        };
        let winner_name = winner.name.clone();
        let winner_avatar = winner.avatar.clone();
        let game_type = game.game_type();
        game.mark_completed(winner_id, now);

        let stake = match self.game(&game_id) {
            Some(Game::PhaseProgression(g)) => g.settings.global_stake.clone(),
            _ => self
                .stakes_history
                .iter()
                .find(|s| s.game_id.as_deref() == Some(game_id.as_str()))
                .map(StakeEntry::display),
        };
        let entry_id = self.ids.next_id();
        self.game_history.push(GameHistoryEntry {
            id: entry_id,
            game_type,
            winner_name,
            winner_avatar,
            stake,
            date: now,
        });
        self.append_audit(&game_id, AuditAction::Completed);
        true
    }

    // ---- game creation ----

    /// Create a phase-progression game and make it the displayed game.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError`] when the roster fails validation; no game
    /// is created.
    pub fn create_phase_game(
        &mut self,
        players: Vec<Player>,
        dealer_id: &str,
        settings: GameSettings,
    ) -> Result<String, RosterError> {
        validate_roster(
            &players,
            GameType::PhaseProgression.player_limits(),
            dealer_id,
        )?;
        let id = self.ids.next_id();
        let now = self.clock.now_millis();
        let game = PhaseGame::new(id.clone(), players, dealer_id.to_string(), settings, now);
        self.install_game(Game::PhaseProgression(game), None);
        Ok(id)
    }

    /// Create a pegging game and make it the displayed game.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError`] when the roster fails validation.
    pub fn create_pegging_game(
        &mut self,
        players: Vec<Player>,
        dealer_id: &str,
        stake: Option<StakePosting>,
    ) -> Result<String, RosterError> {
        validate_roster(&players, GameType::Pegging.player_limits(), dealer_id)?;
        let id = self.ids.next_id();
        let now = self.clock.now_millis();
        let game = PeggingGame::new(id.clone(), players, dealer_id.to_string(), now);
        self.install_game(Game::Pegging(game), stake);
        Ok(id)
    }

    /// Create a stock-elimination game and make it the displayed game.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError`] when the roster fails validation.
    pub fn create_stock_game(
        &mut self,
        players: Vec<Player>,
        dealer_id: &str,
        stake: Option<StakePosting>,
    ) -> Result<String, RosterError> {
        validate_roster(
            &players,
            GameType::StockElimination.player_limits(),
            dealer_id,
        )?;
        let id = self.ids.next_id();
        let now = self.clock.now_millis();
        let game = StockGame::new(id.clone(), players, dealer_id.to_string(), now);
        self.install_game(Game::StockElimination(game), stake);
        Ok(id)
    }

    /// Create a domino-train game and make it the displayed game.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError`] when the roster fails validation.
    pub fn create_train_game(
        &mut self,
        players: Vec<Player>,
        dealer_id: &str,
        stake: Option<StakePosting>,
    ) -> Result<String, RosterError> {
        validate_roster(&players, GameType::DominoTrain.player_limits(), dealer_id)?;
        let id = self.ids.next_id();
        let now = self.clock.now_millis();
        let game = TrainGame::new(id.clone(), players, dealer_id.to_string(), now);
        self.install_game(Game::DominoTrain(game), stake);
        Ok(id)
    }

    fn install_game(&mut self, game: Game, stake: Option<StakePosting>) {
        let game_id = game.id().to_string();
        let game_type = game.game_type();
        let player_names: Vec<String> = game.players().iter().map(|p| p.name.clone()).collect();
        self.games.push(game);
        self.current_game_id = Some(game_id.clone());
        self.append_audit(&game_id, AuditAction::Created);
        if let Some(posting) = stake {
            self.add_stake(Some(game_id), game_type, posting, player_names);
        }
    }

    /// Post a stake to the ledger; returns the entry id.
    pub fn add_stake(
        &mut self,
        game_id: Option<String>,
        game_type: GameType,
        posting: StakePosting,
        player_names: Vec<String>,
    ) -> String {
        let id = self.ids.next_id();
        self.stakes_history.push(StakeEntry {
            id: id.clone(),
            game_id,
            game_type,
            amount: posting.amount,
            currency: posting.currency,
            players: player_names,
            winner_id: None,
            created_at: self.clock.now_millis(),
            settled_at: None,
        });
        id
    }

    // ---- phase-progression commands ----

    /// Record a hand against the displayed phase-progression game.
    /// Returns the new hand id, or `None` when nothing happened. No id is
    /// consumed unless the hand actually records.
    pub fn record_hand(&mut self, input: HandInput) -> Option<String> {
        let game_id = self.current_game_id.clone()?;
        let now = self.clock.now_millis();
        let ids = &mut self.ids;
        let hand_id;
        let completion = {
            let Some(Game::PhaseProgression(game)) =
                self.games.iter_mut().find(|g| g.id() == game_id)
            else {
                debug!("record_hand ignoring non-phase game {game_id}");
                return None;
            };
            match game.record_hand(input, || ids.next_id(), now) {
                Ok(outcome) => {
                    hand_id = outcome.hand_id;
                    outcome.winner_id.and_then(|winner_id| {
                        let winner = game.players.iter().find(|p| p.id == winner_id)?;
                        Some((
                            winner.name.clone(),
                            winner.avatar.clone(),
                            game.settings.global_stake.clone(),
                        ))
                    })
                }
                Err(err) => {
                    debug!("record_hand rejected: {err}");
                    return None;
                }
            }
        };
        if let Some((winner_name, winner_avatar, stake)) = completion {
            let entry_id = self.ids.next_id();
            self.game_history.push(GameHistoryEntry {
                id: entry_id,
                game_type: GameType::PhaseProgression,
                winner_name,
                winner_avatar,
                stake,
                date: now,
            });
            self.append_audit(&game_id, AuditAction::Completed);
        }
        Some(hand_id)
    }

    /// Patch a recorded hand on the displayed phase-progression game.
    pub fn update_hand(&mut self, hand_id: &str, update: HandUpdate) -> bool {
        let Some(game_id) = self.current_game_id.clone() else {
            return false;
        };
        let updated = {
            let Some(Game::PhaseProgression(game)) = self.game_mut(&game_id) else {
                return false;
            };
            match game.update_hand(hand_id, update) {
                Ok(()) => true,
                Err(err) => {
                    debug!("update_hand rejected: {err}");
                    false
                }
            }
        };
        if updated {
            self.append_audit(&game_id, AuditAction::Updated);
        }
        updated
    }

    /// Delete a recorded hand from the displayed phase-progression game,
    /// re-deriving all downstream player state.
    pub fn delete_hand(&mut self, hand_id: &str) -> bool {
        let Some(game_id) = self.current_game_id.clone() else {
            return false;
        };
        let Some(Game::PhaseProgression(game)) = self.game_mut(&game_id) else {
            return false;
        };
        match game.delete_hand(hand_id) {
            Ok(()) => true,
            Err(err) => {
                debug!("delete_hand rejected: {err}");
                false
            }
        }
    }

    /// Delete the most recent hand of the displayed phase-progression
    /// game. Returns the deleted hand id.
    pub fn undo_last_hand(&mut self) -> Option<String> {
        let game_id = self.current_game_id.clone()?;
        let Some(Game::PhaseProgression(game)) = self.game_mut(&game_id) else {
            return None;
        };
        game.undo_last_hand()
    }

    // ---- pegging commands ----

    /// Award points on the displayed pegging game. Returns the player's
    /// new score, or `None` when nothing happened.
    pub fn update_score(&mut self, player_id: &str, points: u32) -> Option<u32> {
        let game_id = self.current_game_id.clone()?;
        let now = self.clock.now_millis();
        let Some(Game::Pegging(game)) = self.game_mut(&game_id) else {
            debug!("update_score ignoring non-pegging game {game_id}");
            return None;
        };
        match game.update_score(player_id, points, now) {
            Ok(outcome) => Some(outcome.new_score),
            Err(err) => {
                debug!("update_score rejected: {err}");
                None
            }
        }
    }

    // ---- stock-elimination commands ----

    /// Merge a partial state update into the displayed stock game.
    pub fn merge_state(&mut self, update: StockUpdate) -> bool {
        let Some(game_id) = self.current_game_id.clone() else {
            return false;
        };
        let Some(Game::StockElimination(game)) = self.game_mut(&game_id) else {
            debug!("merge_state ignoring non-stock game {game_id}");
            return false;
        };
        match game.merge_state(update) {
            Ok(()) => true,
            Err(err) => {
                debug!("merge_state rejected: {err}");
                false
            }
        }
    }

    // ---- domino-train commands ----

    /// Record a round against the displayed domino-train game. Returns
    /// the new round id, or `None` when nothing happened. No id is
    /// consumed unless the round actually records.
    pub fn record_round(&mut self, input: TrainRoundInput) -> Option<String> {
        let game_id = self.current_game_id.clone()?;
        let now = self.clock.now_millis();
        let ids = &mut self.ids;
        let outcome = {
            let Some(Game::DominoTrain(game)) =
                self.games.iter_mut().find(|g| g.id() == game_id)
            else {
                debug!("record_round ignoring non-train game {game_id}");
                return None;
            };
            match game.record_round(input, || ids.next_id(), now) {
                Ok(outcome) => outcome,
                Err(err) => {
                    debug!("record_round rejected: {err}");
                    return None;
                }
            }
        };
        if outcome.winner_id.is_some() {
            self.append_audit(&game_id, AuditAction::Completed);
        }
        Some(outcome.round_id)
    }

    /// Delete a recorded round from the displayed domino-train game,
    /// re-deriving player states and the engine counter.
    pub fn delete_round(&mut self, round_id: &str) -> bool {
        let Some(game_id) = self.current_game_id.clone() else {
            return false;
        };
        let Some(Game::DominoTrain(game)) = self.game_mut(&game_id) else {
            return false;
        };
        match game.delete_round(round_id) {
            Ok(()) => true,
            Err(err) => {
                debug!("delete_round rejected: {err}");
                false
            }
        }
    }

    // ---- audit ----

    fn append_audit(&mut self, game_id: &str, action: AuditAction) {
        let Some(game) = self.game(game_id) else {
            return;
        };
        let game_type = game.game_type();
        let snapshot = game.build_pause_snapshot();
        let entry = AuditEntry {
            id: self.ids.next_id(),
            game_id: game_id.to_string(),
            game_type,
            action,
            timestamp: self.clock.now_millis(),
            snapshot,
        };
        self.audit_log.push(entry);
    }
}
