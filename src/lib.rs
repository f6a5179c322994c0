//! TableTally Game Engine
//!
//! Platform-agnostic scoring engine for the TableTally multi-game score
//! tracker. The engine maintains authoritative, replayable state for four
//! turn-based games and exposes a command/query API; rendering, input
//! forms, and storage live with platform-specific collaborators.

pub mod audit;
pub mod clock;
pub mod directory;
pub mod domino_train;
pub mod game;
pub mod ids;
pub mod pegging;
pub mod persist;
pub mod phase_progression;
pub mod player;
pub mod rotation;
pub mod scoring;
pub mod stakes;
pub mod stock_elimination;

// Re-export commonly used types
pub use audit::{AuditAction, AuditEntry, PauseSnapshot};
pub use clock::{Clock, FixedClock, SystemClock};
pub use directory::{GameHistoryEntry, SessionDirectory};
pub use domino_train::{
    STARTING_ENGINE, TrainGame, TrainPlayerState, TrainRound, TrainRoundInput, TrainRoundScore,
};
pub use game::{Game, GameStatus, GameType};
pub use ids::IdSource;
pub use pegging::{PegState, PeggingGame, WINNING_SCORE};
pub use persist::{PersistedDocument, SCHEMA_VERSION};
pub use phase_progression::{
    GameSettings, Hand, HandInput, HandScore, HandScoreInput, HandUpdate, PhaseGame, PhaseVariant,
    PlayerState, StakeBasis,
};
pub use player::{Player, PlayerLimits, RosterError, validate_roster};
pub use rotation::{RotationError, next_dealer};
pub use scoring::{CardCount, PHASE_GOALS, phase_goal, score_from_card_counts};
pub use stakes::{StakeEntry, StakePosting};
pub use stock_elimination::{StockGame, StockUpdate, initial_stock_count};

/// Trait for abstracting persistence of the session document.
/// Platform-specific implementations should provide this.
pub trait StateStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save the session document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be saved.
    fn save_document(&self, document: &PersistedDocument) -> Result<(), Self::Error>;

    /// Load the previously saved session document, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be loaded.
    fn load_document(&self) -> Result<Option<PersistedDocument>, Self::Error>;

    /// Delete the saved session document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be deleted.
    fn delete_document(&self) -> Result<(), Self::Error>;
}

/// Composes the session directory with a storage collaborator.
pub struct ScoreKeeper<S>
where
    S: StateStorage,
{
    storage: S,
}

impl<S> ScoreKeeper<S>
where
    S: StateStorage,
{
    /// Create a score keeper with the provided storage backend.
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Snapshot a directory and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be saved.
    pub fn save_session(&self, directory: &SessionDirectory) -> Result<(), S::Error> {
        self.storage
            .save_document(&PersistedDocument::from_directory(directory))
    }

    /// Load the saved session, applying the schema version reset rule.
    /// Returns `None` when no session was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn load_session(&self) -> Result<Option<SessionDirectory>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let Some(document) = self.storage.load_document().map_err(Into::into)? else {
            return Ok(None);
        };
        Ok(Some(document.restore(
            Box::new(SystemClock),
            IdSource::from_entropy(),
        )))
    }

    /// Discard the saved session.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be deleted.
    pub fn clear_session(&self) -> Result<(), S::Error> {
        self.storage.delete_document()
    }
}
