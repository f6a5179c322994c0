//! Versioned persisted document. The engine never performs I/O; a storage
//! collaborator saves and loads this document through the seam in `lib.rs`.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;
use crate::clock::Clock;
use crate::directory::{GameHistoryEntry, SessionDirectory};
use crate::game::{Game, GameType};
use crate::ids::IdSource;
use crate::stakes::StakeEntry;

/// Current schema version. A document carrying any other version is
/// discarded wholesale; there is no field-by-field migration.
pub const SCHEMA_VERSION: u32 = 2;

/// Everything a session needs to survive a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDocument {
    pub version: u32,
    #[serde(default)]
    pub games: Vec<Game>,
    #[serde(default)]
    pub current_game_id: Option<String>,
    #[serde(default)]
    pub active_game_id: Option<String>,
    #[serde(default)]
    pub game_history: Vec<GameHistoryEntry>,
    #[serde(default)]
    pub game_snapshots: Vec<AuditEntry>,
    #[serde(default)]
    pub stakes_history: Vec<StakeEntry>,
    pub selected_game_type: GameType,
}

impl Default for PersistedDocument {
    fn default() -> Self {
        Self::empty()
    }
}

impl PersistedDocument {
    /// The document a brand-new session starts from.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: SCHEMA_VERSION,
            games: Vec::new(),
            current_game_id: None,
            active_game_id: None,
            game_history: Vec::new(),
            game_snapshots: Vec::new(),
            stakes_history: Vec::new(),
            selected_game_type: GameType::PhaseProgression,
        }
    }

    /// Snapshot a directory into its persistable form.
    #[must_use]
    pub fn from_directory(directory: &SessionDirectory) -> Self {
        Self {
            version: SCHEMA_VERSION,
            games: directory.games.clone(),
            current_game_id: directory.current_game_id.clone(),
            active_game_id: directory.active_game_id.clone(),
            game_history: directory.game_history.clone(),
            game_snapshots: directory.audit_log.clone(),
            stakes_history: directory.stakes_history.clone(),
            selected_game_type: directory.selected_game_type,
        }
    }

    /// Rebuild a directory with fresh time and id sources. A version
    /// mismatch resets to the empty session rather than migrating.
    #[must_use]
    pub fn restore(self, clock: Box<dyn Clock>, ids: IdSource) -> SessionDirectory {
        let doc = if self.version == SCHEMA_VERSION {
            self
        } else {
            warn!(
                "persisted document version {} != {SCHEMA_VERSION}, resetting",
                self.version
            );
            Self::empty()
        };
        let mut directory = SessionDirectory::with_sources(clock, ids);
        directory.games = doc.games;
        directory.current_game_id = doc.current_game_id;
        directory.active_game_id = doc.active_game_id;
        directory.game_history = doc.game_history;
        directory.audit_log = doc.game_snapshots;
        directory.stakes_history = doc.stakes_history;
        directory.selected_game_type = doc.selected_game_type;
        directory
    }
}
