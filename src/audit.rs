//! Append-only lifecycle audit log for forensic replay.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::game::GameType;

/// Lifecycle action recorded against a game instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Paused,
    Resumed,
    Switched,
    Completed,
}

/// Minimal externally-visible summary of a game's position. Enough to
/// render a resume banner; never authoritative state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseSnapshot {
    pub dealer_id: String,
    pub current_player_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<BTreeMap<String, u32>>,
}

/// One audit log entry. Entries are never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub game_id: String,
    pub game_type: GameType,
    pub action: AuditAction,
    pub timestamp: u64,
    pub snapshot: PauseSnapshot,
}
