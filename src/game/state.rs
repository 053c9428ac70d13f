//! Match data model
//!
//! These are the wire types handed to listeners. A published `GameInstance`
//! is always a full copy taken under the match lock.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::error::GameError;

/// Player identifier (foreign key into the town roster)
pub type PlayerId = String;

/// Maximum number of seated players
pub const MAX_PLAYERS: usize = 8;
/// Players required before the host may start
pub const MIN_PLAYERS: usize = 2;
/// Shortest turn a host may configure, and the floor for shrinking turns
pub const MIN_TURN_LENGTH_MS: u64 = 5_000;
/// How much each accepted word shortens the next turn when enabled
pub const TURN_LENGTH_STEP_MS: u64 = 5_000;

/// Match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Fewer than `MIN_PLAYERS` seated
    WaitingForPlayers,
    /// Enough players, host has not started
    WaitingToStart,
    /// Turns are running
    InProgress,
    /// Terminal
    Over,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForPlayers => "waiting_for_players",
            Self::WaitingToStart => "waiting_to_start",
            Self::InProgress => "in_progress",
            Self::Over => "over",
        }
    }

    /// Settings may only change before the first turn
    pub fn is_pregame(&self) -> bool {
        matches!(self, Self::WaitingForPlayers | Self::WaitingToStart)
    }
}

/// Host-configurable settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// Lives each player starts with
    pub max_lives: u32,
    /// Turn length in milliseconds
    pub turn_length: u64,
    /// Shorten the turn after every accepted word
    pub decreasing_turn_length: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_lives: 3,
            turn_length: 25_000,
            decreasing_turn_length: false,
        }
    }
}

impl GameSettings {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.max_lives < 1 || self.turn_length < MIN_TURN_LENGTH_MS {
            return Err(GameError::SettingsInvalid);
        }
        Ok(())
    }
}

/// A word submitted by a player (transient input)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordMove {
    /// Filled in from the session when a client omits it
    #[serde(rename = "playerID", default)]
    pub player_id: PlayerId,
    pub word: String,
}

impl WordMove {
    pub fn new(player_id: impl Into<PlayerId>, word: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            word: word.into(),
        }
    }
}

/// Audit entry for every attempted word
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    pub word: String,
    pub valid: bool,
}

/// Canonical match state (owned by the engine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    pub status: MatchStatus,
    /// Seating order; index 0 is the host
    pub players: Vec<PlayerId>,
    pub lives: HashMap<PlayerId, u32>,
    pub points: HashMap<PlayerId, u32>,
    pub current_player_index: usize,
    pub current_substring: String,
    /// Milliseconds left in the active turn
    pub current_time_left: u64,
    pub settings: GameSettings,
    pub moves: Vec<MoveRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<PlayerId>,
}

impl MatchState {
    pub fn new(settings: GameSettings) -> Self {
        Self {
            status: MatchStatus::WaitingForPlayers,
            players: Vec::new(),
            lives: HashMap::new(),
            points: HashMap::new(),
            current_player_index: 0,
            current_substring: String::new(),
            current_time_left: 0,
            settings,
            moves: Vec::new(),
            winner: None,
        }
    }

    pub fn is_seated(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p == player_id)
    }

    pub fn host(&self) -> Option<&PlayerId> {
        self.players.first()
    }

    pub fn lives_of(&self, player_id: &str) -> u32 {
        self.lives.get(player_id).copied().unwrap_or(0)
    }

    /// Player whose turn it is (only meaningful while in progress)
    pub fn current_player(&self) -> Option<&PlayerId> {
        self.players.get(self.current_player_index)
    }

    /// Players with at least one life left, in seating order
    pub fn living_players(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.iter().filter(|p| self.lives_of(p) > 0)
    }

    pub fn alive_count(&self) -> usize {
        self.living_players().count()
    }

    /// Next seat after `from` (exclusive, wrapping) held by a living player
    pub fn next_living_after(&self, from: usize) -> Option<usize> {
        let n = self.players.len();
        (1..=n)
            .map(|offset| (from + offset) % n)
            .find(|&idx| self.lives_of(&self.players[idx]) > 0)
    }
}

/// Snapshot published to listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInstance {
    pub id: Uuid,
    pub state: MatchState,
}
