//! Commands accepted by a game area

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{GameError, GameSettings, WordMove};

/// A player command addressed to an area's live match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AreaCommand {
    /// Join the live match, creating one if needed
    JoinGame,
    StartGame {
        #[serde(rename = "gameID")]
        game_id: Uuid,
    },
    GameSettings {
        #[serde(rename = "gameID")]
        game_id: Uuid,
        settings: GameSettings,
    },
    GameMove {
        #[serde(rename = "gameID")]
        game_id: Uuid,
        #[serde(rename = "move")]
        mv: WordMove,
    },
    LeaveGame {
        #[serde(rename = "gameID")]
        game_id: Uuid,
    },
    /// Any command type this area does not handle
    #[serde(other)]
    Unsupported,
}

impl AreaCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinGame => "JoinGame",
            Self::StartGame { .. } => "StartGame",
            Self::GameSettings { .. } => "GameSettings",
            Self::GameMove { .. } => "GameMove",
            Self::LeaveGame { .. } => "LeaveGame",
            Self::Unsupported => "Unsupported",
        }
    }

    /// Match id the command targets. `JoinGame` targets whatever is live.
    pub fn game_id(&self) -> Result<Option<Uuid>, GameError> {
        match self {
            Self::JoinGame => Ok(None),
            Self::StartGame { game_id }
            | Self::GameSettings { game_id, .. }
            | Self::GameMove { game_id, .. }
            | Self::LeaveGame { game_id } => Ok(Some(*game_id)),
            Self::Unsupported => Err(GameError::InvalidCommand),
        }
    }
}

/// Successful command result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandResponse {
    Joined {
        #[serde(rename = "gameID")]
        game_id: Uuid,
    },
    MoveEchoed {
        #[serde(rename = "move")]
        mv: WordMove,
    },
    Ack,
}
