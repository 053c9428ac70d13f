//! Protocol-level game errors
//!
//! Wrong guesses are not errors: they are recorded as invalid moves.
//! Everything here is raised to the caller and leaves the match untouched.

/// Errors surfaced by the engine and the area adapter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Player is already in this game")]
    PlayerAlreadyInGame,

    #[error("Game is full")]
    GameFull,

    #[error("Game can no longer be joined")]
    GameNotJoinable,

    #[error("Player is not in this game")]
    PlayerNotInGame,

    #[error("Game is not startable")]
    GameNotStartable,

    #[error("Only the host can do that")]
    PlayerNotHost,

    #[error("Settings can only be changed before the game starts")]
    SettingsNotModifiable,

    #[error("Settings are not valid")]
    SettingsInvalid,

    #[error("Game is not in progress")]
    GameNotInProgress,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Game ID does not match the current game")]
    GameIdMismatch,

    #[error("Invalid command")]
    InvalidCommand,
}

impl GameError {
    /// Stable code sent to clients alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlayerAlreadyInGame => "player_already_in_game",
            Self::GameFull => "game_full",
            Self::GameNotJoinable => "game_not_joinable",
            Self::PlayerNotInGame => "player_not_in_game",
            Self::GameNotStartable => "game_not_startable",
            Self::PlayerNotHost => "player_not_host",
            Self::SettingsNotModifiable => "settings_not_modifiable",
            Self::SettingsInvalid => "settings_invalid",
            Self::GameNotInProgress => "game_not_in_progress",
            Self::NotYourTurn => "not_your_turn",
            Self::GameIdMismatch => "game_id_mismatch",
            Self::InvalidCommand => "invalid_command",
        }
    }
}
