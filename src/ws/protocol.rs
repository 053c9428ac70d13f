//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::area::{AreaCommand, AreaEvent, CommandResponse, GameResult};
use crate::game::{GameError, GameInstance};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Area command; the reply carries the same request id
    Command {
        request_id: u64,
        command: AreaCommand,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Welcome message after connection, with the area as it stands
    Welcome {
        player_id: String,
        area_id: String,
        server_time: u64,
        game: Option<GameInstance>,
        history: Vec<GameResult>,
    },

    /// Command succeeded
    CommandOk {
        request_id: u64,
        response: CommandResponse,
    },

    /// Command rejected; the match is unchanged
    CommandError {
        request_id: u64,
        code: String,
        message: String,
    },

    /// Full replacement of the area's live match
    AreaChanged { game: GameInstance },

    /// A finished match was added to the history
    HistoryUpdated { result: GameResult },

    /// Pong response to ping
    Pong {
        /// Echo client timestamp
        t: u64,
        /// Server timestamp
        server_time: u64,
    },

    /// Malformed or rate-limited message
    Error { message: String },
}

impl ServerMsg {
    pub fn command_result(request_id: u64, result: Result<CommandResponse, GameError>) -> Self {
        match result {
            Ok(response) => Self::CommandOk {
                request_id,
                response,
            },
            Err(e) => Self::CommandError {
                request_id,
                code: e.code().to_string(),
                message: e.to_string(),
            },
        }
    }
}

impl From<AreaEvent> for ServerMsg {
    fn from(event: AreaEvent) -> Self {
        match event {
            AreaEvent::GameUpdated(game) => Self::AreaChanged { game },
            AreaEvent::HistoryUpdated(result) => Self::HistoryUpdated { result },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_command_envelope() {
        let msg: ClientMsg = serde_json::from_value(json!({
            "type": "command",
            "requestId": 7,
            "command": { "type": "JoinGame" }
        }))
        .unwrap();
        match msg {
            ClientMsg::Command {
                request_id,
                command,
            } => {
                assert_eq!(request_id, 7);
                assert_eq!(command, AreaCommand::JoinGame);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn errors_carry_code_and_message() {
        let msg = ServerMsg::command_result(3, Err(GameError::NotYourTurn));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "commandError");
        assert_eq!(json["requestId"], 3);
        assert_eq!(json["code"], "not_your_turn");
        assert_eq!(json["message"], "Not your turn");
    }

    #[test]
    fn pong_uses_camel_case_fields() {
        let json = serde_json::to_value(ServerMsg::Pong {
            t: 1,
            server_time: 2,
        })
        .unwrap();
        assert_eq!(json, json!({ "type": "pong", "t": 1, "serverTime": 2 }));
    }
}
