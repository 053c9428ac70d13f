//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::area::{AreaEvent, BombPartyArea};
use crate::util::rate_limit::SessionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Area to attach to, created on first use
    pub area: String,
    /// Player identifier from the town roster
    pub player: String,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let player_id = query.player.trim().to_string();
    let area_id = query.area.trim().to_string();
    if player_id.is_empty() || area_id.is_empty() {
        warn!("WebSocket upgrade without area or player");
        return (StatusCode::BAD_REQUEST, "area and player are required").into_response();
    }

    info!(area_id = %area_id, player_id = %player_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, state, area_id, player_id))
}

/// Handle the upgraded WebSocket connection.
///
/// Every socket counts as one session of its player. The player leaves the
/// live match only when their last socket in the area closes, and the area
/// is dropped once it is idle.
async fn handle_socket(socket: WebSocket, state: AppState, area_id: String, player_id: String) {
    let area = state.areas.attach(&area_id, &player_id);
    let rate_limit = state.config.move_rate_limit;
    info!(area_id = %area.id(), player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before the welcome so no update falls between the two
    let events = area.subscribe();

    let welcome = ServerMsg::Welcome {
        player_id: player_id.clone(),
        area_id: area.id().to_string(),
        server_time: unix_millis(),
        game: area.game(),
        history: area.history(),
    };

    match send_msg(&mut ws_sink, &welcome).await {
        Ok(()) => run_session(&area, &player_id, rate_limit, ws_sink, ws_stream, events).await,
        Err(e) => error!(player_id = %player_id, error = %e, "Failed to send welcome"),
    }

    // A vanished player must not hold up the table
    state.areas.detach(&area, &player_id);

    info!(area_id = %area.id(), player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    area: &BombPartyArea,
    player_id: &str,
    rate_limit: u32,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut events: broadcast::Receiver<AreaEvent>,
) {
    let rate_limiter = SessionRateLimiter::new(rate_limit);
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMsg>(32);

    // Spawn writer task: area events and direct replies -> WebSocket
    let writer_player = player_id.to_string();
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(event) => ServerMsg::from(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            player_id = %writer_player,
                            lagged_count = n,
                            "Client lagged, skipping {} updates", n
                        );
                        // Continue - the next update is a full snapshot
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(player_id = %writer_player, "Area channel closed");
                        break;
                    }
                },
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %writer_player, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> area
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = if !rate_limiter.check_command() {
                    warn!(player_id = %player_id, "Rate limited client message");
                    ServerMsg::Error {
                        message: "Too many messages".to_string(),
                    }
                } else {
                    handle_text(area, player_id, &text)
                };

                if reply_tx.send(reply).await.is_err() {
                    debug!(player_id = %player_id, "Writer gone");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(player_id = %player_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(player_id = %player_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}

/// Turn one client text frame into the reply for that client
fn handle_text(area: &BombPartyArea, player_id: &str, text: &str) -> ServerMsg {
    match serde_json::from_str::<ClientMsg>(text) {
        Ok(ClientMsg::Command {
            request_id,
            command,
        }) => {
            let result = area.handle_command(player_id, command);
            if let Err(e) = &result {
                debug!(player_id = %player_id, code = e.code(), "Command rejected");
            }
            ServerMsg::command_result(request_id, result)
        }
        Ok(ClientMsg::Ping { t }) => ServerMsg::Pong {
            t,
            server_time: unix_millis(),
        },
        Err(e) => {
            warn!(player_id = %player_id, error = %e, "Failed to parse client message");
            ServerMsg::Error {
                message: format!("Invalid message: {e}"),
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
