//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use crate::app::AppState;
use crate::area::{AreaCommand, CommandResponse, GameResult};
use crate::game::{GameError, GameInstance};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origins
        .iter()
        .filter_map(|s| s.parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/areas/:area_id/game", get(game_handler))
        .route("/areas/:area_id/history", get(history_handler))
        .route("/areas/:area_id/commands", post(command_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    areas: usize,
    live_matches: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        areas: state.areas.area_count(),
        live_matches: state.areas.live_matches(),
    })
}

// ============================================================================
// Area endpoints
// ============================================================================

async fn game_handler(
    State(state): State<AppState>,
    Path(area_id): Path<String>,
) -> Result<Json<GameInstance>, AppError> {
    let area = state
        .areas
        .get(&area_id)
        .ok_or_else(|| AppError::NotFound(format!("area {area_id}")))?;
    let game = area
        .game()
        .ok_or_else(|| AppError::NotFound(format!("no game in area {area_id}")))?;
    Ok(Json(game))
}

async fn history_handler(
    State(state): State<AppState>,
    Path(area_id): Path<String>,
) -> Result<Json<Vec<GameResult>>, AppError> {
    let area = state
        .areas
        .get(&area_id)
        .ok_or_else(|| AppError::NotFound(format!("area {area_id}")))?;
    Ok(Json(area.history()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandRequest {
    player_id: String,
    command: AreaCommand,
}

async fn command_handler(
    State(state): State<AppState>,
    Path(area_id): Path<String>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let player_id = req.player_id.trim();
    if player_id.is_empty() {
        return Err(AppError::BadRequest("playerId is required".to_string()));
    }

    debug!(area_id = %area_id, player_id, command = req.command.kind(), "HTTP command");

    // Only a join may open an area
    let response = match req.command {
        AreaCommand::JoinGame => state.areas.join(&area_id, player_id)?,
        command => state
            .areas
            .get(&area_id)
            .ok_or_else(|| AppError::NotFound(format!("area {area_id}")))?
            .handle_command(player_id, command)?,
    };
    Ok(Json(response))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Game(#[from] GameError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match &self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": msg }),
            ),
            AppError::Game(e) => (
                StatusCode::CONFLICT,
                serde_json::json!({ "error": e.to_string(), "code": e.code() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
