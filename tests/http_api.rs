//! Router exercised in-process with `tower::ServiceExt::oneshot`

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bomb_party_server::app::AppState;
use bomb_party_server::config::Config;
use bomb_party_server::http::build_router;

fn router() -> Router {
    let state = AppState::new(Config::default(), common::services(&["test", "hello"]));
    build_router(state)
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn command(area: &str, player: &str, command: Value) -> Request<Body> {
    Request::post(format!("/areas/{area}/commands"))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "playerId": player, "command": command }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let router = router();
    let (status, body) = call(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["areas"], 0);
}

#[tokio::test]
async fn join_then_read_game_and_history() {
    let router = router();

    let (status, body) = call(&router, command("lobby", "p1", json!({ "type": "JoinGame" }))).await;
    assert_eq!(status, StatusCode::OK);
    let game_id = body["gameID"].as_str().unwrap().to_string();

    let (status, game) = call(&router, get("/areas/lobby/game")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["id"], game_id.as_str());
    assert_eq!(game["state"]["status"], "WAITING_FOR_PLAYERS");
    assert_eq!(game["state"]["players"], json!(["p1"]));

    let (status, history) = call(&router, get("/areas/lobby/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history, json!([]));

    let (_, health) = call(&router, get("/health")).await;
    assert_eq!(health["live_matches"], 1);
    assert_eq!(health["areas"], 1);
}

#[tokio::test]
async fn game_errors_carry_codes() {
    let router = router();
    let (_, body) = call(&router, command("lobby", "p1", json!({ "type": "JoinGame" }))).await;
    let game_id = body["gameID"].clone();

    let (status, body) = call(
        &router,
        command("lobby", "p1", json!({ "type": "StartGame", "gameID": game_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "game_not_startable");

    let (status, body) = call(&router, command("lobby", "p1", json!({ "type": "Dance" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_command");
}

#[tokio::test]
async fn unknown_area_is_not_found() {
    let router = router();
    let (status, body) = call(&router, get("/areas/nowhere/game")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nowhere"));
}

#[tokio::test]
async fn blank_player_is_rejected() {
    let router = router();
    let (status, _) = call(&router, command("lobby", "  ", json!({ "type": "JoinGame" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn commands_other_than_join_do_not_open_areas() {
    let router = router();
    for area in ["a1", "a2", "a3"] {
        let (status, _) = call(
            &router,
            command(
                area,
                "p1",
                json!({ "type": "StartGame", "gameID": "00000000-0000-0000-0000-000000000000" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (_, health) = call(&router, get("/health")).await;
    assert_eq!(health["areas"], 0);
}
