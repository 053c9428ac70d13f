//! Bomb Party game area
//!
//! Owns at most one live match at a time and routes player commands to it.
//! A new match replaces the old one on the first `JoinGame` after it ends,
//! inheriting its settings.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::command::{AreaCommand, CommandResponse};
use super::history::{AreaEvent, AreaSink, GameResult};
use crate::game::{
    GameError, GameInstance, GameMatch, GameSettings, MatchHandle, MatchServices, MatchStatus,
    StateListener, WordMove,
};

const EVENT_CAPACITY: usize = 64;

pub struct BombPartyArea {
    id: String,
    services: MatchServices,
    seeds: Mutex<ChaCha8Rng>,
    game: Mutex<Option<MatchHandle>>,
    sink: Arc<AreaSink>,
    /// Open connections per player
    sessions: Mutex<HashMap<String, usize>>,
}

impl BombPartyArea {
    pub fn new(id: impl Into<String>, services: MatchServices) -> Self {
        Self::with_rng(id, services, ChaCha8Rng::from_entropy())
    }

    /// Deterministic match seeds, for tests
    pub fn with_seed(id: impl Into<String>, services: MatchServices, seed: u64) -> Self {
        Self::with_rng(id, services, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(id: impl Into<String>, services: MatchServices, rng: ChaCha8Rng) -> Self {
        let id = id.into();
        Self {
            sink: Arc::new(AreaSink::new(id.clone(), EVENT_CAPACITY)),
            id,
            services,
            seeds: Mutex::new(rng),
            game: Mutex::new(None),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the live match, if any
    pub fn game(&self) -> Option<GameInstance> {
        self.game.lock().as_ref().map(MatchHandle::snapshot)
    }

    pub fn history(&self) -> Vec<GameResult> {
        self.sink.history()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AreaEvent> {
        self.sink.subscribe()
    }

    /// Apply a command on behalf of `player_id`.
    ///
    /// Subscribers are notified only when the command succeeds.
    pub fn handle_command(
        &self,
        player_id: &str,
        command: AreaCommand,
    ) -> Result<CommandResponse, GameError> {
        let kind = command.kind();
        let target = command.game_id()?;
        let mut slot = self.game.lock();

        let Some(game_id) = target else {
            let live = slot
                .as_ref()
                .filter(|game| game.status() != MatchStatus::Over)
                .cloned();
            let game = match live {
                Some(game) => game,
                None => {
                    let settings = slot
                        .as_ref()
                        .map(MatchHandle::settings)
                        .unwrap_or_default();
                    let game = self.create_match(settings);
                    *slot = Some(game.clone());
                    game
                }
            };
            game.join(player_id)?;
            game.publish();
            return Ok(CommandResponse::Joined { game_id: game.id() });
        };

        let game = slot.as_ref().ok_or(GameError::GameNotInProgress)?;
        if game.id() != game_id {
            return Err(GameError::GameIdMismatch);
        }

        let response = match command {
            AreaCommand::StartGame { .. } => {
                game.start_game(player_id)?;
                CommandResponse::Ack
            }
            AreaCommand::GameSettings { settings, .. } => {
                game.change_settings(player_id, settings)?;
                CommandResponse::Ack
            }
            AreaCommand::GameMove { mv, .. } => {
                // The session decides who is moving, not the payload
                let mv = WordMove::new(player_id, mv.word);
                game.apply_move(&mv)?;
                CommandResponse::MoveEchoed { mv }
            }
            AreaCommand::LeaveGame { .. } => {
                game.leave(player_id)?;
                CommandResponse::Ack
            }
            AreaCommand::JoinGame | AreaCommand::Unsupported => {
                return Err(GameError::InvalidCommand)
            }
        };

        debug!(area_id = %self.id, player_id, command = kind, "Command applied");
        game.publish();
        Ok(response)
    }

    /// Register an open connection for `player_id`
    pub fn connect(&self, player_id: &str) {
        *self.sessions.lock().entry(player_id.to_string()).or_insert(0) += 1;
    }

    /// A connection closed. Once the player has no connection left, they
    /// leave the live match if seated.
    pub fn disconnect(&self, player_id: &str) {
        {
            let mut sessions = self.sessions.lock();
            if let Some(count) = sessions.get_mut(player_id) {
                *count = count.saturating_sub(1);
                if *count > 0 {
                    debug!(area_id = %self.id, player_id, open = *count, "Player still connected");
                    return;
                }
                sessions.remove(player_id);
            }
        }

        let slot = self.game.lock();
        let Some(game) = slot.as_ref() else {
            return;
        };
        if game.status() == MatchStatus::Over || !game.is_seated(player_id) {
            return;
        }
        if game.leave(player_id).is_ok() {
            info!(area_id = %self.id, player_id, "Disconnected player left match");
            game.publish();
        }
    }

    /// No connections and no match has ever been opened
    pub fn is_idle(&self) -> bool {
        self.sessions.lock().is_empty() && self.game.lock().is_none()
    }

    fn create_match(&self, settings: GameSettings) -> MatchHandle {
        let seed = self.seeds.lock().gen();
        let listener: StateListener = {
            let sink = self.sink.clone();
            Arc::new(move |instance| sink.state_updated(instance))
        };
        let game = GameMatch::create(
            Uuid::new_v4(),
            seed,
            settings,
            &self.services,
            Some(listener),
        );
        info!(area_id = %self.id, game_id = %game.id(), "New match opened");
        game
    }
}
