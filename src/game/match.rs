//! Match engine and its shared handle
//!
//! One `GameMatch` per match, behind a mutex. Player commands and timer
//! callbacks both go through that lock, so a word and a timeout can never be
//! applied to the same turn concurrently.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dictionary::{normalize, Dictionary, WordList};
use super::error::GameError;
use super::scheduler::Scheduler;
use super::scoring::ScoringPolicy;
use super::state::{
    GameInstance, GameSettings, MatchState, MatchStatus, MoveRecord, WordMove, MAX_PLAYERS,
    MIN_PLAYERS, MIN_TURN_LENGTH_MS, TURN_LENGTH_STEP_MS,
};
use super::timer::TurnTimer;

/// Receives a full snapshot whenever the timer changes the match
pub type StateListener = Arc<dyn Fn(GameInstance) + Send + Sync>;

/// Collaborators injected into every match
#[derive(Clone)]
pub struct MatchServices {
    pub words: Arc<dyn WordList>,
    pub scheduler: Arc<dyn Scheduler>,
    pub scoring: Arc<dyn ScoringPolicy>,
}

/// The authoritative match engine
pub struct GameMatch {
    id: Uuid,
    state: MatchState,
    timer: TurnTimer,
    dictionary: Dictionary,
    scoring: Arc<dyn ScoringPolicy>,
    rng: ChaCha8Rng,
    /// Length of the turn in play, shrinks with consecutive accepted words
    current_turn_length: u64,
    /// Bumped on every turn so late timer callbacks can be told apart
    turn_id: u64,
    listener: Option<StateListener>,
    this: Weak<Mutex<GameMatch>>,
}

impl GameMatch {
    /// Create a match in `WAITING_FOR_PLAYERS` and return its handle
    pub fn create(
        id: Uuid,
        seed: u64,
        settings: GameSettings,
        services: &MatchServices,
        listener: Option<StateListener>,
    ) -> MatchHandle {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(_) => {
                warn!(game_id = %id, ?settings, "Discarding invalid initial settings");
                GameSettings::default()
            }
        };

        let inner = Arc::new_cyclic(|this| {
            Mutex::new(Self {
                id,
                state: MatchState::new(settings),
                timer: TurnTimer::new(services.scheduler.clone()),
                dictionary: Dictionary::new(services.words.clone()),
                scoring: services.scoring.clone(),
                rng: ChaCha8Rng::seed_from_u64(seed),
                current_turn_length: settings.turn_length,
                turn_id: 0,
                listener,
                this: this.clone(),
            })
        });

        info!(game_id = %id, "Match created");
        MatchHandle { id, inner }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Full copy of the current state
    pub fn snapshot(&self) -> GameInstance {
        GameInstance {
            id: self.id,
            state: self.state.clone(),
        }
    }

    /// Seat a player
    pub fn join(&mut self, player_id: &str) -> Result<(), GameError> {
        if self.state.is_seated(player_id) {
            return Err(GameError::PlayerAlreadyInGame);
        }
        if !self.state.status.is_pregame() {
            return Err(GameError::GameNotJoinable);
        }
        if self.state.players.len() >= MAX_PLAYERS {
            return Err(GameError::GameFull);
        }

        self.state.players.push(player_id.to_string());
        self.state
            .lives
            .insert(player_id.to_string(), self.state.settings.max_lives);
        self.state.points.insert(player_id.to_string(), 0);

        if self.state.players.len() >= MIN_PLAYERS {
            self.state.status = MatchStatus::WaitingToStart;
        }

        info!(
            game_id = %self.id,
            player_id,
            player_count = self.state.players.len(),
            "Player joined match"
        );
        Ok(())
    }

    /// Remove a player before the start, or eliminate them during play
    pub fn leave(&mut self, player_id: &str) -> Result<(), GameError> {
        if self.state.status == MatchStatus::Over {
            return Ok(());
        }
        if !self.state.is_seated(player_id) {
            return Err(GameError::PlayerNotInGame);
        }

        match self.state.status {
            MatchStatus::WaitingForPlayers | MatchStatus::WaitingToStart => {
                self.state.players.retain(|p| p != player_id);
                self.state.lives.remove(player_id);
                self.state.points.remove(player_id);
                self.state.status = if self.state.players.len() >= MIN_PLAYERS {
                    MatchStatus::WaitingToStart
                } else {
                    MatchStatus::WaitingForPlayers
                };
            }
            MatchStatus::InProgress => {
                self.state.lives.insert(player_id.to_string(), 0);

                if self.state.alive_count() <= 1 {
                    self.finish();
                } else if self.state.current_player().map(String::as_str) == Some(player_id) {
                    // Nobody should wait out an empty seat
                    self.timer.end_turn();
                    self.current_turn_length = self.state.settings.turn_length;
                    self.pass_turn_from(self.state.current_player_index);
                }
            }
            MatchStatus::Over => {}
        }

        info!(
            game_id = %self.id,
            player_id,
            status = self.state.status.as_str(),
            "Player left match"
        );
        Ok(())
    }

    /// Host starts the match
    pub fn start_game(&mut self, player_id: &str) -> Result<(), GameError> {
        if self.state.status != MatchStatus::WaitingToStart {
            return Err(GameError::GameNotStartable);
        }
        if !self.state.is_seated(player_id) {
            return Err(GameError::PlayerNotInGame);
        }
        if self.state.host().map(String::as_str) != Some(player_id) {
            return Err(GameError::PlayerNotHost);
        }

        let max_lives = self.state.settings.max_lives;
        for player in &self.state.players {
            self.state.lives.insert(player.clone(), max_lives);
            self.state.points.insert(player.clone(), 0);
        }
        self.dictionary.clear_history();

        self.state.status = MatchStatus::InProgress;
        self.state.winner = None;
        self.state.current_player_index = self.rng.gen_range(0..self.state.players.len());
        self.state.current_substring = self.dictionary.generate_substring(&mut self.rng);
        self.current_turn_length = self.state.settings.turn_length;

        info!(
            game_id = %self.id,
            player_count = self.state.players.len(),
            first_player = ?self.state.current_player(),
            "Match started"
        );

        self.begin_turn(self.current_turn_length);
        Ok(())
    }

    /// Host replaces the settings before the match starts
    pub fn change_settings(
        &mut self,
        player_id: &str,
        settings: GameSettings,
    ) -> Result<(), GameError> {
        if self.state.host().map(String::as_str) != Some(player_id) {
            return Err(GameError::PlayerNotHost);
        }
        if !self.state.status.is_pregame() {
            return Err(GameError::SettingsNotModifiable);
        }
        settings.validate()?;

        self.state.settings = settings;
        self.current_turn_length = settings.turn_length;

        info!(game_id = %self.id, ?settings, "Settings changed");
        Ok(())
    }

    /// Submit a word for the active player.
    ///
    /// Protocol violations are errors. A wrong guess is not: it is recorded
    /// with `valid = false` and the turn carries on.
    pub fn apply_move(&mut self, mv: &WordMove) -> Result<MoveRecord, GameError> {
        if self.state.status != MatchStatus::InProgress {
            return Err(GameError::GameNotInProgress);
        }
        if !self.state.is_seated(&mv.player_id) {
            return Err(GameError::PlayerNotInGame);
        }
        if self.state.current_player() != Some(&mv.player_id) {
            return Err(GameError::NotYourTurn);
        }

        let word = normalize(&mv.word);
        let accepted = self.dictionary.validate_word(&word)
            && word.contains(self.state.current_substring.as_str());

        let record = MoveRecord {
            player_id: mv.player_id.clone(),
            word: mv.word.clone(),
            valid: accepted,
        };
        self.state.moves.push(record.clone());

        if !accepted {
            debug!(
                game_id = %self.id,
                player_id = %mv.player_id,
                word = %mv.word,
                prompt = %self.state.current_substring,
                "Word rejected"
            );
            return Ok(record);
        }

        let time_left = self.timer.remaining_time();
        let turn_length = self.timer.turn_length();
        self.timer.end_turn();

        let gained = self.scoring.points_for(&word, time_left, turn_length);
        let points = self.state.points.entry(mv.player_id.clone()).or_insert(0);
        *points = points.saturating_add(gained);
        self.dictionary.add_word_to_history(&word);

        let current = self.state.current_player_index;
        self.state.current_player_index = self.state.next_living_after(current).unwrap_or(current);
        self.state.current_substring = self.dictionary.generate_substring(&mut self.rng);

        let next_length = if self.state.settings.decreasing_turn_length {
            self.current_turn_length = self
                .current_turn_length
                .saturating_sub(TURN_LENGTH_STEP_MS)
                .max(MIN_TURN_LENGTH_MS);
            self.current_turn_length
        } else {
            self.state.settings.turn_length
        };

        debug!(
            game_id = %self.id,
            player_id = %mv.player_id,
            word = %word,
            gained,
            next_length,
            "Word accepted"
        );

        self.begin_turn(next_length);
        Ok(record)
    }

    /// Active player ran out of time: lose a life, then end the match or
    /// pass the turn with the same prompt.
    pub fn handle_turn_timeout(&mut self, player_index: usize) {
        if self.state.status != MatchStatus::InProgress {
            return;
        }
        let Some(player_id) = self.state.players.get(player_index).cloned() else {
            warn!(game_id = %self.id, player_index, "Timeout for unknown seat");
            return;
        };

        let lives = self.state.lives.entry(player_id.clone()).or_insert(0);
        *lives = lives.saturating_sub(1);
        info!(
            game_id = %self.id,
            player_id = %player_id,
            lives_left = *lives,
            "Turn timed out"
        );

        if self.state.alive_count() <= 1 {
            self.finish();
            self.publish();
            return;
        }

        self.timer.end_turn();
        self.current_turn_length = self.state.settings.turn_length;
        self.pass_turn_from(player_index);
        self.publish();
    }

    /// Hand the turn to the next living player, keeping the prompt
    fn pass_turn_from(&mut self, from: usize) {
        self.state.current_player_index = self.state.next_living_after(from).unwrap_or(from);
        self.begin_turn(self.state.settings.turn_length);
    }

    fn finish(&mut self) {
        self.timer.end_turn();
        self.state.status = MatchStatus::Over;
        let winner = self.state.living_players().next().cloned();
        self.state.winner = winner;
        self.state.current_time_left = 0;

        info!(game_id = %self.id, winner = ?self.state.winner, "Match over");
    }

    fn begin_turn(&mut self, duration_ms: u64) {
        self.turn_id += 1;
        self.state.current_time_left = duration_ms;

        let turn_id = self.turn_id;
        let on_expire = {
            let game = self.this.clone();
            move || {
                if let Some(game) = game.upgrade() {
                    game.lock().on_turn_expired(turn_id);
                }
            }
        };
        let on_tick = {
            let game = self.this.clone();
            move || {
                if let Some(game) = game.upgrade() {
                    game.lock().on_turn_tick(turn_id);
                }
            }
        };

        if !self.timer.start_turn(duration_ms, on_expire, on_tick) {
            warn!(game_id = %self.id, "Turn timer was still running");
        }
    }

    fn on_turn_expired(&mut self, turn_id: u64) {
        if turn_id != self.turn_id {
            debug!(game_id = %self.id, turn_id, "Ignoring expiry for a finished turn");
            return;
        }
        self.handle_turn_timeout(self.state.current_player_index);
    }

    fn on_turn_tick(&mut self, turn_id: u64) {
        if turn_id != self.turn_id || self.state.status != MatchStatus::InProgress {
            return;
        }
        self.state.current_time_left = self.timer.remaining_time();
        self.publish();
    }

    fn publish(&self) {
        if let Some(listener) = &self.listener {
            listener(self.snapshot());
        }
    }
}

/// Cloneable handle to a match; every call takes the match lock
#[derive(Clone)]
pub struct MatchHandle {
    id: Uuid,
    inner: Arc<Mutex<GameMatch>>,
}

impl MatchHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn join(&self, player_id: &str) -> Result<(), GameError> {
        self.inner.lock().join(player_id)
    }

    pub fn leave(&self, player_id: &str) -> Result<(), GameError> {
        self.inner.lock().leave(player_id)
    }

    pub fn start_game(&self, player_id: &str) -> Result<(), GameError> {
        self.inner.lock().start_game(player_id)
    }

    pub fn change_settings(
        &self,
        player_id: &str,
        settings: GameSettings,
    ) -> Result<(), GameError> {
        self.inner.lock().change_settings(player_id, settings)
    }

    pub fn apply_move(&self, mv: &WordMove) -> Result<MoveRecord, GameError> {
        self.inner.lock().apply_move(mv)
    }

    pub fn snapshot(&self) -> GameInstance {
        self.inner.lock().snapshot()
    }

    /// Send the current state to the listener without releasing the match
    /// lock in between, so a timer publish cannot overtake it.
    pub fn publish(&self) {
        self.inner.lock().publish();
    }

    pub fn status(&self) -> MatchStatus {
        self.inner.lock().state.status
    }

    pub fn settings(&self) -> GameSettings {
        self.inner.lock().state.settings
    }

    pub fn is_seated(&self, player_id: &str) -> bool {
        self.inner.lock().state.is_seated(player_id)
    }
}
