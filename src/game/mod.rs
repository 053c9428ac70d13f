//! Bomb Party match core
//!
//! Transport-agnostic: nothing in here performs I/O. Time comes from an
//! injected `Scheduler` and words from an injected `WordList`.

pub mod dictionary;
pub mod error;
pub mod r#match;
pub mod scheduler;
pub mod scoring;
pub mod state;
pub mod timer;

pub use dictionary::{normalize, Corpus, CorpusError, Dictionary, WordList};
pub use error::GameError;
pub use r#match::{GameMatch, MatchHandle, MatchServices, StateListener};
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, TokioScheduler};
pub use scoring::{LengthScoring, ScoringPolicy};
pub use state::{
    GameInstance, GameSettings, MatchState, MatchStatus, MoveRecord, PlayerId, WordMove,
    MAX_PLAYERS, MIN_PLAYERS, MIN_TURN_LENGTH_MS, TURN_LENGTH_STEP_MS,
};
pub use timer::{TurnTimer, TICK_MS};
