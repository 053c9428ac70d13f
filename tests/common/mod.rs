#![allow(dead_code)]

use std::sync::Arc;

use bomb_party_server::area::{AreaCommand, BombPartyArea, CommandResponse};
use bomb_party_server::game::{Corpus, LengthScoring, MatchServices, TokioScheduler};
use uuid::Uuid;

/// Services on the real tokio clock. Call from inside a runtime.
pub fn services(words: &[&str]) -> MatchServices {
    MatchServices {
        words: Arc::new(Corpus::from_words(words).expect("test corpus")),
        scheduler: Arc::new(TokioScheduler::new()),
        scoring: Arc::new(LengthScoring::default()),
    }
}

pub fn join(area: &BombPartyArea, player: &str) -> Uuid {
    match area.handle_command(player, AreaCommand::JoinGame) {
        Ok(CommandResponse::Joined { game_id }) => game_id,
        other => panic!("join failed: {other:?}"),
    }
}
