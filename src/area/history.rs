//! Finished-match history and area event fan-out

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::game::{GameInstance, MatchStatus, PlayerId};

/// Outcome of a finished match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    #[serde(rename = "gameID")]
    pub game_id: Uuid,
    /// Points per seated player when the match ended
    pub scores: HashMap<PlayerId, u32>,
    pub winner: Option<PlayerId>,
    pub finished_at: DateTime<Utc>,
}

impl GameResult {
    pub fn from_instance(instance: &GameInstance) -> Self {
        let scores = instance
            .state
            .players
            .iter()
            .map(|p| (p.clone(), instance.state.points.get(p).copied().unwrap_or(0)))
            .collect();
        Self {
            game_id: instance.id,
            scores,
            winner: instance.state.winner.clone(),
            finished_at: Utc::now(),
        }
    }
}

/// Change notification for area subscribers
#[derive(Debug, Clone)]
pub enum AreaEvent {
    GameUpdated(GameInstance),
    HistoryUpdated(GameResult),
}

/// History plus event channel. Shared with the live match's listener, so it
/// must never call back into a match.
pub struct AreaSink {
    area_id: String,
    history: Mutex<Vec<GameResult>>,
    events: broadcast::Sender<AreaEvent>,
}

impl AreaSink {
    pub fn new(area_id: impl Into<String>, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            area_id: area_id.into(),
            history: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Record the outcome if the match is over, then notify subscribers
    pub fn state_updated(&self, instance: GameInstance) {
        if instance.state.status == MatchStatus::Over {
            self.record(&instance);
        }
        // No subscribers is fine
        let _ = self.events.send(AreaEvent::GameUpdated(instance));
    }

    /// Append a result once per match id; returns whether it was new
    pub fn record(&self, instance: &GameInstance) -> bool {
        let result = {
            let mut history = self.history.lock();
            if history.iter().any(|r| r.game_id == instance.id) {
                return false;
            }
            let result = GameResult::from_instance(instance);
            history.push(result.clone());
            result
        };

        info!(
            area_id = %self.area_id,
            game_id = %result.game_id,
            winner = ?result.winner,
            "Match recorded in history"
        );
        let _ = self.events.send(AreaEvent::HistoryUpdated(result));
        true
    }

    pub fn history(&self) -> Vec<GameResult> {
        self.history.lock().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AreaEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameSettings, MatchState};

    fn finished(id: Uuid) -> GameInstance {
        let mut state = MatchState::new(GameSettings::default());
        state.status = MatchStatus::Over;
        for (p, pts) in [("a", 70), ("b", 0)] {
            state.players.push(p.into());
            state.points.insert(p.into(), pts);
        }
        state.winner = Some("a".into());
        GameInstance { id, state }
    }

    #[test]
    fn records_each_match_once() {
        let sink = AreaSink::new("area", 16);
        let id = Uuid::new_v4();
        assert!(sink.record(&finished(id)));
        assert!(!sink.record(&finished(id)));
        sink.state_updated(finished(id));

        let history = sink.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].scores["a"], 70);
        assert_eq!(history[0].winner.as_deref(), Some("a"));
    }

    #[test]
    fn unfinished_updates_leave_history_alone() {
        let sink = AreaSink::new("area", 16);
        let mut rx = sink.subscribe();
        let mut instance = finished(Uuid::new_v4());
        instance.state.status = MatchStatus::InProgress;
        sink.state_updated(instance.clone());

        assert!(sink.history().is_empty());
        assert!(matches!(rx.try_recv(), Ok(AreaEvent::GameUpdated(g)) if g == instance));
    }

    #[test]
    fn history_event_precedes_final_game_update() {
        let sink = AreaSink::new("area", 16);
        let mut rx = sink.subscribe();
        sink.state_updated(finished(Uuid::new_v4()));
        assert!(matches!(rx.try_recv(), Ok(AreaEvent::HistoryUpdated(_))));
        assert!(matches!(rx.try_recv(), Ok(AreaEvent::GameUpdated(_))));
    }
}
