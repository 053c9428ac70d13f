//! Area registry

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::command::{AreaCommand, CommandResponse};
use super::game_area::BombPartyArea;
use crate::game::{GameError, MatchServices, MatchStatus};

/// All areas hosted by this server, created on first use
pub struct AreaRegistry {
    areas: DashMap<String, Arc<BombPartyArea>>,
    services: MatchServices,
}

impl AreaRegistry {
    pub fn new(services: MatchServices) -> Self {
        Self {
            areas: DashMap::new(),
            services,
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<BombPartyArea>> {
        self.areas.get(id).map(|a| a.value().clone())
    }

    /// Open a connection for `player_id`, creating the area if needed.
    ///
    /// The session is registered while the map entry is held, so a
    /// concurrent `release` cannot drop the area in between.
    pub fn attach(&self, id: &str, player_id: &str) -> Arc<BombPartyArea> {
        let entry = self.entry(id);
        entry.connect(player_id);
        entry.value().clone()
    }

    /// Close a connection opened with `attach` and drop the area if that
    /// left it idle.
    pub fn detach(&self, area: &BombPartyArea, player_id: &str) {
        area.disconnect(player_id);
        if self.release(area.id()) {
            debug!(area_id = %area.id(), "Idle area released");
        }
    }

    /// Join the area's match, creating the area if needed
    pub fn join(&self, id: &str, player_id: &str) -> Result<CommandResponse, GameError> {
        self.entry(id).handle_command(player_id, AreaCommand::JoinGame)
    }

    /// Drop the area if nobody is connected and it never opened a match
    pub fn release(&self, id: &str) -> bool {
        self.areas.remove_if(id, |_, area| area.is_idle()).is_some()
    }

    fn entry(&self, id: &str) -> RefMut<'_, String, Arc<BombPartyArea>> {
        self.areas
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(BombPartyArea::new(id, self.services.clone())))
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    /// Areas with a match that has not finished
    pub fn live_matches(&self) -> usize {
        self.areas
            .iter()
            .filter(|a| {
                a.value()
                    .game()
                    .is_some_and(|g| g.state.status != MatchStatus::Over)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Corpus, LengthScoring, ManualScheduler};

    fn registry() -> AreaRegistry {
        AreaRegistry::new(MatchServices {
            words: Arc::new(Corpus::from_words(["test", "hello"]).unwrap()),
            scheduler: Arc::new(ManualScheduler::new()),
            scoring: Arc::new(LengthScoring::default()),
        })
    }

    #[test]
    fn creates_areas_once() {
        let registry = registry();
        assert!(registry.get("lobby").is_none());
        let a = registry.attach("lobby", "p1");
        let b = registry.attach("lobby", "p2");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.area_count(), 1);
        assert_eq!(a.id(), "lobby");
    }

    #[test]
    fn counts_live_matches() {
        let registry = registry();
        registry.attach("empty", "p9");
        assert_eq!(registry.live_matches(), 0);
        registry.join("lobby", "p1").unwrap();
        assert_eq!(registry.live_matches(), 1);
        assert_eq!(registry.area_count(), 2);
    }

    #[test]
    fn idle_areas_are_released_on_last_detach() {
        let registry = registry();
        let area = registry.attach("lobby", "p1");
        registry.attach("lobby", "p2");

        registry.detach(&area, "p1");
        assert_eq!(registry.area_count(), 1);
        registry.detach(&area, "p2");
        assert_eq!(registry.area_count(), 0);
        assert!(registry.get("lobby").is_none());
    }

    #[test]
    fn areas_with_a_match_are_kept() {
        let registry = registry();
        let area = registry.attach("lobby", "p1");
        registry.join("lobby", "p1").unwrap();

        registry.detach(&area, "p1");
        assert!(!registry.release("lobby"));
        assert_eq!(registry.area_count(), 1);
        // the disconnected player left the table
        assert!(area.game().unwrap().state.players.is_empty());
    }

    #[test]
    fn releasing_unknown_area_is_a_no_op() {
        let registry = registry();
        assert!(!registry.release("nowhere"));
    }
}
