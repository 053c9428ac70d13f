//! Application state shared across routes

use std::sync::Arc;

use crate::area::AreaRegistry;
use crate::config::Config;
use crate::game::MatchServices;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub areas: Arc<AreaRegistry>,
}

impl AppState {
    /// `services` are handed to every match any area opens
    pub fn new(config: Config, services: MatchServices) -> Self {
        Self {
            config: Arc::new(config),
            areas: Arc::new(AreaRegistry::new(services)),
        }
    }
}
