//! Game areas: the boundary between transports and match engines

pub mod command;
pub mod game_area;
pub mod history;
pub mod registry;

pub use command::{AreaCommand, CommandResponse};
pub use game_area::BombPartyArea;
pub use history::{AreaEvent, AreaSink, GameResult};
pub use registry::AreaRegistry;
