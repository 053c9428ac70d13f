//! Bomb Party Server - Authoritative turn-based word game server
//!
//! Players take turns typing a dictionary word containing the prompt before
//! the bomb goes off. The match core lives in [`game`]; [`area`] hosts one
//! live match per game area and keeps its history; [`http`] and [`ws`]
//! expose areas to clients.

pub mod app;
pub mod area;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod wordlists;
pub mod ws;
