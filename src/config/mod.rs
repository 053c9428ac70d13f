//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::util::rate_limit::MOVE_RATE_LIMIT;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS
    pub client_origins: Vec<String>,

    /// Whitespace-separated word list; embedded list when unset
    pub dictionary_path: Option<PathBuf>,
    /// Optional list of common words prompts are cut from
    pub prompt_words_path: Option<PathBuf>,

    /// Commands per second accepted from one WebSocket connection
    pub move_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let move_rate_limit = match env::var("MOVE_RATE_LIMIT") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("MOVE_RATE_LIMIT"))?,
            Err(_) => MOVE_RATE_LIMIT,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origins: parse_origins(
                &env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ),

            dictionary_path: env::var("DICTIONARY_PATH").ok().map(PathBuf::from),
            prompt_words_path: env::var("PROMPT_WORDS_PATH").ok().map(PathBuf::from),

            move_rate_limit,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            client_origins: vec!["http://localhost:3000".to_string()],
            dictionary_path: None,
            prompt_words_path: None,
            move_rate_limit: MOVE_RATE_LIMIT,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
