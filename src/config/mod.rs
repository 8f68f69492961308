//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origin for CORS ("*" allows any)
    pub client_origin: String,

    /// Simulation rate in ticks per second
    pub tick_hz: u32,
    /// Maximum concurrent players
    pub max_players: usize,
    /// Sessions idle longer than this are expired (milliseconds)
    pub inactivity_timeout_ms: u64,
    /// Minimum accepted interval between move messages (milliseconds)
    pub min_move_interval_ms: u64,
    /// Maximum straight-line distance a single move may cover
    pub max_move_distance: f32,
    /// Maximum sub-segment length for swept collision tests
    pub max_segment_step: f32,
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

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            tick_hz: parse_or("TICK_HZ", 60)?,
            max_players: parse_or("MAX_PLAYERS", 32)?,
            inactivity_timeout_ms: parse_or("INACTIVITY_TIMEOUT_MS", 30_000)?,
            min_move_interval_ms: parse_or("MIN_MOVE_INTERVAL_MS", 10)?,
            max_move_distance: parse_or("MAX_MOVE_DISTANCE", 2.0)?,
            max_segment_step: parse_or("MAX_SEGMENT_STEP", 0.5)?,
        })
    }
}

/// Parse an env var, falling back to a default when unset
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
