//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::physics::{WorldBounds, PLAYER_SIZE};
use crate::util::time::{DEFAULT_TICK_RATE, MAX_TICK_RATE};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,

    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Playable area
    pub world: WorldBounds,
    /// Seed for spawn positions; random when unset
    pub rng_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Some(port) = lookup("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:10000".to_string())
        };

        let tick_rate = parse_or(&lookup, "TICK_RATE", DEFAULT_TICK_RATE)?;
        if !(1..=MAX_TICK_RATE).contains(&tick_rate) {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }

        let width = parse_or(&lookup, "WORLD_WIDTH", 800.0_f64)?;
        let height = parse_or(&lookup, "WORLD_HEIGHT", 600.0_f64)?;
        if !(width.is_finite() && height.is_finite()) || width <= PLAYER_SIZE || height <= PLAYER_SIZE
        {
            return Err(ConfigError::WorldTooSmall { width, height });
        }

        let log_json = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => false,
            Some("json") => true,
            Some(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
        };

        let rng_seed = match lookup("RNG_SEED") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid("RNG_SEED"))?),
            None => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json,
            tick_rate,
            world: WorldBounds::new(width, height),
            rng_seed,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("World {width}x{height} cannot fit a player")]
    WorldTooSmall { width: f64, height: f64 },
}
