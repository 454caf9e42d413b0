use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::engine::MatchOptions;

/// Runtime configuration shared by the server and CLI binaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database path (`:memory:` for a throwaway store)
    pub db_path: String,

    pub host: String,

    pub port: u16,

    /// Matches returned when a request does not ask for a count
    pub default_max_results: usize,

    /// Matches scoring below this are dropped
    pub min_score: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: "skillswap.db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8090,
            default_max_results: 10,
            min_score: 0,
        }
    }
}

impl EngineConfig {
    /// Read `DB_PATH`, `HOST`, `PORT`, `MAX_RESULTS` and `MIN_SCORE`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, falling back to defaults for missing or bad values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            db_path: lookup("DB_PATH").unwrap_or(defaults.db_path),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", lookup("PORT"), defaults.port),
            default_max_results: parse_or(
                "MAX_RESULTS",
                lookup("MAX_RESULTS"),
                defaults.default_max_results,
            ),
            min_score: parse_or("MIN_SCORE", lookup("MIN_SCORE"), defaults.min_score),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            default_max_results: self.default_max_results,
            min_score: self.min_score,
        }
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("⚠️ Ignoring invalid {}={:?}, using default", key, value);
            default
        }),
    }
}
