//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::rules::{MatchRules, RulesError};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated, `*` for any)
    pub client_origin: String,

    /// Base URL of the REST event sink; events are only logged when unset
    pub event_sink_url: Option<String>,
    /// Service key for the event sink
    pub event_sink_key: Option<String>,

    /// Rules every match is played with
    pub rules: MatchRules,
    /// Matches without any input for this long are evicted
    pub idle_timeout: Duration,
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

        let defaults = MatchRules::default();
        let baseline_health = parse_or("MATCH_BASE_HEALTH", defaults.baseline.health)?;
        let baseline_energy = parse_or("MATCH_BASE_ENERGY", defaults.baseline.energy)?;

        let mut rules = MatchRules {
            win_threshold: parse_or("MATCH_WIN_THRESHOLD", defaults.win_threshold)?,
            max_turns: parse_or("MATCH_MAX_TURNS", defaults.max_turns)?,
            ..defaults
        };
        rules.baseline.health = baseline_health;
        rules.baseline.energy = baseline_energy;
        rules.validate()?;

        let event_sink_key = env::var("EVENT_SINK_KEY").ok();
        let event_sink_url = env::var("EVENT_SINK_URL").ok();
        if event_sink_url.is_some() && event_sink_key.is_none() {
            return Err(ConfigError::Missing("EVENT_SINK_KEY"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            event_sink_url,
            event_sink_key,

            rules,
            idle_timeout: Duration::from_secs(parse_or("MATCH_IDLE_TIMEOUT_SECS", 120u64)?),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            client_origin: "*".to_string(),
            event_sink_url: None,
            event_sink_key: None,
            rules: MatchRules::default(),
            idle_timeout: Duration::from_secs(120),
        }
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid match rules: {0}")]
    Rules(#[from] RulesError),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test touches its own variable so parallel tests do not race.

    #[test]
    fn test_default_config_has_valid_rules() {
        let config = Config::default();
        assert_eq!(config.rules.validate(), Ok(()));
        assert_eq!(config.client_origin, "*");
        assert!(config.event_sink_url.is_none());
    }

    #[test]
    fn test_parse_or_falls_back_when_unset() {
        env::remove_var("DUEL_TEST_UNSET_VALUE");
        assert_eq!(parse_or("DUEL_TEST_UNSET_VALUE", 7u32).unwrap(), 7);
    }

    #[test]
    fn test_parse_or_reads_and_rejects() {
        env::set_var("DUEL_TEST_TURNS", " 12 ");
        assert_eq!(parse_or("DUEL_TEST_TURNS", 10u32).unwrap(), 12);

        env::set_var("DUEL_TEST_TURNS", "twelve");
        assert!(matches!(
            parse_or("DUEL_TEST_TURNS", 10u32),
            Err(ConfigError::Invalid("DUEL_TEST_TURNS"))
        ));
        env::remove_var("DUEL_TEST_TURNS");
    }

    #[test]
    fn test_rules_error_converts() {
        let err: ConfigError = RulesError::ZeroMaxTurns.into();
        assert!(err.to_string().starts_with("Invalid match rules"));
    }
}
