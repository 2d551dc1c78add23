use std::env;
use thiserror::Error;

use crate::bump::{BumpRules, ScopeMode};

/// DISBOARD's user id.
pub const DEFAULT_TRACKED_BOT_ID: u64 = 302050872383242240;
pub const DEFAULT_SUCCESS_MARKER: &str = "Bumped";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:bumps.db?mode=rwc";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Bot configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub port: u16,
    pub rules: BumpRules,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source, so tests don't have to touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let tracked_bot_id = match lookup("TRACKED_BOT_ID") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "TRACKED_BOT_ID", value })?,
            None => DEFAULT_TRACKED_BOT_ID,
        };

        let success_marker = lookup("BUMP_SUCCESS_MARKER")
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_SUCCESS_MARKER.to_string());

        let image_counts_as_bump = match lookup("COUNT_IMAGE_AS_BUMP") {
            Some(value) => parse_bool(&value)
                .ok_or(ConfigError::Invalid { name: "COUNT_IMAGE_AS_BUMP", value })?,
            None => true,
        };

        let scope = match lookup("BUMP_SCOPE") {
            Some(value) => match value.trim().to_lowercase().as_str() {
                "guild" | "server" => ScopeMode::PerGuild,
                "global" => ScopeMode::Global,
                _ => return Err(ConfigError::Invalid { name: "BUMP_SCOPE", value }),
            },
            None => ScopeMode::PerGuild,
        };

        Ok(Config {
            discord_token,
            database_url,
            port,
            rules: BumpRules {
                tracked_bot_id,
                success_marker,
                image_counts_as_bump,
                scope,
            },
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = config_from(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.port, 8080);
        assert_eq!(config.rules.tracked_bot_id, DEFAULT_TRACKED_BOT_ID);
        assert_eq!(config.rules.success_marker, "Bumped");
        assert!(config.rules.image_counts_as_bump);
        assert_eq!(config.rules.scope, ScopeMode::PerGuild);
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DISCORD_TOKEN")));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("PORT", "3000"),
            ("TRACKED_BOT_ID", "42"),
            ("BUMP_SUCCESS_MARKER", "Bump done"),
            ("COUNT_IMAGE_AS_BUMP", "false"),
            ("BUMP_SCOPE", "global"),
        ])
        .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rules.tracked_bot_id, 42);
        assert_eq!(config.rules.success_marker, "Bump done");
        assert!(!config.rules.image_counts_as_bump);
        assert_eq!(config.rules.scope, ScopeMode::Global);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = config_from(&[("DISCORD_TOKEN", "abc"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = config_from(&[("DISCORD_TOKEN", "abc"), ("BUMP_SCOPE", "planet")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BUMP_SCOPE", .. }));
    }
}
