//! Service Configuration
//!
//! Resolves the five required upstream-service values (avatars endpoint
//! and key, operator endpoint, orchestrator endpoint and key) from
//! explicit overrides or environment variables, failing fast before any
//! network call is made. Optional knobs (listen port, allowed countries,
//! WEB1 data path) are read best-effort with defaults.

use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const AVATARS_API_ENDPOINT: &str = "AVATARS_API_ENDPOINT";
pub const AVATARS_API_KEY: &str = "AVATARS_API_KEY";
pub const OPERATOR_API_ENDPOINT: &str = "OPERATOR_API_ENDPOINT";
pub const ORCHESTRATOR_API_ENDPOINT: &str = "ORCHESTRATOR_API_ENDPOINT";
pub const ORCHESTRATOR_API_KEY: &str = "ORCHESTRATOR_API_KEY";

/// Default listen port when `PORT` is unset.
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value: {0}")]
    Missing(&'static str),
}

/// Resolved connection settings for the three upstream services.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub avatars_endpoint: String,
    pub avatars_api_key: String,
    pub operator_endpoint: String,
    pub orchestrator_endpoint: String,
    pub orchestrator_api_key: String,
}

/// Explicit overrides for [`ServiceConfig::resolve`]. Any `None` field
/// falls back to its environment variable.
#[derive(Clone, Debug, Default)]
pub struct ServiceConfigOverrides {
    pub avatars_endpoint: Option<String>,
    pub avatars_api_key: Option<String>,
    pub operator_endpoint: Option<String>,
    pub orchestrator_endpoint: Option<String>,
    pub orchestrator_api_key: Option<String>,
}

/// Resolve one value: explicit override first, environment second.
/// An empty string is treated the same as absent.
fn resolve_value(
    override_value: Option<String>,
    env_name: &'static str,
) -> Result<String, ConfigError> {
    if let Some(v) = override_value {
        if !v.is_empty() {
            return Ok(v);
        }
    }
    match env::var(env_name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(env_name)),
    }
}

impl ServiceConfig {
    /// Resolve the full config, failing on the first missing value with
    /// an error naming exactly that value.
    pub fn resolve(overrides: ServiceConfigOverrides) -> Result<Self, ConfigError> {
        Ok(Self {
            avatars_endpoint: resolve_value(overrides.avatars_endpoint, AVATARS_API_ENDPOINT)?,
            avatars_api_key: resolve_value(overrides.avatars_api_key, AVATARS_API_KEY)?,
            operator_endpoint: resolve_value(overrides.operator_endpoint, OPERATOR_API_ENDPOINT)?,
            orchestrator_endpoint: resolve_value(
                overrides.orchestrator_endpoint,
                ORCHESTRATOR_API_ENDPOINT,
            )?,
            orchestrator_api_key: resolve_value(
                overrides.orchestrator_api_key,
                ORCHESTRATOR_API_KEY,
            )?,
        })
    }

    /// Resolve entirely from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(ServiceConfigOverrides::default())
    }
}

/// Listen port for this service's own HTTP surface.
pub fn listen_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Countries eligible for WEB1 account assignment, from the
/// comma-separated `ALLOWED_COUNTRIES` variable. Empty entries are
/// dropped; an unset variable yields an empty list (nothing eligible).
pub fn allowed_countries() -> Vec<String> {
    parse_country_list(env::var("ALLOWED_COUNTRIES").unwrap_or_default().as_str())
}

pub fn parse_country_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Path of the WEB1 account CSV, if configured.
pub fn web1_data_path() -> Option<String> {
    match env::var("WEB1_DATA_PATH") {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}

/// Development-mode flag (`LOCAL=1`).
pub fn is_local() -> bool {
    matches!(env::var("LOCAL"), Ok(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_overrides() -> ServiceConfigOverrides {
        ServiceConfigOverrides {
            avatars_endpoint: Some("https://avatars.test".to_string()),
            avatars_api_key: Some("key-a".to_string()),
            operator_endpoint: Some("https://operator.test".to_string()),
            orchestrator_endpoint: Some("https://orchestrator.test".to_string()),
            orchestrator_api_key: Some("key-o".to_string()),
        }
    }

    #[test]
    fn test_resolve_with_all_overrides() {
        // No environment involvement: every value is supplied directly.
        let config = ServiceConfig::resolve(full_overrides()).unwrap();
        assert_eq!(config.avatars_endpoint, "https://avatars.test");
        assert_eq!(config.orchestrator_api_key, "key-o");
    }

    #[test]
    fn test_resolve_names_the_missing_value() {
        let mut overrides = full_overrides();
        overrides.avatars_api_key = None;
        // The env fallback is also empty in the test environment.
        std::env::remove_var(AVATARS_API_KEY);

        let err = ServiceConfig::resolve(overrides).unwrap_err();
        assert!(err.to_string().contains(AVATARS_API_KEY));
    }

    #[test]
    fn test_empty_override_is_treated_as_absent() {
        let mut overrides = full_overrides();
        overrides.operator_endpoint = Some(String::new());
        std::env::remove_var(OPERATOR_API_ENDPOINT);

        let err = ServiceConfig::resolve(overrides).unwrap_err();
        assert!(err.to_string().contains(OPERATOR_API_ENDPOINT));
    }

    #[test]
    fn test_parse_country_list() {
        assert_eq!(parse_country_list("US, FR ,DE"), vec!["US", "FR", "DE"]);
        assert!(parse_country_list("").is_empty());
        assert_eq!(parse_country_list(",FR,"), vec!["FR"]);
    }
}
