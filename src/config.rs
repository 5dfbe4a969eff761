//! Service configuration.
//!
//! Every setting has a default and can be overridden with a
//! `PR_REVIEWERS_*` environment variable.

use crate::db::PoolOptions;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "PR_REVIEWERS_";

/// Runtime settings for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub max_connections: u32,
    pub store_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Fixed seed for reviewer selection. Entropy-seeded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            db_path: PathBuf::from("./pr-reviewers.db"),
            max_connections: 5,
            store_timeout_secs: 5,
            request_timeout_secs: 30,
            rng_seed: None,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::invalid_input_field(
            format!("{}{} has an invalid value: {}", ENV_PREFIX, key, raw),
            format!("{}{}", ENV_PREFIX, key),
        )
    })
}

fn positive(key: &str, value: u64) -> Result<u64, AppError> {
    if value == 0 {
        return Err(AppError::invalid_input_field(
            format!("{}{} must be greater than zero", ENV_PREFIX, key),
            format!("{}{}", ENV_PREFIX, key),
        ));
    }
    Ok(value)
}

impl AppConfig {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Load settings through `lookup`, which receives the unprefixed key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup("BIND").filter(|v| !v.trim().is_empty()) {
            config.bind = bind.trim().to_string();
        }
        if let Some(raw) = lookup("PORT") {
            let port: u16 = parse_var("PORT", &raw)?;
            if port < 1024 {
                return Err(AppError::invalid_input_field(
                    format!("{}PORT must be 1024 or higher, got {}", ENV_PREFIX, port),
                    format!("{}PORT", ENV_PREFIX),
                ));
            }
            config.port = port;
        }
        if let Some(path) = lookup("DB_PATH").filter(|v| !v.trim().is_empty()) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("MAX_CONNECTIONS") {
            let n: u32 = parse_var("MAX_CONNECTIONS", &raw)?;
            positive("MAX_CONNECTIONS", u64::from(n))?;
            config.max_connections = n;
        }
        if let Some(raw) = lookup("STORE_TIMEOUT_SECS") {
            config.store_timeout_secs =
                positive("STORE_TIMEOUT_SECS", parse_var("STORE_TIMEOUT_SECS", &raw)?)?;
        }
        if let Some(raw) = lookup("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs =
                positive("REQUEST_TIMEOUT_SECS", parse_var("REQUEST_TIMEOUT_SECS", &raw)?)?;
        }
        if let Some(raw) = lookup("RNG_SEED") {
            config.rng_seed = Some(parse_var("RNG_SEED", &raw)?);
        }

        Ok(config)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            ..PoolOptions::default()
        }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("BIND", "127.0.0.1"),
            ("PORT", "9000"),
            ("DB_PATH", "/tmp/x.db"),
            ("MAX_CONNECTIONS", "8"),
            ("STORE_TIMEOUT_SECS", "2"),
            ("RNG_SEED", "42"),
        ])
        .unwrap();
        assert_eq!(config.socket_addr(), "127.0.0.1:9000");
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.pool_options().max_connections, 8);
        assert_eq!(config.store_timeout_secs, 2);
        assert_eq!(config.rng_seed, Some(42));
    }

    #[test]
    fn test_privileged_port_rejected() {
        let err = load(&[("PORT", "80")]).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_garbage_values_rejected() {
        assert!(load(&[("PORT", "http")]).is_err());
        assert!(load(&[("STORE_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("RNG_SEED", "-1")]).is_err());
    }
}
