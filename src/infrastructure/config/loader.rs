use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use regex::RegexSet;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    #[error("Invalid per_attempt_timeout_ms: {0}. Must be positive")]
    InvalidTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error(
        "Invalid backoff configuration: base_delay_ms ({0}) must not exceed max_delay_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid classifier pattern in '{list}': {source}")]
    InvalidPattern {
        list: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("Target base URL is not set. Use --base-url or CONVERGE_TARGET__BASE_URL")]
    MissingBaseUrl,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .converge/config.yaml (project config)
    /// 3. .converge/local.yaml (local overrides, optional)
    /// 4. Environment variables (CONVERGE_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".converge/config.yaml"))
            .merge(Yaml::file(".converge/local.yaml"))
            .merge(Env::prefixed("CONVERGE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Environment variables still take precedence over the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("CONVERGE_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.controller.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(0));
        }

        if config.controller.per_attempt_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(0));
        }

        if config.backoff.base_delay_ms > config.backoff.max_delay_ms {
            return Err(ConfigError::InvalidBackoff(
                config.backoff.base_delay_ms,
                config.backoff.max_delay_ms,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let classifier = &config.classifier;
        for (list, patterns) in [
            ("rate_limited", &classifier.rate_limited),
            ("terminal", &classifier.terminal),
            ("transient", &classifier.transient),
            ("success", &classifier.success),
        ] {
            RegexSet::new(patterns).map_err(|source| ConfigError::InvalidPattern { list, source })?;
        }

        Ok(())
    }

    /// Extra checks for commands that talk to the HTTP target.
    pub fn validate_target(config: &Config) -> Result<(), ConfigError> {
        if config.target.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        Ok(())
    }
}
