//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::CONFIG_FILE_NAME;
use crate::backoff::MAX_ATTEMPTS_LIMIT;
use crate::error::{CliError, Result};
use crate::record;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the config file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(CliError::UserError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load the explicit config file if given, else `regionlock.yaml` in
    /// `dir` if it exists, else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading config");
            Self::load(candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| CliError::UserError(format!("failed to parse config YAML: {}", e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| CliError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `lock_file` must be non-empty
    /// - `identity`, if set, must fit in a holder record
    /// - `poll_interval_ms` must be positive
    /// - `backoff.max_attempts` must be between 1 and `MAX_ATTEMPTS_LIMIT`
    ///   and `backoff.initial_ms` must not exceed `backoff.max_delay_ms`
    pub fn validate(&self) -> Result<()> {
        if self.lock_file.trim().is_empty() {
            return Err(CliError::UserError(
                "config validation failed: lock_file must not be empty".to_string(),
            ));
        }

        if let Some(identity) = &self.identity {
            record::validate_identity(identity).map_err(|e| {
                CliError::UserError(format!("config validation failed: {}", e))
            })?;
        }

        if self.poll_interval_ms == 0 {
            return Err(CliError::UserError(
                "config validation failed: poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.backoff.max_attempts == 0 {
            return Err(CliError::UserError(
                "config validation failed: backoff.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.backoff.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(CliError::UserError(format!(
                "config validation failed: backoff.max_attempts ({}) must not exceed {}",
                self.backoff.max_attempts, MAX_ATTEMPTS_LIMIT
            )));
        }

        if self.backoff.initial_ms > self.backoff.max_delay_ms {
            return Err(CliError::UserError(format!(
                "config validation failed: backoff.initial_ms ({}) must not exceed backoff.max_delay_ms ({})",
                self.backoff.initial_ms, self.backoff.max_delay_ms
            )));
        }

        Ok(())
    }

    /// Poll interval of the hold loop.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
