//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Tool configuration merged from defaults, `ebsctl.toml`, and environment
/// variables (prefix `EBSCTL_`).
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "EBSCTL")]
pub struct EbsConfig {
    /// Base URL of the instance metadata service. Overridable so tests and
    /// metadata proxies can stand in for the link-local address.
    #[ortho_config(default = "http://169.254.169.254".to_owned())]
    pub metadata_endpoint: String,
    /// Pause between reconciliation polls, in milliseconds.
    #[ortho_config(default = 1_000_u64)]
    pub poll_interval_ms: u64,
    /// Upper bound for any single reconciliation wait, in seconds. Unset
    /// means each wait is unbounded and a stalled provider operation stalls
    /// the caller.
    pub wait_timeout_secs: Option<u64>,
    /// Region override. By default the region is discovered from instance
    /// metadata.
    pub region: Option<String>,
}

impl EbsConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("ebsctl")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on the merged configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a field has a value no run
    /// could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metadata_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "metadata_endpoint must not be empty; set EBSCTL_METADATA_ENDPOINT \
                 or metadata_endpoint in ebsctl.toml",
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "poll_interval_ms must be at least 1; set EBSCTL_POLL_INTERVAL_MS \
                 or poll_interval_ms in ebsctl.toml",
            )));
        }
        Ok(())
    }

    /// Returns the poll pause as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the configured wait bound, when any.
    #[must_use]
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_secs.map(Duration::from_secs)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Indicates a configuration value that cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::EbsConfig;

    fn config() -> EbsConfig {
        EbsConfig {
            metadata_endpoint: String::from("http://169.254.169.254"),
            poll_interval_ms: 1_000,
            wait_timeout_secs: None,
            region: None,
        }
    }

    #[test]
    fn poll_interval_converts_milliseconds() {
        assert_eq!(config().poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn validation_rejects_a_zero_poll_interval_with_an_actionable_error() {
        let broken = EbsConfig {
            poll_interval_ms: 0,
            ..config()
        };

        let err = broken.validate().expect_err("zero interval must fail");

        let message = err.to_string();
        assert!(
            message.contains("EBSCTL_POLL_INTERVAL_MS"),
            "error should mention the env var: {message}"
        );
        assert!(
            message.contains("ebsctl.toml"),
            "error should mention the config file: {message}"
        );
    }

    #[test]
    fn validation_accepts_the_defaults() {
        config()
            .validate()
            .unwrap_or_else(|err| panic!("defaults should validate: {err}"));
    }

    #[test]
    fn wait_timeout_defaults_to_unbounded() {
        assert_eq!(config().wait_timeout(), None);
        let bounded = EbsConfig {
            wait_timeout_secs: Some(300),
            ..config()
        };
        assert_eq!(bounded.wait_timeout(), Some(Duration::from_secs(300)));
    }
}
