//! Runner configuration

use crate::error::RunError;
use crate::locator::Traversal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`RunnerConfig::translator_url`]
pub const TRANSLATOR_URL_ENV: &str = "SDC_CQL_TRANSLATOR_URL";

/// Environment variable overriding [`RunnerConfig::request_timeout_ms`]
pub const REQUEST_TIMEOUT_ENV: &str = "SDC_CQL_REQUEST_TIMEOUT_MS";

/// Configuration for a questionnaire run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Base URL of the CQL-to-ELM translation service
    #[serde(default = "default_translator_url")]
    pub translator_url: String,

    /// Timeout applied to every outbound request (ms)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Which questionnaire items are scanned for expressions
    #[serde(default)]
    pub traversal: Traversal,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            translator_url: default_translator_url(),
            request_timeout_ms: default_request_timeout(),
            traversal: Traversal::default(),
        }
    }
}

impl RunnerConfig {
    /// Defaults overridden by `SDC_CQL_*` environment variables
    pub fn from_env() -> Result<Self, RunError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RunError> {
        let mut config = Self::default();

        if let Some(url) = lookup(TRANSLATOR_URL_ENV) {
            config.translator_url = url;
        }

        if let Some(raw) = lookup(REQUEST_TIMEOUT_ENV) {
            config.request_timeout_ms = raw.trim().parse().map_err(|_| RunError::Config {
                message: format!("{REQUEST_TIMEOUT_ENV} must be a number of milliseconds, got '{raw}'"),
            })?;
        }

        Ok(config)
    }

    pub fn with_translator_url(mut self, url: impl Into<String>) -> Self {
        self.translator_url = url.into();
        self
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_translator_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.translator_url, "http://localhost:8080");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.traversal, Traversal::TopLevel);
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (TRANSLATOR_URL_ENV, "http://translator:9000"),
            (REQUEST_TIMEOUT_ENV, "1500"),
        ]);
        let config = RunnerConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.translator_url, "http://translator:9000");
        assert_eq!(config.request_timeout_ms, 1500);
    }

    #[test]
    fn test_invalid_timeout() {
        let err = RunnerConfig::from_lookup(|k| (k == REQUEST_TIMEOUT_ENV).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, RunError::Config { .. }));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RunnerConfig =
            serde_json::from_value(serde_json::json!({ "traversal": "nested" })).unwrap();
        assert_eq!(config.traversal, Traversal::Nested);
        assert_eq!(config.request_timeout_ms, 30_000);
    }
}
