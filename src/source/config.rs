use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the Prometheus metrics source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub address: String,
    pub port: String,
    /// Use https instead of http
    pub ssl: bool,
    /// Resolution of range queries in seconds
    pub step_secs: u64,
    /// Timeout of a single query in seconds
    pub query_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: "9090".to_string(),
            ssl: false,
            step_secs: 60,
            query_timeout_secs: 5,
        }
    }
}

impl SourceConfig {
    /// Read the source configuration from environment variables
    /// PLATON_PROM_ADDRESS=localhost
    /// PLATON_PROM_PORT=9090
    /// PLATON_PROM_SSL=false
    /// PLATON_QUERY_STEP_SECS=60
    /// PLATON_QUERY_TIMEOUT_SECS=5
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let address = std::env::var("PLATON_PROM_ADDRESS").unwrap_or(defaults.address);
        let port = std::env::var("PLATON_PROM_PORT").unwrap_or(defaults.port);
        let ssl = std::env::var("PLATON_PROM_SSL")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.ssl);
        let step_secs = std::env::var("PLATON_QUERY_STEP_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.step_secs);
        let query_timeout_secs = std::env::var("PLATON_QUERY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.query_timeout_secs);

        Self {
            address,
            port,
            ssl,
            step_secs,
            query_timeout_secs,
        }
    }

    pub fn url(&self) -> String {
        construct_url(&self.address, &self.port, self.ssl)
    }

    pub fn step(&self) -> Duration {
        Duration::from_secs(self.step_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Build the base URL of a Prometheus server
pub fn construct_url(address: &str, port: &str, ssl: bool) -> String {
    let scheme = if ssl { "https" } else { "http" };
    format!("{}://{}:{}", scheme, address, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_url() {
        assert_eq!(construct_url("localhost", "9090", false), "http://localhost:9090");
        assert_eq!(construct_url("prom.internal", "443", true), "https://prom.internal:443");
    }

    #[test]
    fn test_defaults() {
        let config = SourceConfig::default();
        assert_eq!(config.url(), "http://localhost:9090");
        assert_eq!(config.step(), Duration::from_secs(60));
        assert_eq!(config.query_timeout(), Duration::from_secs(5));
    }
}
