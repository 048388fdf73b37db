//! Node client configuration.

use std::time::Duration;

use bitcoin::Network;

use crate::error::NodeError;

/// Configuration for the node client.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Node host.
    pub host: String,
    /// RPC port.
    pub port: u16,
    /// RPC username.
    pub user: String,
    /// RPC password.
    pub pass: String,
    /// Per-call transport timeout.
    pub timeout: Duration,
    /// Maximum in-flight RPC calls.
    pub max_parallel: usize,
    /// Retry attempts per call.
    pub max_retries: u32,
    /// Base backoff between retries.
    pub retry_base: Duration,
    /// Backoff cap.
    pub retry_cap: Duration,
    /// Expected network.
    pub network: Network,
}

impl NodeConfig {
    /// Create a configuration for the given endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: String::new(),
            pass: String::new(),
            timeout: Duration::from_secs(300),
            max_parallel: 16,
            max_retries: 5,
            retry_base: Duration::from_millis(500),
            retry_cap: Duration::from_secs(120),
            network: Network::Bitcoin,
        }
    }

    /// Set RPC basic-auth credentials.
    pub fn with_auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = user.into();
        self.pass = pass.into();
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the in-flight call limit.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Set the retry policy.
    pub fn with_retries(mut self, max_retries: u32, base: Duration, cap: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base = base;
        self.retry_cap = cap;
        self
    }

    /// Set the expected network.
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// RPC endpoint URL.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.host.is_empty() {
            return Err(NodeError::Config("node host is required".into()));
        }
        if self.max_parallel == 0 {
            return Err(NodeError::Config("max_parallel must be at least 1".into()));
        }
        if self.max_retries == 0 {
            return Err(NodeError::Config("max_retries must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 8332)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_url() {
        let config = NodeConfig::new("10.0.0.2", 8332)
            .with_auth("u", "p")
            .with_max_parallel(4)
            .with_retries(3, Duration::from_millis(100), Duration::from_secs(10));

        assert_eq!(config.url(), "http://10.0.0.2:8332");
        assert_eq!(config.max_parallel, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(NodeConfig::new("", 8332).validate().is_err());
        assert!(NodeConfig::default()
            .with_max_parallel(0)
            .validate()
            .is_err());
    }
}
