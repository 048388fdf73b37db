//! Environment-driven configuration assembly.
//!
//! Every recognized option maps a dotted name to an environment variable by
//! upper-casing and replacing dots with underscores: `node.host` is
//! `NODE_HOST`, `scanner.batch_flush_ms` is `SCANNER_BATCH_FLUSH_MS`, and so
//! on. Unset variables fall back to their documented defaults.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use tainttrail_api::ApiConfig;
use tainttrail_query::QueryConfig;
use tainttrail_rpc::NodeConfig;
use tainttrail_scanner::ScannerConfig;

/// Configuration error; the daemon exits with code 1 on these.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held an unparseable value.
    #[error("invalid value for {var}: {message}")]
    Invalid {
        /// The environment variable.
        var: String,
        /// Parse diagnostic.
        message: String,
    },
}

fn env_parse<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: var.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn env_string(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

/// The daemon's assembled configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Node client configuration.
    pub node: NodeConfig,
    /// Base directory of the taint store.
    pub store_base: PathBuf,
    /// Scanner configuration.
    pub scanner: ScannerConfig,
    /// Query service configuration.
    pub query: QueryConfig,
    /// API server configuration.
    pub api: ApiConfig,
}

impl DaemonConfig {
    /// Read the full configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let node = NodeConfig::new(
            env_string("NODE_HOST", "127.0.0.1"),
            env_parse("NODE_PORT", 8332u16)?,
        )
        .with_auth(env_string("NODE_USER", ""), env_string("NODE_PASS", ""))
        .with_timeout(Duration::from_millis(env_parse("NODE_TIMEOUT_MS", 300_000u64)?))
        .with_max_parallel(env_parse("NODE_MAX_PARALLEL", 16usize)?)
        .with_retries(
            env_parse("NODE_MAX_RETRIES", 5u32)?,
            Duration::from_millis(env_parse("NODE_RETRY_BASE_MS", 500u64)?),
            Duration::from_millis(env_parse("NODE_RETRY_CAP_MS", 120_000u64)?),
        );

        let store_base = PathBuf::from(env_string("STORE_BASE_PATH", "./taint-db"));

        let mut scanner = ScannerConfig::default()
            .with_idle_interval(Duration::from_millis(env_parse(
                "SCANNER_IDLE_INTERVAL_MS",
                600_000u64,
            )?))
            .with_chunk_size(env_parse("SCANNER_CHUNK_SIZE_BLOCKS", 100u64)?)
            .with_batching(
                env_parse("SCANNER_BATCH_SIZE", 1000usize)?,
                Duration::from_millis(env_parse("SCANNER_BATCH_FLUSH_MS", 5_000u64)?),
            )
            .with_parent_cache_max(env_parse("SCANNER_PARENT_CACHE_MAX", 10_000usize)?)
            .with_tip_lag(env_parse("SCANNER_TIP_LAG_BLOCKS", 0u64)?);
        scanner.enabled = env_parse("SCANNER_ENABLED", true)?;

        let query = QueryConfig::default()
            .with_timeout(Duration::from_millis(env_parse("QUERY_TIMEOUT_MS", 15_000u64)?));

        let api = ApiConfig::default().with_listen_addr(env_parse(
            "API_LISTEN_ADDR",
            SocketAddr::from(([0, 0, 0, 0], 8080)),
        )?);

        Ok(Self {
            node,
            store_base,
            scanner,
            query,
            api,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test owns every variable it touches; the fixed names make
    // concurrent env-mutating tests racy, so keep them together.
    #[test]
    fn env_roundtrip_and_defaults() {
        let config = DaemonConfig::from_env().unwrap();
        assert_eq!(config.node.host, "127.0.0.1");
        assert_eq!(config.node.port, 8332);
        assert_eq!(config.node.max_parallel, 16);
        assert_eq!(config.scanner.chunk_size_blocks, 100);
        assert!(config.scanner.enabled);
        assert_eq!(config.query.timeout, Duration::from_secs(15));
        assert_eq!(config.api.listen_addr.port(), 8080);

        std::env::set_var("NODE_HOST", "node.internal");
        std::env::set_var("NODE_PORT", "18443");
        std::env::set_var("SCANNER_ENABLED", "false");
        std::env::set_var("SCANNER_TIP_LAG_BLOCKS", "6");
        std::env::set_var("QUERY_TIMEOUT_MS", "2000");

        let config = DaemonConfig::from_env().unwrap();
        assert_eq!(config.node.host, "node.internal");
        assert_eq!(config.node.port, 18443);
        assert!(!config.scanner.enabled);
        assert_eq!(config.scanner.tip_lag_blocks, 6);
        assert_eq!(config.query.timeout, Duration::from_secs(2));

        std::env::set_var("NODE_PORT", "not-a-port");
        assert!(matches!(
            DaemonConfig::from_env(),
            Err(ConfigError::Invalid { .. })
        ));

        for var in [
            "NODE_HOST",
            "NODE_PORT",
            "SCANNER_ENABLED",
            "SCANNER_TIP_LAG_BLOCKS",
            "QUERY_TIMEOUT_MS",
        ] {
            std::env::remove_var(var);
        }
    }
}
