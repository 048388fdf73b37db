//! API server configuration, state and lifecycle.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use tainttrail_query::QueryService;
use tainttrail_scanner::{ScannerConfig, SyncStatusHandle};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Listen address.
    pub listen_addr: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl ApiConfig {
    /// Set the listen address.
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }
}

/// Shared state behind the handlers.
pub struct ApiState {
    query: QueryService,
    status: SyncStatusHandle,
    scanner_config: serde_json::Value,
}

impl ApiState {
    /// Create the handler state.
    pub fn new(query: QueryService, status: SyncStatusHandle, scanner: &ScannerConfig) -> Self {
        let scanner_config =
            serde_json::to_value(scanner).unwrap_or(serde_json::Value::Null);
        Self {
            query,
            status,
            scanner_config,
        }
    }

    pub(crate) fn query(&self) -> &QueryService {
        &self.query
    }

    pub(crate) fn status(&self) -> &SyncStatusHandle {
        &self.status
    }

    pub(crate) fn scanner_config(&self) -> &serde_json::Value {
        &self.scanner_config
    }
}

/// The HTTP server.
pub struct ApiServer {
    config: ApiConfig,
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Create a server over the given state.
    pub fn new(config: ApiConfig, state: ApiState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Build the router with its middleware stack.
    pub fn router(&self) -> Router {
        crate::rest::router()
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(Arc::clone(&self.state))
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!("query API listening on {}", self.config.listen_addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tainttrail_store::TaintStore;

    fn make_state() -> ApiState {
        let store = TaintStore::open_temp().unwrap();
        ApiState::new(
            QueryService::new(store),
            SyncStatusHandle::new(),
            &ScannerConfig::default(),
        )
    }

    #[test]
    fn config_default_listen_port() {
        assert_eq!(ApiConfig::default().listen_addr.port(), 8080);
    }

    #[test]
    fn state_echoes_scanner_config() {
        let state = make_state();
        assert_eq!(state.scanner_config()["chunk_size_blocks"], 100);
        assert_eq!(state.scanner_config()["idle_interval_ms"], 600_000);
    }

    #[test]
    fn router_builds() {
        let server = ApiServer::new(ApiConfig::default(), make_state());
        let _router = server.router();
    }
}
