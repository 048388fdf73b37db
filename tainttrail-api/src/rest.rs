//! REST handlers and response DTOs.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use tainttrail_core::{PathHop, TxRecord};
use tainttrail_query::{CheckResult, QueryError, TxSummary};
use tainttrail_scanner::{ScanState, SyncStatus};

use crate::server::ApiState;

/// REST API error response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 500.
    #[error("internal error: {0}")]
    Internal(String),

    /// 503; the store or node did not answer in time.
    #[error("service unavailable")]
    Unavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidAddress => ApiError::BadRequest(e.to_string()),
            QueryError::Timeout(_) => ApiError::Unavailable,
            QueryError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

/// One hop of the connection path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HopDto {
    /// Sending address.
    pub from: String,
    /// Receiving address.
    pub to: String,
    /// Transaction realizing the hop.
    pub tx_hash: String,
    /// Output value in satoshis.
    pub amount: u64,
}

impl From<&PathHop> for HopDto {
    fn from(hop: &PathHop) -> Self {
        Self {
            from: hop.from.clone(),
            to: hop.to.clone(),
            tx_hash: hop.tx_hash.clone(),
            amount: hop.amount_sat,
        }
    }
}

/// One path transaction, enriched when the cache had it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxDto {
    /// Transaction id.
    pub hash: String,
    /// Hop output value in satoshis.
    pub amount: u64,
    /// Full cached record, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<TxRecord>,
}

impl From<&TxSummary> for TxDto {
    fn from(summary: &TxSummary) -> Self {
        Self {
            hash: summary.hash.clone(),
            amount: summary.amount_sat,
            detail: summary.detail.clone(),
        }
    }
}

/// Response of `GET /check/{address}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    /// Whether the address is reachable from the seed set.
    pub is_connected: bool,
    /// Whether the address is itself a seed.
    pub is_satoshi_address: bool,
    /// Minimum hop distance; 0 for seeds and unconnected addresses.
    pub degree: u32,
    /// Explanation for seed addresses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Witness path from the seed.
    pub connection_path: Vec<HopDto>,
    /// Best-effort detail for each path transaction.
    pub transactions: Vec<TxDto>,
}

impl From<CheckResult> for CheckResponse {
    fn from(result: CheckResult) -> Self {
        match result {
            CheckResult::Seed { note, .. } => Self {
                is_connected: true,
                is_satoshi_address: true,
                degree: 0,
                note: Some(note),
                connection_path: Vec::new(),
                transactions: Vec::new(),
            },
            CheckResult::Tainted {
                degree,
                path,
                transactions,
                ..
            } => Self {
                is_connected: true,
                is_satoshi_address: false,
                degree,
                note: None,
                connection_path: path.iter().map(HopDto::from).collect(),
                transactions: transactions.iter().map(TxDto::from).collect(),
            },
            CheckResult::Unconnected { .. } => Self {
                is_connected: false,
                is_satoshi_address: false,
                degree: 0,
                note: None,
                connection_path: Vec::new(),
                transactions: Vec::new(),
            },
        }
    }
}

/// Scanner counters exposed on the status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDto {
    /// State machine position.
    pub state: ScanState,
    /// Blocks fully processed this run.
    pub blocks_processed: u64,
    /// Transactions examined.
    pub txs_processed: u64,
    /// Transactions that spread taint.
    pub tainting_txs: u64,
    /// Outpoint records written.
    pub outpoints_written: u64,
    /// Address records upserted.
    pub addresses_updated: u64,
    /// Recoverable errors since start.
    pub errors: u64,
    /// Most recent error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Scanner process start time.
    pub started_at: DateTime<Utc>,
}

/// Response of `GET /sync-status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    /// Whether the scanner loop is alive.
    pub is_running: bool,
    /// Whether a backlog remains.
    pub is_syncing: bool,
    /// Last fully persisted block.
    pub last_processed_block: Option<u64>,
    /// The node's tip height as last observed.
    pub current_height: u64,
    /// Blocks between checkpoint and tip.
    pub blocks_behind: u64,
    /// Fraction of the chain covered, 0..=1.
    pub progress: f64,
    /// Cumulative counters.
    pub stats: StatsDto,
    /// Effective scanner configuration.
    pub config: serde_json::Value,
}

impl SyncStatusResponse {
    pub(crate) fn from_status(status: SyncStatus, config: serde_json::Value) -> Self {
        Self {
            is_running: status.is_running,
            is_syncing: status.is_syncing,
            last_processed_block: status.last_processed_block,
            current_height: status.current_height,
            blocks_behind: status.blocks_behind,
            progress: status.progress,
            stats: StatsDto {
                state: status.state,
                blocks_processed: status.stats.blocks_processed,
                txs_processed: status.stats.txs_processed,
                tainting_txs: status.stats.tainting_txs,
                outpoints_written: status.stats.outpoints_written,
                addresses_updated: status.stats.addresses_updated,
                errors: status.stats.errors,
                last_error: status.stats.last_error,
                started_at: status.started_at,
            },
            config,
        }
    }
}

/// Build the API router.
pub(crate) fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/check/{address}", get(check))
        .route("/sync-status", get(sync_status))
}

/// GET /check/{address}
async fn check(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Result<Json<CheckResponse>, ApiError> {
    debug!(%address, "check request");
    let result = state.query().check(&address).await?;
    Ok(Json(CheckResponse::from(result)))
}

/// GET /sync-status
async fn sync_status(State(state): State<Arc<ApiState>>) -> Json<SyncStatusResponse> {
    let status = state.status().snapshot();
    Json(SyncStatusResponse::from_status(
        status,
        state.scanner_config().clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_response_shape() {
        let response = CheckResponse::from(CheckResult::Seed {
            address: "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa".to_string(),
            note: "curated".to_string(),
        });
        assert!(response.is_connected);
        assert!(response.is_satoshi_address);
        assert_eq!(response.degree, 0);
        assert!(response.connection_path.is_empty());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["isSatoshiAddress"], true);
        assert_eq!(json["degree"], 0);
        assert_eq!(json["connectionPath"], serde_json::json!([]));
    }

    #[test]
    fn unconnected_response_shape() {
        let response = CheckResponse::from(CheckResult::Unconnected {
            address: "1Fresh".to_string(),
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["isConnected"], false);
        assert_eq!(json["degree"], 0);
        assert!(json.get("note").is_none());
    }

    #[test]
    fn tainted_response_uses_camel_case_hops() {
        let response = CheckResponse::from(CheckResult::Tainted {
            address: "1B".to_string(),
            degree: 2,
            path: vec![PathHop {
                from: "1Seed".to_string(),
                to: "1B".to_string(),
                tx_hash: "abcd".to_string(),
                amount_sat: 42,
            }],
            transactions: vec![TxSummary {
                hash: "abcd".to_string(),
                amount_sat: 42,
                detail: None,
            }],
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["connectionPath"][0]["txHash"], "abcd");
        assert_eq!(json["connectionPath"][0]["amount"], 42);
        assert_eq!(json["transactions"][0]["hash"], "abcd");
    }

    #[test]
    fn query_errors_map_to_http_classes() {
        assert!(matches!(
            ApiError::from(QueryError::InvalidAddress),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(QueryError::Timeout(std::time::Duration::from_secs(15))),
            ApiError::Unavailable
        ));
    }
}
