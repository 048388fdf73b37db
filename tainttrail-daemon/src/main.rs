//! `tainttraild` - the Satoshi taint database daemon.
//!
//! Startup sequence: open the store, verify the node is usable, run the
//! one-shot seed builder, then hand the process over to a supervisor that
//! owns the scanner task and the HTTP query surface. The scanner stops at a
//! block boundary on shutdown; the HTTP server drains gracefully.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tainttrail_api::{ApiServer, ApiState};
use tainttrail_query::QueryService;
use tainttrail_rpc::{NodeClient, NodeError};
use tainttrail_scanner::{Scanner, SyncStatusHandle};
use tainttrail_seed::{SeedBuilder, SeedError, SeedList, SeedSet};
use tainttrail_store::TaintStore;

mod config;

use config::DaemonConfig;

const EXIT_OK: i32 = 0;
const EXIT_CONFIG: i32 = 1;
const EXIT_NODE_UNREACHABLE: i32 = 2;
const EXIT_NODE_SYNCING: i32 = 3;
const EXIT_STORE: i32 = 4;

#[derive(Parser, Debug)]
#[command(name = "tainttraild", version, about = "Satoshi taint database daemon")]
struct Args {
    /// Override the store base directory (STORE_BASE_PATH).
    #[arg(long)]
    store_path: Option<PathBuf>,

    /// Override the API listen address (API_LISTEN_ADDR).
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Run query-only: do not start the background scanner.
    #[arg(long)]
    no_scanner: bool,
}

fn node_exit_code(e: &NodeError) -> i32 {
    match e {
        NodeError::Syncing => EXIT_NODE_SYNCING,
        NodeError::Config(_) => EXIT_CONFIG,
        _ => EXIT_NODE_UNREACHABLE,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    std::process::exit(run(args).await);
}

async fn run(args: Args) -> i32 {
    let mut config = match DaemonConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(%e, "configuration error");
            return EXIT_CONFIG;
        }
    };
    if let Some(path) = args.store_path {
        config.store_base = path;
    }
    if let Some(addr) = args.listen {
        config.api.listen_addr = addr;
    }
    if args.no_scanner {
        config.scanner.enabled = false;
    }

    let store = match TaintStore::open(&config.store_base) {
        Ok(store) => store,
        Err(e) => {
            error!(%e, path = %config.store_base.display(), "cannot open taint store");
            return EXIT_STORE;
        }
    };

    let node = match NodeClient::new(config.node.clone()) {
        Ok(node) => node,
        Err(e) => {
            error!(%e, "cannot construct node client");
            return node_exit_code(&e);
        }
    };
    let chain = match node.ensure_ready().await {
        Ok(info) => info,
        Err(e) => {
            error!(%e, "node is not usable");
            return node_exit_code(&e);
        }
    };
    if let Ok(net) = node.network_info().await {
        info!(agent = %net.subversion, connections = net.connections, "connected to node");
    }
    if let Ok(mempool) = node.mempool_info().await {
        info!(mempool_txs = mempool.size, "node mempool");
    }

    let seed_builder = SeedBuilder::new(
        Arc::new(node.clone()),
        store.clone(),
        SeedList::builtin().clone(),
    )
    .with_network(config.node.network);
    if let Err(e) = seed_builder.run().await {
        error!(%e, "seed materialization failed");
        return match &e {
            SeedError::Node(node_err) => node_exit_code(node_err),
            SeedError::Store(_) => EXIT_STORE,
            _ => EXIT_NODE_UNREACHABLE,
        };
    }
    let seeds = match SeedSet::load(&store) {
        Ok(seeds) => Arc::new(seeds),
        Err(e) => {
            error!(%e, "cannot load seed set");
            return EXIT_STORE;
        }
    };
    info!(seed_addresses = seeds.len(), tip = chain.height, "startup complete");

    // Supervisor: the scanner task outlives any request handling and stops
    // through the watch channel at a block boundary.
    let (stop_tx, stop_rx) = watch::channel(false);
    let (status, scanner_task) = if config.scanner.enabled {
        let scanner = Scanner::new(
            Arc::new(node.clone()),
            store.clone(),
            Arc::clone(&seeds),
            config.scanner.clone(),
        )
        .with_network(config.node.network);
        let status = scanner.status();
        let task = tokio::spawn(scanner.run(stop_rx));
        (status, Some(task))
    } else {
        info!("scanner disabled; serving queries only");
        (SyncStatusHandle::new(), None)
    };

    let query = QueryService::new(store)
        .with_node(node)
        .with_config(config.query.clone());
    let state = ApiState::new(query, status, &config.scanner);
    let server = ApiServer::new(config.api.clone(), state);

    let serve_result = server
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await;

    stop_tx.send(true).ok();
    if let Some(task) = scanner_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(%e, "scanner ended with error");
                return EXIT_STORE;
            }
            Err(e) => warn!(%e, "scanner task join failed"),
        }
    }

    match serve_result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!(%e, "HTTP server failed");
            EXIT_CONFIG
        }
    }
}
