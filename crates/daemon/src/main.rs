// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dxd: the diagnostics bundle daemon.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dx_cluster::{HttpProxyClient, NodeRole, SchemeUrlBuilder};
use dx_daemon::{
    router, AppState, ClusterHandler, CollectorSet, CollectorsError, LocalState, StaticDiscovery,
};
use dx_engine::LocalBundleEngine;
use dx_store::{BundleStore, StoreError};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Path of the node-local surface, used for peer calls.
const NODE_BASE_PATH: &str = "/node/diagnostics";

#[derive(Debug, Parser)]
#[command(name = "dxd", about = "Cluster diagnostics bundle service", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "DX_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "DX_PORT", default_value_t = 1050)]
    port: u16,

    /// Directory all bundles live under.
    #[arg(long, env = "DX_WORK_DIR", default_value = "/var/lib/dx/bundles")]
    work_dir: PathBuf,

    /// Role of this node: master, agent, or public_agent.
    #[arg(long, env = "DX_ROLE", default_value = "agent")]
    role: String,

    /// Address this node is known by in the cluster.
    #[arg(long, env = "DX_NODE_IP", default_value = "127.0.0.1")]
    node_ip: String,

    /// JSON file describing the collectors to run per bundle.
    #[arg(long, env = "DX_COLLECTORS")]
    collectors: Option<PathBuf>,

    /// Master node addresses, comma-separated.
    #[arg(long, env = "DX_MASTERS", value_delimiter = ',')]
    masters: Vec<String>,

    /// Agent node addresses, comma-separated.
    #[arg(long, env = "DX_AGENTS", value_delimiter = ',')]
    agents: Vec<String>,

    /// Public agent node addresses, comma-separated.
    #[arg(long, env = "DX_PUBLIC_AGENTS", value_delimiter = ',')]
    public_agents: Vec<String>,

    /// How often the coordinator polls each node, in milliseconds.
    #[arg(long, env = "DX_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Deadline for producing any bundle, in seconds.
    #[arg(long, env = "DX_BUNDLE_TIMEOUT_S", default_value_t = 600)]
    bundle_timeout_s: u64,

    /// Scheme for peer URLs.
    #[arg(long, env = "DX_SCHEME", default_value = "http")]
    scheme: String,

    /// Bundle-service port on masters.
    #[arg(long, env = "DX_MASTER_PORT", default_value_t = 1050)]
    master_port: u16,

    /// Bundle-service port on agents.
    #[arg(long, env = "DX_AGENT_PORT", default_value_t = 1050)]
    agent_port: u16,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("unknown role {0:?} (expected master, agent, or public_agent)")]
    InvalidRole(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Collectors(#[from] CollectorsError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

fn parse_role(role: &str) -> Result<NodeRole, StartupError> {
    match role {
        "master" => Ok(NodeRole::Master),
        "agent" => Ok(NodeRole::Agent),
        "public_agent" => Ok(NodeRole::PublicAgent),
        other => Err(StartupError::InvalidRole(other.to_string())),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let role = parse_role(&args.role)?;
    let poll_interval = Duration::from_millis(args.poll_interval_ms);
    let bundle_timeout = Duration::from_secs(args.bundle_timeout_s);

    let store = Arc::new(BundleStore::open(&args.work_dir)?);
    let engine = LocalBundleEngine::new(Arc::clone(&store));
    let client = reqwest::Client::new();

    let collectors = match &args.collectors {
        Some(path) => CollectorSet::from_file(path, client.clone())?,
        None => CollectorSet::default_for_node(&args.node_ip, client.clone()),
    };

    let cluster = if role == NodeRole::Master {
        let discovery = Arc::new(StaticDiscovery::new(
            args.masters.clone(),
            args.agents.clone(),
            args.public_agents.clone(),
        ));
        let url_builder =
            Arc::new(SchemeUrlBuilder::new(args.scheme.clone(), args.master_port, args.agent_port));
        let proxy = Arc::new(HttpProxyClient::new(client.clone(), NODE_BASE_PATH));
        Some(Arc::new(ClusterHandler::new(
            Arc::clone(&store),
            discovery,
            url_builder,
            proxy,
            poll_interval,
            bundle_timeout,
        )))
    } else {
        None
    };

    let state = AppState {
        local: Arc::new(LocalState { engine, collectors, timeout: bundle_timeout }),
        cluster,
    };
    let app = router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind { addr: addr.clone(), source })?;
    tracing::info!(%addr, role = %role, work_dir = %args.work_dir.display(), "dxd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}
