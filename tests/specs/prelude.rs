// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the integration specs.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use dx_cluster::{HttpProxyClient, NodeRole, NodeUrlBuilder, UrlBuildError};
use dx_core::Bundle;
use dx_daemon::{
    router, AppState, ClusterHandler, CollectorSet, LocalState, StaticDiscovery,
};
use dx_engine::LocalBundleEngine;
use dx_store::BundleStore;

pub const POLL_MAX_MS: u64 = 10_000;

/// One daemon instance bound to an ephemeral loopback port.
pub struct TestNode {
    pub base_url: String,
    pub store: Arc<BundleStore>,
    _workdir: tempfile::TempDir,
}

/// Maps made-up cluster addresses onto the real ephemeral servers.
struct MapUrlBuilder {
    urls: HashMap<String, String>,
}

impl NodeUrlBuilder for MapUrlBuilder {
    fn base_url(&self, ip: &str, _role: NodeRole) -> Result<String, UrlBuildError> {
        self.urls.get(ip).cloned().ok_or_else(|| UrlBuildError {
            ip: ip.to_string(),
            reason: "unknown test node".into(),
        })
    }
}

async fn serve(state: AppState) -> String {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn local_state(workdir: &tempfile::TempDir, collectors_json: &str) -> (Arc<BundleStore>, LocalState) {
    let store = Arc::new(BundleStore::open(workdir.path().join("bundles")).unwrap());
    let collectors_path = workdir.path().join("collectors.json");
    std::fs::write(&collectors_path, collectors_json).unwrap();
    let collectors = CollectorSet::from_file(&collectors_path, reqwest::Client::new()).unwrap();
    let engine = LocalBundleEngine::new(Arc::clone(&store));
    (
        Arc::clone(&store),
        LocalState { engine, collectors, timeout: Duration::from_secs(10) },
    )
}

/// An agent-only daemon with the given collectors config.
pub async fn spawn_agent(collectors_json: &str) -> TestNode {
    let workdir = tempfile::tempdir().unwrap();
    let (store, local) = local_state(&workdir, collectors_json);
    let base_url = serve(AppState { local: Arc::new(local), cluster: None }).await;
    TestNode { base_url, store, _workdir: workdir }
}

/// A collectors config with one file collector named `<name>` serving `body`.
pub fn file_collector_config(workdir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let payload = workdir.path().join(format!("{}.txt", name.replace('/', "_")));
    std::fs::write(&payload, body).unwrap();
    serde_json::json!([
        {"type": "file", "name": name, "path": payload}
    ])
    .to_string()
}

/// A three-node cluster: one master (`192.0.2.2`) and two agents
/// (`192.0.2.1`, `192.0.2.3`), each serving one `<ip>/test.txt` collector.
pub struct ClusterFixture {
    pub master: TestNode,
    pub agents: Vec<TestNode>,
}

pub async fn spawn_cluster() -> ClusterFixture {
    let master_ip = "192.0.2.2";
    let agent_ips = ["192.0.2.1", "192.0.2.3"];

    let mut urls = HashMap::new();

    let mut agents = Vec::new();
    for ip in agent_ips {
        let workdir = tempfile::tempdir().unwrap();
        let config = file_collector_config(&workdir, &format!("{ip}/test.txt"), "hello");
        let (store, local) = local_state(&workdir, &config);
        let base_url = serve(AppState { local: Arc::new(local), cluster: None }).await;
        urls.insert(ip.to_string(), base_url.clone());
        agents.push(TestNode { base_url, store, _workdir: workdir });
    }

    // The master serves both surfaces from one store.
    let workdir = tempfile::tempdir().unwrap();
    let config = file_collector_config(&workdir, &format!("{master_ip}/test.txt"), "hello");
    let (store, local) = local_state(&workdir, &config);

    // The cluster surface needs the master's own node URL, which is only
    // known after binding; bind first, then wire the handler-backed router.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    urls.insert(master_ip.to_string(), base_url.clone());

    let discovery = Arc::new(StaticDiscovery::new(
        vec![master_ip.to_string()],
        agent_ips.iter().map(|s| s.to_string()).collect(),
        vec![],
    ));
    let handler = Arc::new(ClusterHandler::new(
        Arc::clone(&store),
        discovery,
        Arc::new(MapUrlBuilder { urls }),
        Arc::new(HttpProxyClient::new(reqwest::Client::new(), "/node/diagnostics")),
        Duration::from_millis(20),
        Duration::from_secs(10),
    ));
    let app = router(AppState { local: Arc::new(local), cluster: Some(handler) });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ClusterFixture {
        master: TestNode { base_url, store, _workdir: workdir },
        agents,
    }
}

/// Poll a bundle's status endpoint until it reaches a terminal state.
pub async fn wait_terminal(client: &reqwest::Client, status_url: &str) -> Bundle {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(POLL_MAX_MS);
    loop {
        let response = client.get(status_url).send().await.unwrap();
        if response.status().is_success() {
            let bundle: Bundle = response.json().await.unwrap();
            if bundle.status.is_terminal() {
                return bundle;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "bundle at {status_url} never reached a terminal state"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// Download an archive and return its entries as (name, body) pairs.
pub async fn fetch_entries(client: &reqwest::Client, file_url: &str) -> Vec<(String, String)> {
    let response = client.get(file_url).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap(),
        "application/zip"
    );
    let bytes = response.bytes().await.unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        entries.push((entry.name().to_string(), body));
    }
    entries
}

/// Assert an error reply carries the documented JSON shape.
pub async fn assert_error_body(response: reqwest::Response, code: u16) {
    assert_eq!(response.status().as_u16(), code);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], code);
    assert!(body["error"].is_string());
}
