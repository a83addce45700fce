// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-local bundle lifecycle specs.

use crate::prelude::*;
use dx_core::{Bundle, BundleStatus, BundleType};

/// Two collectors: a mandatory one that fails (missing file) and one that
/// succeeds with a literal body.
fn failing_and_ok_config(workdir: &tempfile::TempDir) -> String {
    let ok_payload = workdir.path().join("ok.txt");
    std::fs::write(&ok_payload, "OK").unwrap();
    serde_json::json!([
        {"type": "file", "name": "collector-1", "path": workdir.path().join("missing.txt")},
        {"type": "file", "name": "collector-2", "path": ok_payload}
    ])
    .to_string()
}

#[tokio::test]
async fn local_bundle_with_one_failing_mandatory_collector() {
    let workdir = tempfile::tempdir().unwrap();
    let node = spawn_agent(&failing_and_ok_config(&workdir)).await;
    let client = reqwest::Client::new();
    let base = format!("{}/node/diagnostics", node.base_url);

    let response = client.put(format!("{base}/bundle-0")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let started: Bundle = response.json().await.unwrap();
    assert_eq!(started.status, BundleStatus::Started);
    assert_eq!(started.kind, BundleType::Local);

    let done = wait_terminal(&client, &format!("{base}/bundle-0")).await;
    assert_eq!(done.status, BundleStatus::Done);
    assert!(done.size > 0);
    assert!(done.started_at.is_some());
    assert!(done.stopped_at.is_some());
    assert_eq!(done.errors.len(), 1);
    assert!(done.errors[0].starts_with("could not collect collector-1:"));

    let entries = fetch_entries(&client, &format!("{base}/bundle-0/file")).await;
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["collector-2", "summaryReport.txt", "summaryErrorsReport.txt"]);
    assert_eq!(entries[0].1, "OK");
    assert_eq!(
        entries[1].1,
        "[START GET collector-1]\n[STOP GET collector-1]\n\
         [START GET collector-2]\n[STOP GET collector-2]\n"
    );
    assert_eq!(entries[2].1, done.errors.join("\n"));
}

#[tokio::test]
async fn delete_lifecycle() {
    let workdir = tempfile::tempdir().unwrap();
    let node = spawn_agent(&file_collector_config(&workdir, "notes", "payload")).await;
    let client = reqwest::Client::new();
    let base = format!("{}/node/diagnostics", node.base_url);

    client.put(format!("{base}/bundle-0")).send().await.unwrap();
    let done = wait_terminal(&client, &format!("{base}/bundle-0")).await;

    let response = client.delete(format!("{base}/bundle-0")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let deleted: Bundle = response.json().await.unwrap();
    assert_eq!(deleted.status, BundleStatus::Deleted);
    assert_eq!(deleted.size, done.size);

    // Archive gone, state retained.
    assert!(!node.store.archive_path("bundle-0").exists());
    let response = client.get(format!("{base}/bundle-0")).send().await.unwrap();
    let after: Bundle = response.json().await.unwrap();
    assert_eq!(after.status, BundleStatus::Deleted);
    assert_eq!(after.size, done.size);

    // A second delete is a no-op.
    let response = client.delete(format!("{base}/bundle-0")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_MODIFIED);

    // The archive is no longer downloadable.
    let response = client.get(format!("{base}/bundle-0/file")).send().await.unwrap();
    assert_error_body(response, 404).await;
}

#[tokio::test]
async fn duplicate_create_conflicts() {
    let workdir = tempfile::tempdir().unwrap();
    let node = spawn_agent(&file_collector_config(&workdir, "notes", "x")).await;
    let client = reqwest::Client::new();
    let base = format!("{}/node/diagnostics", node.base_url);

    client.put(format!("{base}/bundle-0")).send().await.unwrap();
    let response = client.put(format!("{base}/bundle-0")).send().await.unwrap();
    assert_error_body(response, 409).await;
}

#[tokio::test]
async fn status_of_unknown_bundle_is_404() {
    let workdir = tempfile::tempdir().unwrap();
    let node = spawn_agent(&file_collector_config(&workdir, "notes", "x")).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/node/diagnostics/ghost", node.base_url))
        .send()
        .await
        .unwrap();
    assert_error_body(response, 404).await;
}

#[tokio::test]
async fn list_is_empty_for_a_fresh_node() {
    let workdir = tempfile::tempdir().unwrap();
    let node = spawn_agent(&file_collector_config(&workdir, "notes", "x")).await;
    let client = reqwest::Client::new();

    let response =
        client.get(format!("{}/node/diagnostics", node.base_url)).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let bundles: Vec<Bundle> = response.json().await.unwrap();
    assert!(bundles.is_empty());
}

#[tokio::test]
async fn list_ignores_stray_files_in_the_work_dir() {
    let workdir = tempfile::tempdir().unwrap();
    let node = spawn_agent(&file_collector_config(&workdir, "notes", "x")).await;
    std::fs::write(node.store.workdir().join("stray.txt"), b"junk").unwrap();
    let client = reqwest::Client::new();

    let bundles: Vec<Bundle> = client
        .get(format!("{}/node/diagnostics", node.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(bundles.is_empty());
}

#[tokio::test]
async fn cluster_typed_body_is_rejected_on_the_node_surface() {
    let workdir = tempfile::tempdir().unwrap();
    let node = spawn_agent(&file_collector_config(&workdir, "notes", "x")).await;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{}/node/diagnostics/bundle-0", node.base_url))
        .header("content-type", "application/json")
        .body(r#"{"type": "Cluster"}"#)
        .send()
        .await
        .unwrap();
    assert_error_body(response, 400).await;
}

#[tokio::test]
async fn download_of_an_unfinished_bundle_is_404() {
    // A slow command keeps the bundle in Started while we probe.
    let config = serde_json::json!([
        {"type": "command", "name": "slow", "command": ["sleep", "5"]}
    ])
    .to_string();
    let node = spawn_agent(&config).await;
    let client = reqwest::Client::new();
    let base = format!("{}/node/diagnostics", node.base_url);

    client.put(format!("{base}/bundle-0")).send().await.unwrap();
    let response = client.get(format!("{base}/bundle-0/file")).send().await.unwrap();
    assert_error_body(response, 404).await;
}
