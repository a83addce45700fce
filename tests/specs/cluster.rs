// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster bundle specs: fan-out, merge, and cross-surface lifecycle.

use crate::prelude::*;
use dx_core::{Bundle, BundleStatus, BundleType};

#[tokio::test]
async fn health_endpoint_answers_on_every_node() {
    let cluster = spawn_cluster().await;
    let client = reqwest::Client::new();
    for node in std::iter::once(&cluster.master).chain(cluster.agents.iter()) {
        let body: serde_json::Value = client
            .get(format!("{}/system/health", node.base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }
}

#[tokio::test]
async fn agents_do_not_serve_the_cluster_surface() {
    let cluster = spawn_cluster().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/diagnostics", cluster.agents[0].base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn three_node_cluster_bundle_merges_every_node() {
    let cluster = spawn_cluster().await;
    let client = reqwest::Client::new();
    let base = format!("{}/diagnostics", cluster.master.base_url);

    let response = client.put(format!("{base}/bundle-0")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let started: Bundle = response.json().await.unwrap();
    assert_eq!(started.status, BundleStatus::Started);
    assert_eq!(started.kind, BundleType::Cluster);

    let done = wait_terminal(&client, &format!("{base}/bundle-0")).await;
    assert_eq!(done.status, BundleStatus::Done);
    assert!(done.errors.is_empty(), "unexpected errors: {:?}", done.errors);
    assert!(done.size > 0);

    let entries = fetch_entries(&client, &format!("{base}/bundle-0/file")).await;
    let mut names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    names.sort_unstable();
    // Each node contributes its collector entry and its own run summary;
    // the per-node report comes last in archive order.
    assert_eq!(
        names,
        [
            "192.0.2.1/test.txt",
            "192.0.2.2/test.txt",
            "192.0.2.3/test.txt",
            "summaryErrorReport.txt",
            "summaryReport.txt",
            "summaryReport.txt",
            "summaryReport.txt",
        ]
    );

    let report_body = &entries.iter().find(|(n, _)| n == "summaryErrorReport.txt").unwrap().1;
    let report: serde_json::Value = serde_json::from_str(report_body).unwrap();
    let nodes = report["nodes"].as_object().unwrap();
    assert_eq!(nodes.len(), 3);
    assert!(nodes.values().all(|n| n["succeeded"] == true));
}

#[tokio::test]
async fn empty_fan_out_produces_a_report_only_bundle() {
    let cluster = spawn_cluster().await;
    let client = reqwest::Client::new();
    let base = format!("{}/diagnostics", cluster.master.base_url);

    let response = client
        .put(format!("{base}/bundle-0"))
        .header("content-type", "application/json")
        .body(r#"{"type": "Cluster", "masters": false, "agents": false}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let done = wait_terminal(&client, &format!("{base}/bundle-0")).await;
    assert_eq!(done.status, BundleStatus::Done);

    let entries = fetch_entries(&client, &format!("{base}/bundle-0/file")).await;
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["summaryErrorReport.txt"]);
}

#[tokio::test]
async fn cluster_delete_lifecycle() {
    let cluster = spawn_cluster().await;
    let client = reqwest::Client::new();
    let base = format!("{}/diagnostics", cluster.master.base_url);

    client.put(format!("{base}/bundle-0")).send().await.unwrap();
    wait_terminal(&client, &format!("{base}/bundle-0")).await;

    let response = client.delete(format!("{base}/bundle-0")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let deleted: Bundle = response.json().await.unwrap();
    assert_eq!(deleted.status, BundleStatus::Deleted);

    let response = client.delete(format!("{base}/bundle-0")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn cluster_status_of_unknown_bundle_is_404() {
    let cluster = spawn_cluster().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/diagnostics/ghost", cluster.master.base_url))
        .send()
        .await
        .unwrap();
    assert_error_body(response, 404).await;
}

#[tokio::test]
async fn cluster_list_includes_finished_bundles() {
    let cluster = spawn_cluster().await;
    let client = reqwest::Client::new();
    let base = format!("{}/diagnostics", cluster.master.base_url);

    client.put(format!("{base}/bundle-0")).send().await.unwrap();
    wait_terminal(&client, &format!("{base}/bundle-0")).await;

    let bundles: Vec<Bundle> =
        client.get(&base).send().await.unwrap().json().await.unwrap();
    assert!(bundles.iter().any(|b| b.id == "bundle-0" && b.kind == BundleType::Cluster));
}

#[tokio::test]
async fn duplicate_cluster_create_conflicts() {
    let cluster = spawn_cluster().await;
    let client = reqwest::Client::new();
    let base = format!("{}/diagnostics", cluster.master.base_url);

    client.put(format!("{base}/bundle-0")).send().await.unwrap();
    let response = client.put(format!("{base}/bundle-0")).send().await.unwrap();
    assert_error_body(response, 409).await;
}
