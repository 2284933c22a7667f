// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use postharvest::pipeline::Stage;

use super::helpers::{media_server, sample_result, Harness, StaticExtractor};

async fn harness() -> Harness {
    let server = media_server().await;
    let result = sample_result(&format!("{}/img.png", server.uri()));
    Harness::new(Arc::new(StaticExtractor::new(Some(result)))).await
}

#[tokio::test]
async fn test_submit_crawl_returns_accepted_with_task_id() {
    let harness = harness().await;
    let server = harness.server();

    let response = server
        .post("/v1/crawl")
        .json(&json!({
            "source_type": "reddit",
            "author_name": "X",
            "lookback_days": 21
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body: Value = response.json();
    let task_id: Uuid = body["task_id"].as_str().unwrap().parse().unwrap();

    let queued = harness.queue.tasks_named(Stage::CrawlAuthor.name());
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].id, task_id);
    assert_eq!(queued[0].args["author_name"], "X");
    assert_eq!(queued[0].args["source_type"], "reddit");
}

#[tokio::test]
async fn test_task_status_reports_progress() {
    let harness = harness().await;
    let server = harness.server();

    let body: Value = server
        .post("/v1/crawl")
        .json(&json!({"source_type": "reddit", "author_name": "X"}))
        .await
        .json();
    let task_id = body["task_id"].as_str().unwrap().to_string();

    let response = server.get(&format!("/v1/tasks/{}", task_id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let status: Value = response.json();
    assert_eq!(status["status"], "PENDING");
    assert_eq!(status["attempts"], 0);

    harness.drain().await;

    let status: Value = server.get(&format!("/v1/tasks/{}", task_id)).await.json();
    assert_eq!(status["status"], "SUCCESS");
    assert_eq!(status["result"], "X");
    assert!(status["error"].is_null());
}

#[tokio::test]
async fn test_submit_rejects_source_without_extractor() {
    let harness = harness().await;
    let server = harness.server();

    for source_type in ["linkedin", "myspace"] {
        let response = server
            .post("/v1/crawl")
            .json(&json!({"source_type": source_type, "author_name": "X"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains(source_type));
    }

    assert!(harness
        .queue
        .tasks_named(Stage::CrawlAuthor.name())
        .is_empty());
}

#[tokio::test]
async fn test_submit_rejects_invalid_request() {
    let harness = harness().await;
    let server = harness.server();

    let response = server
        .post("/v1/crawl")
        .json(&json!({"source_type": "reddit", "author_name": ""}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/v1/crawl")
        .json(&json!({"source_type": "reddit", "author_name": "X", "lookback_days": 0}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let harness = harness().await;
    let server = harness.server();

    let response = server.get(&format!("/v1/tasks/{}", Uuid::new_v4())).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
