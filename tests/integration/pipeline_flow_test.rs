// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use postharvest::application::dto::crawl_request::SubmitCrawlRequestDto;
use postharvest::domain::models::task::TaskStatus;
use postharvest::infrastructure::parquet::decode_row;
use postharvest::domain::repositories::storage_repository::ObjectStore;
use postharvest::pipeline::Stage;
use postharvest::queue::task_queue::TaskQueue;
use postharvest::workers::stage_worker::Disposition;

use super::helpers::{
    media_server, sample_result, FlakyExtractor, Harness, StaticExtractor, DATA_BUCKET,
    MEDIA_BUCKET,
};

fn crawl_request(author: &str) -> SubmitCrawlRequestDto {
    SubmitCrawlRequestDto {
        source_type: "reddit".into(),
        author_name: author.into(),
        lookback_days: Some(7),
        limit: None,
    }
}

#[tokio::test]
async fn test_crawl_fans_out_to_metadata_and_media_storage() {
    let server = media_server().await;
    let result = sample_result(&format!("{}/img.png", server.uri()));
    let harness = Harness::new(Arc::new(StaticExtractor::new(Some(result)))).await;

    let crawl = harness
        .submit_use_case()
        .execute(crawl_request("X"))
        .await
        .unwrap();
    assert_eq!(crawl.queue(), "crawling");

    let dispositions = harness.drain().await;
    assert_eq!(dispositions.len(), 4);
    assert!(dispositions.iter().all(|d| *d == Disposition::Completed));

    let crawl = harness.queue.find(crawl.id).await.unwrap().unwrap();
    assert_eq!(crawl.status, TaskStatus::Success);
    assert_eq!(crawl.result, Some(json!("X")));

    // Dispatch produced one metadata task carrying both posts and one media task
    let metadata_tasks = harness.queue.tasks_named(Stage::StoreMetadata.name());
    assert_eq!(metadata_tasks.len(), 1);
    assert_eq!(metadata_tasks[0].args["posts"].as_array().unwrap().len(), 2);
    let media_tasks = harness.queue.tasks_named(Stage::ProcessMedia.name());
    assert_eq!(media_tasks.len(), 1);

    let dispatch = &harness.queue.tasks_named(Stage::ProcessRedditData.name())[0];
    assert_eq!(dispatch.parent_id, Some(crawl.id));
    assert_eq!(metadata_tasks[0].parent_id, Some(dispatch.id));

    assert_eq!(
        harness.keys(DATA_BUCKET, "authors/").await,
        vec!["authors/X.parquet"]
    );
    assert_eq!(
        harness.keys(DATA_BUCKET, "posts/").await,
        vec!["posts/p1.parquet", "posts/p2.parquet"]
    );
    assert_eq!(
        harness.keys(DATA_BUCKET, "media/metadata/").await,
        vec!["media/metadata/p1_0.parquet"]
    );
    assert_eq!(
        harness.keys(MEDIA_BUCKET, "media/files/").await,
        vec!["media/files/p1_0.png"]
    );

    let metadata = harness
        .objects
        .get(DATA_BUCKET, "media/metadata/p1_0.parquet")
        .await
        .unwrap()
        .unwrap();
    let row = decode_row(metadata.body).unwrap();
    assert_eq!(
        row["hosted_url"].as_deref(),
        Some("http://minio:9000/extracts-media/media/files/p1_0.png")
    );
    assert_eq!(row["post_id"].as_deref(), Some("p1"));
}

#[tokio::test]
async fn test_empty_extraction_completes_without_dispatch() {
    let harness = Harness::new(Arc::new(StaticExtractor::new(None))).await;
    let crawl = harness
        .submit_use_case()
        .execute(crawl_request("nobody"))
        .await
        .unwrap();

    assert_eq!(harness.drain().await, vec![Disposition::Completed]);

    let crawl = harness.queue.find(crawl.id).await.unwrap().unwrap();
    assert_eq!(crawl.status, TaskStatus::Success);
    assert_eq!(crawl.result, None);
    assert!(harness
        .queue
        .tasks_named(Stage::ProcessRedditData.name())
        .is_empty());
    assert!(harness.keys(DATA_BUCKET, "").await.is_empty());
}

#[tokio::test]
async fn test_timeout_is_retried_with_identical_arguments() {
    let server = media_server().await;
    let result = sample_result(&format!("{}/img.png", server.uri()));
    let extractor = Arc::new(FlakyExtractor::new(2, result));
    let harness = Harness::new(extractor.clone()).await;

    let crawl = harness
        .submit_use_case()
        .execute(crawl_request("X"))
        .await
        .unwrap();

    assert_eq!(harness.drain().await, vec![Disposition::Retried]);
    let first_retry = harness.queue.find(crawl.id).await.unwrap().unwrap();
    assert_eq!(first_retry.status, TaskStatus::Retry);
    assert_eq!(first_retry.args, crawl.args);
    assert_eq!(first_retry.attempt_count, 1);
    let eta = first_retry.eta.unwrap();
    assert!(eta >= crawl.created_at + chrono::Duration::seconds(60));

    // Still delayed: nothing to do before the eta
    assert!(harness.drain().await.is_empty());

    harness.queue.promote_due(eta).await.unwrap();
    assert_eq!(harness.drain().await, vec![Disposition::Retried]);
    let second_retry = harness.queue.find(crawl.id).await.unwrap().unwrap();
    assert_eq!(second_retry.attempt_count, 2);
    assert_eq!(second_retry.args, crawl.args);

    harness
        .queue
        .promote_due(second_retry.eta.unwrap())
        .await
        .unwrap();
    let dispositions = harness.drain().await;
    assert_eq!(dispositions.len(), 4);

    let crawl = harness.queue.find(crawl.id).await.unwrap().unwrap();
    assert_eq!(crawl.status, TaskStatus::Success);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 3);
    assert_eq!(harness.keys(DATA_BUCKET, "posts/").await.len(), 2);
    assert!(harness.queue.dead_letters().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retries_exhausted_lands_in_dead_letter() {
    let server = media_server().await;
    let result = sample_result(&format!("{}/img.png", server.uri()));
    let harness = Harness::new(Arc::new(FlakyExtractor::new(u32::MAX, result))).await;

    let crawl = harness
        .submit_use_case()
        .execute(crawl_request("X"))
        .await
        .unwrap();

    // Initial attempt plus max_retries retries
    for _ in 0..harness.settings.queue.max_retries {
        assert_eq!(harness.drain().await, vec![Disposition::Retried]);
        harness
            .queue
            .promote_due(Utc::now() + chrono::Duration::seconds(61))
            .await
            .unwrap();
    }
    assert_eq!(harness.drain().await, vec![Disposition::Failed]);

    let dead = harness.queue.dead_letters().await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].id, crawl.id);
    assert_eq!(dead[0].status, TaskStatus::Failure);
    assert_eq!(dead[0].attempt_count, harness.settings.queue.max_retries);
    assert!(dead[0].error.as_deref().unwrap().contains("page load"));
}

#[tokio::test]
async fn test_media_download_failure_still_stores_metadata() {
    // Nothing mounted at this path: the server answers 404
    let server = wiremock::MockServer::start().await;
    let result = sample_result(&format!("{}/img.png", server.uri()));
    let harness = Harness::new(Arc::new(StaticExtractor::new(Some(result)))).await;

    harness
        .submit_use_case()
        .execute(crawl_request("X"))
        .await
        .unwrap();
    let dispositions = harness.drain().await;
    assert!(dispositions.iter().all(|d| *d == Disposition::Completed));

    assert!(harness.keys(MEDIA_BUCKET, "media/files/").await.is_empty());
    let metadata = harness
        .objects
        .get(DATA_BUCKET, "media/metadata/p1_0.parquet")
        .await
        .unwrap()
        .unwrap();
    let row = decode_row(metadata.body).unwrap();
    assert_eq!(row["hosted_url"], None);
}
