// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::json;
use std::sync::Arc;

use postharvest::application::dto::crawl_request::SubmitCrawlRequestDto;
use postharvest::domain::models::Media;
use postharvest::domain::repositories::storage_repository::ObjectStore;
use postharvest::infrastructure::parquet::decode_row;
use postharvest::pipeline::stage::ProcessMediaArgs;
use postharvest::pipeline::StageOutput;

use super::helpers::{media_server, sample_result, Harness, StaticExtractor, DATA_BUCKET, MEDIA_BUCKET};

#[tokio::test]
async fn test_recrawling_same_author_overwrites_by_key() {
    let server = media_server().await;
    let result = sample_result(&format!("{}/img.png", server.uri()));
    let harness = Harness::new(Arc::new(StaticExtractor::new(Some(result)))).await;
    let request = SubmitCrawlRequestDto {
        source_type: "reddit".into(),
        author_name: "X".into(),
        lookback_days: None,
        limit: Some(10),
    };

    harness
        .submit_use_case()
        .execute(request.clone())
        .await
        .unwrap();
    harness.drain().await;
    let first = harness
        .objects
        .get(DATA_BUCKET, "posts/p1.parquet")
        .await
        .unwrap()
        .unwrap();

    harness.submit_use_case().execute(request).await.unwrap();
    harness.drain().await;
    let second = harness
        .objects
        .get(DATA_BUCKET, "posts/p1.parquet")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(decode_row(first.body).unwrap(), decode_row(second.body).unwrap());
    assert_eq!(harness.keys(DATA_BUCKET, "authors/").await.len(), 1);
    assert_eq!(harness.keys(DATA_BUCKET, "posts/").await.len(), 2);
    assert_eq!(harness.keys(DATA_BUCKET, "media/metadata/").await.len(), 1);
    assert_eq!(harness.keys(MEDIA_BUCKET, "media/files/").await.len(), 1);
}

#[tokio::test]
async fn test_reprocessing_hosted_media_keeps_same_url() {
    let server = media_server().await;
    let harness = Harness::new(Arc::new(StaticExtractor::new(None))).await;
    let media = Media::new("p1_0", "p1", &format!("{}/img.png", server.uri())).unwrap();
    let args = ProcessMediaArgs {
        media: serde_json::to_value(&media).unwrap(),
    };

    let first = harness.pipeline.process_media(args.clone()).await.unwrap();
    let hosted_url = match first {
        StageOutput::MediaStored { hosted_url, .. } => hosted_url.unwrap(),
        other => panic!("unexpected output: {:?}", other),
    };
    assert_eq!(
        hosted_url,
        "http://minio:9000/extracts-media/media/files/p1_0.png"
    );

    // Payload already carrying the same hosted url is accepted again
    let mut hosted = media.clone();
    hosted.hosted_url = Some(hosted_url.clone());
    let again = harness
        .pipeline
        .process_media(ProcessMediaArgs {
            media: serde_json::to_value(&hosted).unwrap(),
        })
        .await
        .unwrap();
    assert_eq!(
        again,
        StageOutput::MediaStored {
            media_id: "p1_0".into(),
            hosted_url: Some(hosted_url),
        }
    );
    assert_eq!(harness.keys(MEDIA_BUCKET, "media/files/").await.len(), 1);
}

#[tokio::test]
async fn test_media_payload_with_bad_url_is_rejected() {
    let harness = Harness::new(Arc::new(StaticExtractor::new(None))).await;

    let err = harness
        .pipeline
        .process_media(ProcessMediaArgs {
            media: json!({"id": "p1_0", "post_id": "p1", "original_url": "ftp://host/a.png"}),
        })
        .await
        .unwrap_err();

    assert!(!err.is_retryable());
    assert!(harness.keys(DATA_BUCKET, "media/").await.is_empty());
}
