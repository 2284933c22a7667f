// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use redis::AsyncCommands;
use serde_json::json;
use std::time::Duration;

use postharvest::domain::models::task::{Task, TaskStatus};
use postharvest::queue::task_queue::{QueueError, TaskQueue};

use super::helpers::RedisBroker;

const LEASE: Duration = Duration::from_secs(30);

#[tokio::test]
async fn test_redis_dequeue_is_fifo_per_queue() {
    let Some(broker) = RedisBroker::start().await else {
        return;
    };
    let queue = broker.queue().await;

    let first = queue
        .enqueue(Task::new("storage:store_metadata", json!(1), 3))
        .await
        .unwrap();
    queue
        .enqueue(Task::new("storage:store_metadata", json!(2), 3))
        .await
        .unwrap();

    assert!(queue.dequeue(&["media"], LEASE).await.unwrap().is_none());
    let got = queue.dequeue(&["storage"], LEASE).await.unwrap().unwrap();
    assert_eq!(got.id, first.id);
    assert_eq!(got.status, TaskStatus::Started);
    assert!(got.delivery_id.is_some());

    let stored = queue.find(first.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Started);
}

#[tokio::test]
async fn test_redis_retry_waits_for_promotion() {
    let Some(broker) = RedisBroker::start().await else {
        return;
    };
    let queue = broker.queue().await;

    queue
        .enqueue(Task::new("crawling:crawl_author", json!({"a": 1}), 3))
        .await
        .unwrap();
    let task = queue.dequeue(&["crawling"], LEASE).await.unwrap().unwrap();
    let retried = queue
        .retry(task, Duration::from_secs(60), "timeout".into())
        .await
        .unwrap();
    assert_eq!(retried.status, TaskStatus::Retry);

    assert_eq!(queue.promote_due(Utc::now()).await.unwrap(), 0);
    assert!(queue.dequeue(&["crawling"], LEASE).await.unwrap().is_none());

    let later = Utc::now() + chrono::Duration::seconds(61);
    assert_eq!(queue.promote_due(later).await.unwrap(), 1);
    let again = queue.dequeue(&["crawling"], LEASE).await.unwrap().unwrap();
    assert_eq!(again.id, retried.id);
    assert_eq!(again.args, json!({"a": 1}));
    assert_eq!(again.attempt_count, 1);
}

#[tokio::test]
async fn test_redis_failure_is_kept_in_dead_letter() {
    let Some(broker) = RedisBroker::start().await else {
        return;
    };
    let queue = broker.queue().await;

    queue
        .enqueue(Task::new("media:process_media", json!({}), 0))
        .await
        .unwrap();
    let task = queue.dequeue(&["media"], LEASE).await.unwrap().unwrap();
    queue.fail(task.clone(), "boom".into()).await.unwrap();

    let dead = queue.dead_letters().await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].id, task.id);
    assert_eq!(dead[0].status, TaskStatus::Failure);
    assert_eq!(dead[0].error.as_deref(), Some("boom"));
}

#[tokio::test]
async fn test_redis_stale_acknowledgement_after_redelivery_is_rejected() {
    let Some(broker) = RedisBroker::start().await else {
        return;
    };
    let queue = broker.queue().await;

    queue
        .enqueue(Task::new("crawling:crawl_author", json!({}), 3))
        .await
        .unwrap();
    let first = queue
        .dequeue(&["crawling"], Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(queue.reclaim_expired(Utc::now()).await.unwrap(), 0);
    let after_lease = Utc::now() + chrono::Duration::seconds(2);
    assert_eq!(queue.reclaim_expired(after_lease).await.unwrap(), 1);
    let second = queue.dequeue(&["crawling"], LEASE).await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_ne!(second.delivery_id, first.delivery_id);

    let stale = queue.retry(first.clone(), Duration::ZERO, "late".into()).await;
    assert!(matches!(stale, Err(QueueError::LeaseLost(id)) if id == first.id));
    assert!(matches!(
        queue.complete(first, None).await,
        Err(QueueError::LeaseLost(_))
    ));

    // No third copy is queued while the current delivery runs
    queue.promote_due(Utc::now()).await.unwrap();
    assert!(queue.dequeue(&["crawling"], LEASE).await.unwrap().is_none());
    let stored = queue.find(second.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Started);
    assert_eq!(stored.attempt_count, 0);

    let done = queue.complete(second, Some(json!("t2_x"))).await.unwrap();
    assert_eq!(done.status, TaskStatus::Success);
}

#[tokio::test]
async fn test_redis_success_expires_but_failure_persists() {
    let Some(broker) = RedisBroker::start().await else {
        return;
    };
    let namespace = "ttl-check";
    let queue = postharvest::queue::redis_queue::RedisTaskQueue::connect(&broker.url, namespace)
        .await
        .unwrap()
        .with_result_ttl(Duration::from_secs(120));

    queue
        .enqueue(Task::new("storage:store_metadata", json!(1), 0))
        .await
        .unwrap();
    queue
        .enqueue(Task::new("storage:store_metadata", json!(2), 0))
        .await
        .unwrap();
    let ok = queue.dequeue(&["storage"], LEASE).await.unwrap().unwrap();
    let bad = queue.dequeue(&["storage"], LEASE).await.unwrap().unwrap();
    queue.complete(ok.clone(), None).await.unwrap();
    queue.fail(bad.clone(), "boom".into()).await.unwrap();

    let mut con = broker.connection().await;
    let ok_ttl: i64 = con
        .ttl(format!("{}:task:{}", namespace, ok.id))
        .await
        .unwrap();
    assert!(ok_ttl > 0 && ok_ttl <= 120);
    let bad_ttl: i64 = con
        .ttl(format!("{}:task:{}", namespace, bad.id))
        .await
        .unwrap();
    assert_eq!(bad_ttl, -1);

    let in_flight: i64 = con
        .llen(format!("{}:processing:storage", namespace))
        .await
        .unwrap();
    assert_eq!(in_flight, 0);
}
