// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use postharvest::pipeline::Stage;
use postharvest::queue::routing::{route_queue, ALL_QUEUES, DEFAULT_QUEUE};

#[test]
fn test_every_stage_routes_to_a_declared_queue() {
    for stage in Stage::ALL {
        let queue = route_queue(stage.name());
        assert_eq!(queue, stage.queue());
        assert!(ALL_QUEUES.contains(&queue));
        assert_eq!(Stage::from_name(stage.name()).unwrap(), stage);
    }
}

#[test]
fn test_stage_registration_names() {
    assert_eq!(Stage::CrawlAuthor.name(), "crawling:crawl_author");
    assert_eq!(
        Stage::ProcessRedditData.name(),
        "processing:process_reddit_data"
    );
    assert_eq!(Stage::StoreMetadata.name(), "storage:store_metadata");
    assert_eq!(Stage::ProcessMedia.name(), "media:process_media");
}

#[test]
fn test_unprefixed_task_goes_to_default_queue() {
    assert_eq!(route_queue("cleanup"), DEFAULT_QUEUE);
    assert!(Stage::from_name("cleanup").is_err());
}
