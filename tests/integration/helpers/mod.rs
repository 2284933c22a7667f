// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use axum_test::TestServer;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use postharvest::application::use_cases::crawl_use_case::{SubmitCrawlUseCase, TaskStatusUseCase};
use postharvest::config::settings::Settings;
use postharvest::domain::repositories::record_repository::RecordRepository;
use postharvest::domain::repositories::storage_repository::ObjectStore;
use postharvest::domain::models::{Author, ExtractionResult, Media, Post, Source, SourceType};
use postharvest::extractors::{ExtractionError, Extractor, ExtractorRegistry};
use postharvest::infrastructure::media::MediaDownloader;
use postharvest::infrastructure::record_store::ParquetRecordStore;
use postharvest::infrastructure::storage::InMemoryObjectStore;
use postharvest::pipeline::{Pipeline, Stage};
use postharvest::presentation::routes;
use postharvest::queue::memory_queue::InMemoryTaskQueue;
use postharvest::queue::redis_queue::RedisTaskQueue;
use postharvest::workers::stage_worker::{Disposition, StageWorker};

pub const DATA_BUCKET: &str = "extracts-data";
pub const MEDIA_BUCKET: &str = "extracts-media";

/// 返回固定结果的提取器
pub struct StaticExtractor {
    result: Option<ExtractionResult>,
    pub calls: AtomicU32,
}

impl StaticExtractor {
    pub fn new(result: Option<ExtractionResult>) -> Self {
        Self {
            result,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Extractor for StaticExtractor {
    async fn extract(&self, _source: &Source) -> Result<Option<ExtractionResult>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// 前 `failures` 次调用超时，之后返回固定结果
pub struct FlakyExtractor {
    failures: u32,
    result: ExtractionResult,
    pub calls: AtomicU32,
}

impl FlakyExtractor {
    pub fn new(failures: u32, result: ExtractionResult) -> Self {
        Self {
            failures,
            result,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Extractor for FlakyExtractor {
    async fn extract(&self, _source: &Source) -> Result<Option<ExtractionResult>, ExtractionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ExtractionError::Timeout("page load".into()));
        }
        Ok(Some(self.result.clone()))
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

/// 作者 X，两篇帖子，第一篇带一张图片
pub fn sample_result(media_url: &str) -> ExtractionResult {
    let mut first = Post::new("p1", "X");
    first.title = Some("first".into());
    first.num_likes = Some(12);
    let mut second = Post::new("p2", "X");
    second.title = Some("second".into());

    ExtractionResult::new(
        Author::new("X", "X"),
        vec![first, second],
        vec![Media::new("p1_0", "p1", media_url).unwrap()],
    )
}

/// 提供 `/img.png` 的媒体服务器
pub async fn media_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![7u8; 32]),
        )
        .mount(&server)
        .await;
    server
}

/// 全部使用进程内后端的流水线
pub struct Harness {
    pub settings: Settings,
    pub queue: Arc<InMemoryTaskQueue>,
    pub objects: Arc<InMemoryObjectStore>,
    pub pipeline: Arc<Pipeline>,
}

impl Harness {
    pub async fn new(extractor: Arc<dyn Extractor>) -> Self {
        let settings = Settings::from_toml(
            r#"
            [queue]
            backend = "memory"
            max_retries = 3

            [storage]
            storage_type = "memory"
            host = "minio"
            port = 9000
            "#,
        )
        .unwrap();

        let objects = Arc::new(InMemoryObjectStore::new());
        let records = ParquetRecordStore::new(
            objects.clone(),
            MediaDownloader::new(Duration::from_secs(5)).unwrap(),
            &settings.storage,
        );
        records.setup_buckets().await.unwrap();

        let registry = ExtractorRegistry::new().register(SourceType::Reddit, extractor);
        let queue = Arc::new(InMemoryTaskQueue::new());
        let pipeline = Pipeline::new(
            Arc::new(registry),
            Arc::new(records),
            queue.clone(),
            settings.queue.max_retries,
        );

        Self {
            settings,
            queue,
            objects,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn worker(&self, queue_name: &str) -> StageWorker {
        StageWorker::new(
            queue_name,
            self.queue.clone(),
            self.pipeline.clone(),
            self.settings.queue.retry_policy(),
            Duration::from_secs(30),
            Duration::from_millis(10),
        )
    }

    pub fn submit_use_case(&self) -> SubmitCrawlUseCase {
        SubmitCrawlUseCase::new(
            self.queue.clone(),
            Arc::new(self.pipeline.registry().clone()),
            self.settings.queue.max_retries,
        )
    }

    pub fn server(&self) -> TestServer {
        let app = routes::create_app(
            Arc::new(self.submit_use_case()),
            Arc::new(TaskStatusUseCase::new(self.queue.clone())),
        );
        TestServer::new(app).unwrap()
    }

    /// 按阶段顺序处理所有就绪任务，直到没有新任务
    pub async fn drain(&self) -> Vec<Disposition> {
        let mut dispositions = Vec::new();
        loop {
            let mut progressed = false;
            for stage in Stage::ALL {
                let worker = self.worker(stage.queue());
                while let Some(disposition) = worker.process_next().await.unwrap() {
                    dispositions.push(disposition);
                    progressed = true;
                }
            }
            if !progressed {
                return dispositions;
            }
        }
    }

    pub async fn keys(&self, bucket: &str, prefix: &str) -> Vec<String> {
        let mut keys = self.objects.list(bucket, prefix).await.unwrap();
        keys.sort();
        keys
    }
}

/// 容器中运行的 Redis，随结构体一起销毁
pub struct RedisBroker {
    pub url: String,
    _node: ContainerAsync<GenericImage>,
}

impl RedisBroker {
    /// 启动 Redis 容器；没有可用的 Docker 时返回 `None`
    pub async fn start() -> Option<Self> {
        let node = match GenericImage::new("redis", "7-alpine")
            .with_exposed_port(6379.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .start()
            .await
        {
            Ok(node) => node,
            Err(e) => {
                eprintln!("Docker unavailable, skipping Redis test: {}", e);
                return None;
            }
        };
        let port = node
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        Some(Self {
            url: format!("redis://127.0.0.1:{}", port),
            _node: node,
        })
    }

    /// 使用独立命名空间的任务队列
    pub async fn queue(&self) -> RedisTaskQueue {
        let namespace = format!("test-{}", Uuid::new_v4());
        RedisTaskQueue::connect(&self.url, &namespace)
            .await
            .expect("Failed to connect to Redis")
    }

    pub async fn connection(&self) -> redis::aio::MultiplexedConnection {
        redis::Client::open(self.url.as_str())
            .unwrap()
            .get_multiplexed_async_connection()
            .await
            .unwrap()
    }
}
