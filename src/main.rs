// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use postharvest::application::use_cases::crawl_use_case::{SubmitCrawlUseCase, TaskStatusUseCase};
use postharvest::config::settings::Settings;
use postharvest::domain::repositories::record_repository::RecordRepository;
use postharvest::engines::chromium_engine::ChromiumEngine;
use postharvest::engines::traits::BrowserEngine;
use postharvest::extractors::ExtractorRegistry;
use postharvest::infrastructure::media::MediaDownloader;
use postharvest::infrastructure::observability::metrics::init_metrics;
use postharvest::infrastructure::record_store::ParquetRecordStore;
use postharvest::infrastructure::storage::create_object_store;
use postharvest::pipeline::Pipeline;
use postharvest::presentation::routes;
use postharvest::queue::create_task_queue;
use postharvest::queue::scheduler::TaskScheduler;
use postharvest::utils::telemetry;
use postharvest::workers::manager::WorkerManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting postharvest...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    init_metrics(&settings.metrics)?;

    // 3. Storage
    let object_store = create_object_store(&settings.storage)?;
    let downloader = MediaDownloader::new(Duration::from_secs(settings.media.download_timeout_secs))?;
    let records: Arc<dyn RecordRepository> = Arc::new(ParquetRecordStore::new(
        object_store,
        downloader,
        &settings.storage,
    ));
    records.setup_buckets().await?;

    // 4. Extractors
    let engine: Arc<dyn BrowserEngine> = Arc::new(ChromiumEngine::new(settings.browser.clone()));
    let registry = Arc::new(ExtractorRegistry::from_settings(&settings.extractors, engine)?);
    info!("Enabled extractors: {:?}", registry.enabled_types());

    // 5. Task queue
    let queue = create_task_queue(&settings).await?;
    let scheduler = TaskScheduler::new(queue.clone(), settings.queue.maintenance_interval()).start();

    // 6. Start workers
    let pipeline = Arc::new(Pipeline::new(
        registry.clone(),
        records,
        queue.clone(),
        settings.queue.max_retries,
    ));
    let mut worker_manager = WorkerManager::new(
        queue.clone(),
        pipeline,
        settings.queue.retry_policy(),
        settings.queue.visibility_timeout(),
        settings.queue.poll_interval(),
    );
    for (queue_name, count) in settings.workers.per_queue() {
        worker_manager.start_workers(queue_name, count);
    }

    // 7. Start HTTP server
    let app = routes::create_app(
        Arc::new(SubmitCrawlUseCase::new(
            queue.clone(),
            registry,
            settings.queue.max_retries,
        )),
        Arc::new(TaskStatusUseCase::new(queue)),
    );

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    worker_manager
        .wait_for_shutdown(settings.workers.shutdown_grace())
        .await;
    scheduler.abort();
    server.abort();

    Ok(())
}
