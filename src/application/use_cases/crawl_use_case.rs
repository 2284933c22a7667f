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

use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::crawl_request::{SubmitCrawlRequestDto, TaskStatusResponseDto};
use crate::domain::models::task::Task;
use crate::domain::models::{DomainError, Source};
use crate::extractors::ExtractorRegistry;
use crate::pipeline::stage::CrawlAuthorArgs;
use crate::pipeline::Stage;
use crate::queue::task_queue::{QueueError, TaskQueue};
use crate::utils::errors::ConfigurationError;

#[derive(Error, Debug)]
pub enum CrawlUseCaseError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("Task not found: {0}")]
    NotFound(Uuid),
}

impl From<DomainError> for CrawlUseCaseError {
    fn from(err: DomainError) -> Self {
        CrawlUseCaseError::ValidationError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CrawlUseCaseError {
    fn from(err: validator::ValidationErrors) -> Self {
        CrawlUseCaseError::ValidationError(err.to_string())
    }
}

/// 提交爬取请求用例
///
/// 校验请求、确认数据源已启用，然后把 crawl 阶段任务放入队列
pub struct SubmitCrawlUseCase {
    queue: Arc<dyn TaskQueue>,
    registry: Arc<ExtractorRegistry>,
    max_retries: u32,
}

impl SubmitCrawlUseCase {
    pub fn new(queue: Arc<dyn TaskQueue>, registry: Arc<ExtractorRegistry>, max_retries: u32) -> Self {
        Self {
            queue,
            registry,
            max_retries,
        }
    }

    /// 提交爬取请求
    ///
    /// # 参数
    ///
    /// * `request` - 爬取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(Task)` - 已入队的 crawl 任务
    /// * `Err(CrawlUseCaseError)` - 请求无效、数据源未启用或入队失败
    pub async fn execute(&self, request: SubmitCrawlRequestDto) -> Result<Task, CrawlUseCaseError> {
        request.validate()?;
        let source_type = self.registry.ensure_enabled(&request.source_type)?;

        let date_start = Utc::now() - Duration::days(i64::from(request.lookback_days()));
        let source = Source::new(
            request.author_name.as_str(),
            date_start,
            source_type,
            request.limit.unwrap_or(Source::DEFAULT_LIMIT),
        )?;

        let args = CrawlAuthorArgs {
            author_name: source.author,
            date_start: source.date_start,
            source_type: source.source_type.key().to_string(),
            limit: source.limit,
        };
        let task = self
            .queue
            .enqueue(Stage::CrawlAuthor.task(&args, self.max_retries)?)
            .await?;

        info!(task_id = %task.id, author = %args.author_name, "Crawl submitted");
        Ok(task)
    }
}

/// 任务状态查询用例
pub struct TaskStatusUseCase {
    queue: Arc<dyn TaskQueue>,
}

impl TaskStatusUseCase {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self { queue }
    }

    pub async fn execute(&self, task_id: Uuid) -> Result<TaskStatusResponseDto, CrawlUseCaseError> {
        let task = self
            .queue
            .find(task_id)
            .await?
            .ok_or(CrawlUseCaseError::NotFound(task_id))?;
        Ok(task.into())
    }
}
