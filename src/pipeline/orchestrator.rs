// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::models::task::Task;
use crate::domain::models::{decode_record, Author, Media, Post, Source};
use crate::domain::repositories::record_repository::RecordRepository;
use crate::extractors::registry::extract_validated;
use crate::extractors::ExtractorRegistry;
use crate::pipeline::stage::{
    decode_args, CrawlAuthorArgs, DispatchArgs, ProcessMediaArgs, Stage, StageError, StageOutput,
    StoreMetadataArgs,
};
use crate::queue::task_queue::TaskQueue;

/// 流水线编排器
///
/// 每个工作进程构造一次，提取器注册表、记录仓库和任务队列在构造时注入
pub struct Pipeline {
    registry: Arc<ExtractorRegistry>,
    records: Arc<dyn RecordRepository>,
    queue: Arc<dyn TaskQueue>,
    max_retries: u32,
}

impl Pipeline {
    pub fn new(
        registry: Arc<ExtractorRegistry>,
        records: Arc<dyn RecordRepository>,
        queue: Arc<dyn TaskQueue>,
        max_retries: u32,
    ) -> Self {
        Self {
            registry,
            records,
            queue,
            max_retries,
        }
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// 执行任务对应的阶段
    ///
    /// # 参数
    ///
    /// * `task` - 已领取的任务
    ///
    /// # 返回值
    ///
    /// * `Ok(StageOutput)` - 阶段执行成功
    /// * `Err(StageError)` - 阶段失败，由调用方根据 `is_retryable` 决定重试或进入死信
    #[instrument(skip(self, task), fields(task_id = %task.id, stage = %task.name, attempt = task.attempt_count))]
    pub async fn execute(&self, task: &Task) -> Result<StageOutput, StageError> {
        match Stage::from_name(&task.name)? {
            Stage::CrawlAuthor => self.crawl_author(task.id, decode_args(task)?).await,
            Stage::ProcessRedditData => self.dispatch(task.id, decode_args(task)?).await,
            Stage::StoreMetadata => self.store_metadata(decode_args(task)?).await,
            Stage::ProcessMedia => self.process_media(decode_args(task)?).await,
        }
    }

    async fn enqueue_child<A: Serialize>(
        &self,
        stage: Stage,
        args: &A,
        parent_id: Uuid,
    ) -> Result<Task, StageError> {
        let task = stage.task(args, self.max_retries)?.with_parent(parent_id);
        Ok(self.queue.enqueue(task).await?)
    }

    /// 提取作者数据，有数据时分发给 dispatch 阶段
    pub async fn crawl_author(
        &self,
        task_id: Uuid,
        args: CrawlAuthorArgs,
    ) -> Result<StageOutput, StageError> {
        let source_type = self.registry.ensure_enabled(&args.source_type)?;
        let extractor = self.registry.resolve(source_type)?;
        let source = Source::new(args.author_name, args.date_start, source_type, args.limit)?;

        let result = match extract_validated(extractor.as_ref(), &source).await? {
            Some(result) if !result.is_empty() => result,
            _ => {
                info!(author = %source.author, "No data found");
                return Ok(StageOutput::NoData);
            }
        };

        let author_id = result.author.id.clone();
        let post_count = result.posts.len();
        let payloads = result.into_payloads()?;
        let dispatch = DispatchArgs {
            author: payloads.author,
            posts: payloads.posts,
            medias: payloads.medias,
        };
        self.enqueue_child(Stage::ProcessRedditData, &dispatch, task_id)
            .await?;

        info!(author_id = %author_id, posts = post_count, "Extraction dispatched");
        Ok(StageOutput::AuthorId(author_id))
    }

    /// 为元数据和每个媒体各分发一个任务，不等待子任务完成
    pub async fn dispatch(&self, task_id: Uuid, args: DispatchArgs) -> Result<StageOutput, StageError> {
        let metadata = StoreMetadataArgs {
            author: args.author,
            posts: args.posts,
        };
        self.enqueue_child(Stage::StoreMetadata, &metadata, task_id)
            .await?;

        let media_tasks = args.medias.len();
        for media in args.medias {
            self.enqueue_child(Stage::ProcessMedia, &ProcessMediaArgs { media }, task_id)
                .await?;
        }

        Ok(StageOutput::Dispatched {
            metadata_tasks: 1,
            media_tasks,
        })
    }

    /// 保存作者，再按顺序保存帖子
    ///
    /// 作者写入失败使整个阶段失败；单个帖子失败只记录日志并跳过
    pub async fn store_metadata(&self, args: StoreMetadataArgs) -> Result<StageOutput, StageError> {
        let author: Author = decode_record(args.author)?;
        self.records.store_author(&author).await?;

        let mut posts_stored = 0;
        let mut posts_skipped = 0;
        for (index, value) in args.posts.into_iter().enumerate() {
            let post: Post = match decode_record(value) {
                Ok(post) => post,
                Err(e) => {
                    warn!(index, "Skipping invalid post payload: {}", e);
                    posts_skipped += 1;
                    continue;
                }
            };
            match self.records.store_post(&post).await {
                Ok(()) => posts_stored += 1,
                Err(e) => {
                    warn!(post_id = %post.id, "Skipping post that failed to store: {}", e);
                    posts_skipped += 1;
                }
            }
        }

        Ok(StageOutput::MetadataStored {
            author_id: author.id,
            posts_stored,
            posts_skipped,
        })
    }

    /// 保存单个媒体
    pub async fn process_media(&self, args: ProcessMediaArgs) -> Result<StageOutput, StageError> {
        let media: Media = decode_record(args.media)?;
        let outcome = self.records.store_media(media).await?;

        if let Some(reason) = &outcome.download_error {
            warn!(media_id = %outcome.media.id, "Media stored without hosted url: {}", reason);
        }

        Ok(StageOutput::MediaStored {
            media_id: outcome.media.id,
            hosted_url: outcome.media.hosted_url,
        })
    }
}
