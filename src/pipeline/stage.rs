// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

use crate::domain::models::task::Task;
use crate::domain::models::{decode_record, DomainError, Source};
use crate::domain::repositories::storage_repository::StorageError;
use crate::extractors::ExtractionError;
use crate::queue::routing::route_queue;
use crate::queue::task_queue::QueueError;
use crate::utils::errors::ConfigurationError;

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// 提取作者数据
    CrawlAuthor,
    /// 拆分提取结果并分发存储任务
    ProcessRedditData,
    /// 保存作者和帖子
    StoreMetadata,
    /// 保存单个媒体
    ProcessMedia,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::CrawlAuthor,
        Stage::ProcessRedditData,
        Stage::StoreMetadata,
        Stage::ProcessMedia,
    ];

    /// 注册名称，`:` 之前为目标队列
    pub fn name(&self) -> &'static str {
        match self {
            Stage::CrawlAuthor => "crawling:crawl_author",
            Stage::ProcessRedditData => "processing:process_reddit_data",
            Stage::StoreMetadata => "storage:store_metadata",
            Stage::ProcessMedia => "media:process_media",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.name() == name)
            .ok_or_else(|| ConfigurationError::UnknownStage(name.to_string()))
    }

    pub fn queue(&self) -> &'static str {
        route_queue(self.name())
    }

    /// 构造携带给定参数的任务
    pub fn task<A: Serialize>(&self, args: &A, max_retries: u32) -> Result<Task, DomainError> {
        Ok(Task::new(self.name(), serde_json::to_value(args)?, max_retries))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn default_limit() -> u32 {
    Source::DEFAULT_LIMIT
}

/// crawl 阶段参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CrawlAuthorArgs {
    #[validate(length(min = 1, message = "author_name cannot be empty"))]
    pub author_name: String,
    pub date_start: DateTime<Utc>,
    pub source_type: String,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, message = "limit must be positive"))]
    pub limit: u32,
}

/// dispatch 阶段参数，三部分均为普通 JSON 映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DispatchArgs {
    pub author: Value,
    pub posts: Vec<Value>,
    pub medias: Vec<Value>,
}

/// store-metadata 阶段参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StoreMetadataArgs {
    pub author: Value,
    pub posts: Vec<Value>,
}

/// store-media 阶段参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProcessMediaArgs {
    pub media: Value,
}

/// 解析任务参数
pub fn decode_args<A: DeserializeOwned + Validate>(task: &Task) -> Result<A, DomainError> {
    decode_record(task.args.clone())
}

/// 阶段执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    /// 提取成功，结果为作者 ID
    AuthorId(String),
    /// 没有可提取的数据
    NoData,
    Dispatched {
        metadata_tasks: usize,
        media_tasks: usize,
    },
    MetadataStored {
        author_id: String,
        posts_stored: usize,
        posts_skipped: usize,
    },
    MediaStored {
        media_id: String,
        hosted_url: Option<String>,
    },
}

impl StageOutput {
    /// 指标中的结果标签
    pub fn outcome(&self) -> &'static str {
        match self {
            StageOutput::NoData => "no_data",
            _ => "success",
        }
    }

    /// 转换为任务结果，`NoData` 对应空结果
    pub fn into_result(self) -> Option<Value> {
        match self {
            StageOutput::AuthorId(author_id) => Some(Value::String(author_id)),
            StageOutput::NoData => None,
            StageOutput::Dispatched {
                metadata_tasks,
                media_tasks,
            } => Some(json!({
                "metadata_tasks": metadata_tasks,
                "media_tasks": media_tasks,
            })),
            StageOutput::MetadataStored {
                author_id,
                posts_stored,
                posts_skipped,
            } => Some(json!({
                "author_id": author_id,
                "posts_stored": posts_stored,
                "posts_skipped": posts_skipped,
            })),
            StageOutput::MediaStored {
                media_id,
                hosted_url,
            } => Some(json!({
                "media_id": media_id,
                "hosted_url": hosted_url,
            })),
        }
    }
}

/// 阶段错误
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid payload: {0}")]
    Payload(#[from] DomainError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("Stage exceeded its lease of {0:?}")]
    Timeout(Duration),
}

impl StageError {
    /// 配置错误、负载错误和非法存储键不会因重试而恢复
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            StageError::Configuration(_)
                | StageError::Payload(_)
                | StageError::Storage(StorageError::InvalidKey(_))
        )
    }
}
