// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::Task;
use crate::domain::models::DomainError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// Redis 错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// 任务序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 非法的状态转换
    #[error("Task state error: {0}")]
    State(#[from] DomainError),

    /// 任务不存在
    #[error("Task not found: {0}")]
    NotFound(Uuid),

    /// 调用方的投递已失效（租约过期后被重新投递或已确认）
    #[error("Lease lost for task: {0}")]
    LeaseLost(Uuid),
}

/// 任务队列特质
///
/// 至少一次投递：任务被领取后进入在途集合，只有执行结束后
/// 调用 `complete`/`retry`/`fail` 才会离开；租约过期的在途任务
/// 会被 `reclaim_expired` 重新投递。确认操作只接受当前投递，
/// 旧投递的确认返回 [`QueueError::LeaseLost`]。
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// 入队任务，按名称前缀路由
    async fn enqueue(&self, task: Task) -> Result<Task, QueueError>;

    /// 从给定队列中领取一个任务
    async fn dequeue(&self, queues: &[&str], lease: Duration) -> Result<Option<Task>, QueueError>;

    /// 确认任务成功
    async fn complete(
        &self,
        task: Task,
        result: Option<serde_json::Value>,
    ) -> Result<Task, QueueError>;

    /// 以相同参数延迟重新入队
    async fn retry(&self, task: Task, delay: Duration, error: String) -> Result<Task, QueueError>;

    /// 标记任务最终失败并放入死信队列
    async fn fail(&self, task: Task, error: String) -> Result<Task, QueueError>;

    /// 查询任务
    async fn find(&self, task_id: Uuid) -> Result<Option<Task>, QueueError>;

    /// 将到期的延迟任务移回就绪队列
    async fn promote_due(&self, now: DateTime<Utc>) -> Result<usize, QueueError>;

    /// 重新投递租约已过期的在途任务
    async fn reclaim_expired(&self, now: DateTime<Utc>) -> Result<usize, QueueError>;

    /// 死信队列中的任务
    async fn dead_letters(&self) -> Result<Vec<Task>, QueueError>;
}

/// 成功任务记录的默认保留时长
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub(crate) fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[async_trait]
impl<T: TaskQueue + ?Sized> TaskQueue for Arc<T> {
    async fn enqueue(&self, task: Task) -> Result<Task, QueueError> {
        (**self).enqueue(task).await
    }

    async fn dequeue(&self, queues: &[&str], lease: Duration) -> Result<Option<Task>, QueueError> {
        (**self).dequeue(queues, lease).await
    }

    async fn complete(
        &self,
        task: Task,
        result: Option<serde_json::Value>,
    ) -> Result<Task, QueueError> {
        (**self).complete(task, result).await
    }

    async fn retry(&self, task: Task, delay: Duration, error: String) -> Result<Task, QueueError> {
        (**self).retry(task, delay, error).await
    }

    async fn fail(&self, task: Task, error: String) -> Result<Task, QueueError> {
        (**self).fail(task, error).await
    }

    async fn find(&self, task_id: Uuid) -> Result<Option<Task>, QueueError> {
        (**self).find(task_id).await
    }

    async fn promote_due(&self, now: DateTime<Utc>) -> Result<usize, QueueError> {
        (**self).promote_due(now).await
    }

    async fn reclaim_expired(&self, now: DateTime<Utc>) -> Result<usize, QueueError> {
        (**self).reclaim_expired(now).await
    }

    async fn dead_letters(&self) -> Result<Vec<Task>, QueueError> {
        (**self).dead_letters().await
    }
}
