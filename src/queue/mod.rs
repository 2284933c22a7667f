// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 提供任务队列和调度功能
/// 负责任务的路由、排队、延迟重试、死信和租约维护
pub mod memory_queue;
pub mod redis_queue;
pub mod routing;
pub mod scheduler;
pub mod task_queue;

use std::sync::Arc;

use crate::config::settings::Settings;
use crate::utils::errors::ConfigurationError;
use memory_queue::InMemoryTaskQueue;
use redis_queue::RedisTaskQueue;
use task_queue::TaskQueue;

/// 按配置创建任务队列
pub async fn create_task_queue(settings: &Settings) -> anyhow::Result<Arc<dyn TaskQueue>> {
    match settings.queue.backend.as_str() {
        "redis" => {
            let queue = RedisTaskQueue::connect(&settings.redis.url, &settings.redis.namespace)
                .await?
                .with_result_ttl(settings.queue.result_ttl());
            Ok(Arc::new(queue))
        }
        "memory" => Ok(Arc::new(InMemoryTaskQueue::with_result_ttl(
            settings.queue.result_ttl(),
        ))),
        other => Err(ConfigurationError::UnsupportedQueue(other.to_string()).into()),
    }
}
