// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::WorkerError;
use async_trait::async_trait;
use tokio::sync::watch;

/// 队列消费者
///
/// 每次只处理一个任务；收到停止信号后处理完当前任务再返回，
/// 不会丢下未确认的任务。
#[async_trait]
pub trait Worker: Send + Sync {
    /// 持续消费直到 `shutdown` 变为 `true`
    async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), WorkerError>;

    /// 消费的队列名称
    fn queue(&self) -> &str;

    fn name(&self) -> &str;
}
