// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::pipeline::Pipeline;
use crate::queue::task_queue::TaskQueue;
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::stage_worker::StageWorker;
use crate::workers::worker::Worker;

/// 工作管理器
///
/// 为每个队列启动固定数量的阶段工作者，并负责优雅停止
pub struct WorkerManager {
    queue: Arc<dyn TaskQueue>,
    pipeline: Arc<Pipeline>,
    retry_policy: RetryPolicy,
    lease: Duration,
    poll_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl WorkerManager {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        pipeline: Arc<Pipeline>,
        retry_policy: RetryPolicy,
        lease: Duration,
        poll_interval: Duration,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            queue,
            pipeline,
            retry_policy,
            lease,
            poll_interval,
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// 在指定队列上启动工作者
    ///
    /// # 参数
    ///
    /// * `queue_name` - 工作者消费的队列
    /// * `count` - 要启动的工作者数量
    pub fn start_workers(&mut self, queue_name: &str, count: usize) {
        for _ in 0..count {
            let worker = StageWorker::new(
                queue_name,
                self.queue.clone(),
                self.pipeline.clone(),
                self.retry_policy.clone(),
                self.lease,
                self.poll_interval,
            );
            self.spawn(worker);
        }
        if count > 0 {
            info!("Started {} worker(s) on queue {}", count, queue_name);
        }
    }

    fn spawn<W: Worker + 'static>(&mut self, worker: W) {
        let name = worker.name().to_string();
        let shutdown = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            if let Err(e) = worker.run(shutdown).await {
                error!("Worker {} on queue {} stopped: {}", worker.name(), worker.queue(), e);
            }
        });
        self.handles.push((name, handle));
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// 通知所有工作者停止，并在宽限期内等待当前任务结束
    ///
    /// 超过宽限期仍未结束的工作者会被中止，其任务在租约过期后重新投递
    pub async fn shutdown(&mut self, grace: Duration) {
        info!("Shutting down {} worker(s)...", self.handles.len());
        self.shutdown_tx.send_replace(true);

        for (name, mut handle) in self.handles.drain(..) {
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                warn!("Worker {} did not stop within {:?}, aborting", name, grace);
                handle.abort();
            }
        }
        info!("Workers shut down successfully");
    }

    /// 等待关闭信号并关闭工作者
    pub async fn wait_for_shutdown(&mut self, grace: Duration) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        self.shutdown(grace).await;
    }
}
