// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::models::task::Task;
use crate::infrastructure::observability::metrics::record_stage;
use crate::pipeline::{Pipeline, StageError};
use crate::queue::task_queue::{QueueError, TaskQueue};
use crate::utils::errors::WorkerError;
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::worker::Worker;

impl From<QueueError> for WorkerError {
    fn from(err: QueueError) -> Self {
        WorkerError::QueueError(err.to_string())
    }
}

/// 任务处理后的最终去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Completed,
    Retried,
    Failed,
    /// 租约已被重新投递，本次结果被丢弃
    Abandoned,
}

impl Disposition {
    fn label(&self) -> &'static str {
        match self {
            Disposition::Completed => "success",
            Disposition::Retried => "retry",
            Disposition::Failed => "failure",
            Disposition::Abandoned => "abandoned",
        }
    }
}

/// 阶段工作者
///
/// 从一个队列拉取任务并交给流水线执行，执行结束后才确认
pub struct StageWorker {
    worker_id: Uuid,
    name: String,
    queue_name: String,
    queue: Arc<dyn TaskQueue>,
    pipeline: Arc<Pipeline>,
    retry_policy: RetryPolicy,
    lease: Duration,
    poll_interval: Duration,
}

impl StageWorker {
    pub fn new(
        queue_name: impl Into<String>,
        queue: Arc<dyn TaskQueue>,
        pipeline: Arc<Pipeline>,
        retry_policy: RetryPolicy,
        lease: Duration,
        poll_interval: Duration,
    ) -> Self {
        let queue_name = queue_name.into();
        let worker_id = Uuid::new_v4();
        Self {
            worker_id,
            name: format!("{}-{}", queue_name, worker_id),
            queue_name,
            queue,
            pipeline,
            retry_policy,
            lease,
            poll_interval,
        }
    }

    /// 领取并处理一个任务
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Disposition))` - 处理了一个任务
    /// * `Ok(None)` - 队列为空
    /// * `Err(WorkerError)` - 队列操作失败
    pub async fn process_next(&self) -> Result<Option<Disposition>, WorkerError> {
        let Some(task) = self
            .queue
            .dequeue(&[self.queue_name.as_str()], self.lease)
            .await?
        else {
            return Ok(None);
        };

        Ok(Some(self.process_task(task).await?))
    }

    async fn process_task(&self, task: Task) -> Result<Disposition, WorkerError> {
        let started = Instant::now();
        let stage = task.name.clone();

        let outcome = match timeout(self.lease, self.pipeline.execute(&task)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(StageError::Timeout(self.lease)),
        };

        let task_id = task.id;
        let settled = match outcome {
            Ok(output) => {
                let label = output.outcome();
                self.queue
                    .complete(task, output.into_result())
                    .await
                    .map(|_| (Disposition::Completed, label))
            }
            Err(e) if e.is_retryable() && task.can_retry() => {
                let attempt = task.attempt_count + 1;
                let delay = self.retry_policy.calculate_backoff(attempt);
                warn!(
                    task_id = %task.id,
                    stage = %stage,
                    attempt,
                    "Stage failed, retrying in {:?}: {}",
                    delay,
                    e
                );
                self.queue
                    .retry(task, delay, e.to_string())
                    .await
                    .map(|_| (Disposition::Retried, Disposition::Retried.label()))
            }
            Err(e) => {
                error!(task_id = %task.id, stage = %stage, "Stage failed permanently: {}", e);
                self.queue
                    .fail(task, e.to_string())
                    .await
                    .map(|_| (Disposition::Failed, Disposition::Failed.label()))
            }
        };

        let (disposition, label) = match settled {
            Ok(settled) => settled,
            Err(QueueError::LeaseLost(_)) => {
                warn!(
                    task_id = %task_id,
                    stage = %stage,
                    "Lease lost before acknowledgement, outcome discarded"
                );
                (Disposition::Abandoned, Disposition::Abandoned.label())
            }
            Err(e) => return Err(e.into()),
        };

        record_stage(&stage, label, started.elapsed());
        Ok(disposition)
    }
}

#[async_trait]
impl Worker for StageWorker {
    async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), WorkerError> {
        info!("Stage worker {} started on queue {}", self.worker_id, self.queue_name);

        while !*shutdown.borrow() {
            let idle = match self.process_next().await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(e) => {
                    error!("Error processing task: {}", e);
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = sleep(self.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        info!("Stage worker {} stopped", self.worker_id);
        Ok(())
    }

    fn queue(&self) -> &str {
        &self.queue_name
    }

    fn name(&self) -> &str {
        &self.name
    }
}
