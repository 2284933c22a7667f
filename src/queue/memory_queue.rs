// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::task::Task;
use crate::queue::task_queue::{chrono_duration, QueueError, TaskQueue, DEFAULT_RESULT_TTL};

#[derive(Default)]
struct QueueState {
    tasks: HashMap<Uuid, Task>,
    ready: HashMap<String, VecDeque<Uuid>>,
    in_flight: HashSet<Uuid>,
    delayed: HashSet<Uuid>,
    dead_letter: Vec<Uuid>,
    /// 成功任务记录的过期时间
    expiring: HashMap<Uuid, DateTime<Utc>>,
}

impl QueueState {
    fn push_ready(&mut self, task: &Task) {
        self.ready
            .entry(task.queue().to_string())
            .or_default()
            .push_back(task.id);
    }

    /// 确认调用方仍持有当前投递
    fn check_lease(&self, task: &Task) -> Result<(), QueueError> {
        let stored = self
            .tasks
            .get(&task.id)
            .ok_or(QueueError::NotFound(task.id))?;
        if task.holds_lease(stored) {
            Ok(())
        } else {
            Err(QueueError::LeaseLost(task.id))
        }
    }

    fn prune_results(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<Uuid> = self
            .expiring
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.expiring.remove(id);
            self.tasks.remove(id);
        }
        expired.len()
    }
}

/// 进程内任务队列
///
/// 与 Redis 实现语义相同，用于单进程运行和测试。
/// 成功任务的记录在 `result_ttl` 之后由 `promote_due` 清理（为零时永久保留），
/// 失败任务保留在死信队列中。
pub struct InMemoryTaskQueue {
    state: Mutex<QueueState>,
    result_ttl: Duration,
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::with_result_ttl(DEFAULT_RESULT_TTL)
    }
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建指定成功记录保留时长的队列
    pub fn with_result_ttl(result_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            result_ttl,
        }
    }

    /// 当前保存的任务记录数
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 就绪队列长度
    pub fn ready_len(&self, queue: &str) -> usize {
        self.state.lock().ready.get(queue).map_or(0, VecDeque::len)
    }

    /// 按注册名称查询所有任务，按创建时间排序
    pub fn tasks_named(&self, name: &str) -> Vec<Task> {
        let state = self.state.lock();
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.name == name)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task: Task) -> Result<Task, QueueError> {
        let mut state = self.state.lock();
        if task.is_due(Utc::now()) {
            state.push_ready(&task);
        } else {
            state.delayed.insert(task.id);
        }
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn dequeue(&self, queues: &[&str], lease: Duration) -> Result<Option<Task>, QueueError> {
        let mut state = self.state.lock();
        for queue in queues {
            let next = state.ready.get_mut(*queue).and_then(VecDeque::pop_front);
            let Some(task_id) = next else { continue };
            let Some(task) = state.tasks.get(&task_id).cloned() else {
                continue;
            };

            let started = task.start(chrono_duration(lease))?;
            state.in_flight.insert(task_id);
            state.tasks.insert(task_id, started.clone());
            return Ok(Some(started));
        }
        Ok(None)
    }

    async fn complete(
        &self,
        task: Task,
        result: Option<serde_json::Value>,
    ) -> Result<Task, QueueError> {
        let mut state = self.state.lock();
        state.check_lease(&task)?;
        let done = task.succeed(result)?;
        state.in_flight.remove(&done.id);
        if !self.result_ttl.is_zero() {
            let completed_at = done.completed_at.unwrap_or_else(Utc::now);
            let expires_at = completed_at + chrono_duration(self.result_ttl);
            state.expiring.insert(done.id, expires_at);
        }
        state.tasks.insert(done.id, done.clone());
        Ok(done)
    }

    async fn retry(&self, task: Task, delay: Duration, error: String) -> Result<Task, QueueError> {
        let mut state = self.state.lock();
        state.check_lease(&task)?;
        let retried = task.schedule_retry(chrono_duration(delay), error)?;
        state.in_flight.remove(&retried.id);
        state.delayed.insert(retried.id);
        state.tasks.insert(retried.id, retried.clone());
        Ok(retried)
    }

    async fn fail(&self, task: Task, error: String) -> Result<Task, QueueError> {
        let mut state = self.state.lock();
        state.check_lease(&task)?;
        let failed = task.fail(error)?;
        state.in_flight.remove(&failed.id);
        state.dead_letter.push(failed.id);
        state.tasks.insert(failed.id, failed.clone());
        Ok(failed)
    }

    async fn find(&self, task_id: Uuid) -> Result<Option<Task>, QueueError> {
        Ok(self.state.lock().tasks.get(&task_id).cloned())
    }

    async fn promote_due(&self, now: DateTime<Utc>) -> Result<usize, QueueError> {
        let mut state = self.state.lock();
        let due: Vec<Task> = state
            .delayed
            .iter()
            .filter_map(|id| state.tasks.get(id))
            .filter(|task| task.is_due(now))
            .cloned()
            .collect();

        for task in &due {
            state.delayed.remove(&task.id);
            state.push_ready(task);
        }

        let pruned = state.prune_results(now);
        if pruned > 0 {
            debug!(pruned, "Expired task results removed");
        }
        Ok(due.len())
    }

    async fn reclaim_expired(&self, now: DateTime<Utc>) -> Result<usize, QueueError> {
        let mut state = self.state.lock();
        let expired: Vec<Task> = state
            .in_flight
            .iter()
            .filter_map(|id| state.tasks.get(id))
            .filter(|task| task.lease_expired(now))
            .cloned()
            .collect();

        for task in expired.iter().cloned() {
            state.in_flight.remove(&task.id);
            let task = task.redeliver();
            state.push_ready(&task);
            state.tasks.insert(task.id, task);
        }
        Ok(expired.len())
    }

    async fn dead_letters(&self) -> Result<Vec<Task>, QueueError> {
        let state = self.state.lock();
        Ok(state
            .dead_letter
            .iter()
            .filter_map(|id| state.tasks.get(id).cloned())
            .collect())
    }
}
