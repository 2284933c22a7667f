// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Direction, Script};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::models::task::Task;
use crate::queue::routing::ALL_QUEUES;
use crate::queue::task_queue::{chrono_duration, QueueError, TaskQueue, DEFAULT_RESULT_TTL};

/// Redis 任务队列
///
/// 键布局：
/// - `{ns}:task:{id}` 任务记录（JSON），同时作为状态查询的结果后端
/// - `{ns}:queue:{queue}` 就绪列表
/// - `{ns}:processing:{queue}` 在途列表，由 `LMOVE` 原子写入
/// - `{ns}:delayed` 延迟重试的有序集合，分值为 eta 时间戳
/// - `{ns}:dead_letter` 死信列表
///
/// 确认和重新投递都通过 [`TRANSITION_SCRIPT`] 按投递令牌比较后原子写入；
/// 成功任务的记录带 `result_ttl` 过期时间。
#[derive(Clone)]
pub struct RedisTaskQueue {
    connection: MultiplexedConnection,
    namespace: String,
    result_ttl: Duration,
    transition: Script,
}

/// 比较投递令牌后写入任务记录并移动队列条目
///
/// KEYS: 任务记录、在途列表、目标集合
/// ARGV: 期望的投递令牌、新记录、任务 ID、动作、ZSET 分值、过期秒数
///
/// 返回 1 表示已写入，0 表示投递已失效，-1 表示记录不存在
const TRANSITION_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return -1
end
local stored = cjson.decode(current)
if stored['status'] ~= 'STARTED' or stored['delivery_id'] ~= ARGV[1] then
    return 0
end
local removed = redis.call('LREM', KEYS[2], 1, ARGV[3])
local action = ARGV[4]
if action == 'requeue' and removed == 0 then
    return 0
end
local ttl = tonumber(ARGV[6])
if ttl > 0 then
    redis.call('SET', KEYS[1], ARGV[2], 'EX', ttl)
else
    redis.call('SET', KEYS[1], ARGV[2])
end
if action == 'delay' then
    redis.call('ZADD', KEYS[3], ARGV[5], ARGV[3])
elseif action == 'dead_letter' or action == 'requeue' then
    redis.call('LPUSH', KEYS[3], ARGV[3])
end
return 1
"#;

/// 在途任务离开在途列表后的去向
enum Step {
    /// 成功，记录按保留时长过期
    Ack,
    /// 进入延迟集合，分值为 eta
    Delay(DateTime<Utc>),
    DeadLetter,
    /// 租约过期，回到就绪队列
    Requeue,
}

impl RedisTaskQueue {
    /// 连接 Redis 并创建任务队列
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    /// * `namespace` - 键名前缀
    pub async fn connect(redis_url: &str, namespace: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            connection,
            namespace: namespace.to_string(),
            result_ttl: DEFAULT_RESULT_TTL,
            transition: Script::new(TRANSITION_SCRIPT),
        })
    }

    /// 设置成功任务记录的保留时长，为零时永久保留
    pub fn with_result_ttl(mut self, result_ttl: Duration) -> Self {
        self.result_ttl = result_ttl;
        self
    }

    fn task_key(&self, task_id: Uuid) -> String {
        format!("{}:task:{}", self.namespace, task_id)
    }

    fn ready_key(&self, queue: &str) -> String {
        format!("{}:queue:{}", self.namespace, queue)
    }

    fn processing_key(&self, queue: &str) -> String {
        format!("{}:processing:{}", self.namespace, queue)
    }

    fn delayed_key(&self) -> String {
        format!("{}:delayed", self.namespace)
    }

    fn dead_letter_key(&self) -> String {
        format!("{}:dead_letter", self.namespace)
    }

    async fn load(&self, task_id: Uuid) -> Result<Option<Task>, QueueError> {
        let mut con = self.connection.clone();
        let raw: Option<String> = con.get(self.task_key(task_id)).await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(QueueError::from)
    }

    async fn save(&self, task: &Task) -> Result<(), QueueError> {
        let mut con = self.connection.clone();
        let json = serde_json::to_string(task)?;
        con.set::<_, _, ()>(self.task_key(task.id), json).await?;
        Ok(())
    }

    /// 以 `held` 的投递令牌为条件，把任务记录替换为 `next` 并移动队列条目
    async fn transition(&self, held: &Task, next: &Task, step: Step) -> Result<(), QueueError> {
        let (action, target, score, ttl) = match step {
            Step::Ack => ("ack", self.delayed_key(), 0, self.result_ttl.as_secs()),
            Step::Delay(eta) => ("delay", self.delayed_key(), eta.timestamp_millis(), 0),
            Step::DeadLetter => ("dead_letter", self.dead_letter_key(), 0, 0),
            Step::Requeue => ("requeue", self.ready_key(next.queue()), 0, 0),
        };
        let expected = held.delivery_id.map(|id| id.to_string()).unwrap_or_default();
        let json = serde_json::to_string(next)?;

        let mut con = self.connection.clone();
        let outcome: i64 = self
            .transition
            .key(self.task_key(next.id))
            .key(self.processing_key(next.queue()))
            .key(target)
            .arg(expected)
            .arg(json)
            .arg(next.id.to_string())
            .arg(action)
            .arg(score)
            .arg(ttl)
            .invoke_async(&mut con)
            .await?;

        match outcome {
            1 => Ok(()),
            0 => Err(QueueError::LeaseLost(next.id)),
            _ => Err(QueueError::NotFound(next.id)),
        }
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn enqueue(&self, task: Task) -> Result<Task, QueueError> {
        let mut con = self.connection.clone();
        let json = serde_json::to_string(&task)?;
        let id = task.id.to_string();

        let mut pipe = redis::pipe();
        pipe.atomic().set(self.task_key(task.id), json).ignore();
        match task.eta.filter(|eta| *eta > Utc::now()) {
            Some(eta) => pipe.zadd(self.delayed_key(), &id, eta.timestamp_millis()).ignore(),
            None => pipe.lpush(self.ready_key(task.queue()), &id).ignore(),
        };
        pipe.query_async::<()>(&mut con).await?;

        debug!(task_id = %task.id, queue = task.queue(), "Task enqueued");
        Ok(task)
    }

    async fn dequeue(&self, queues: &[&str], lease: Duration) -> Result<Option<Task>, QueueError> {
        let mut con = self.connection.clone();
        for queue in queues {
            let moved: Option<String> = con
                .lmove(
                    self.ready_key(queue),
                    self.processing_key(queue),
                    Direction::Right,
                    Direction::Left,
                )
                .await?;
            let Some(raw_id) = moved else { continue };

            let task = match Uuid::parse_str(&raw_id) {
                Ok(task_id) => self.load(task_id).await?,
                Err(_) => None,
            };
            let Some(task) = task else {
                warn!(queue, task_id = %raw_id, "Dropping queue entry without task record");
                con.lrem::<_, _, ()>(self.processing_key(queue), 1, &raw_id)
                    .await?;
                continue;
            };

            let started = task.start(chrono_duration(lease))?;
            self.save(&started).await?;
            return Ok(Some(started));
        }
        Ok(None)
    }

    async fn complete(
        &self,
        task: Task,
        result: Option<serde_json::Value>,
    ) -> Result<Task, QueueError> {
        let done = task.clone().succeed(result)?;
        self.transition(&task, &done, Step::Ack).await?;
        Ok(done)
    }

    async fn retry(&self, task: Task, delay: Duration, error: String) -> Result<Task, QueueError> {
        let retried = task.clone().schedule_retry(chrono_duration(delay), error)?;
        let eta = retried.eta.unwrap_or_else(Utc::now);
        self.transition(&task, &retried, Step::Delay(eta)).await?;
        Ok(retried)
    }

    async fn fail(&self, task: Task, error: String) -> Result<Task, QueueError> {
        let failed = task.clone().fail(error)?;
        self.transition(&task, &failed, Step::DeadLetter).await?;
        Ok(failed)
    }

    async fn find(&self, task_id: Uuid) -> Result<Option<Task>, QueueError> {
        self.load(task_id).await
    }

    async fn promote_due(&self, now: DateTime<Utc>) -> Result<usize, QueueError> {
        let mut con = self.connection.clone();
        let due: Vec<String> = con
            .zrangebyscore(self.delayed_key(), "-inf", now.timestamp_millis())
            .await?;

        let mut promoted = 0;
        for raw_id in due {
            // ZREM 返回 1 的调用方才负责入队，避免多个调度器重复投递
            let removed: i64 = con.zrem(self.delayed_key(), &raw_id).await?;
            if removed == 0 {
                continue;
            }
            let Ok(task_id) = Uuid::parse_str(&raw_id) else {
                continue;
            };
            if let Some(task) = self.load(task_id).await? {
                con.lpush::<_, _, ()>(self.ready_key(task.queue()), &raw_id)
                    .await?;
                promoted += 1;
            }
        }
        Ok(promoted)
    }

    async fn reclaim_expired(&self, now: DateTime<Utc>) -> Result<usize, QueueError> {
        let mut con = self.connection.clone();
        let mut reclaimed = 0;

        for queue in ALL_QUEUES {
            let in_flight: Vec<String> = con.lrange(self.processing_key(queue), 0, -1).await?;
            for raw_id in in_flight {
                let Ok(task_id) = Uuid::parse_str(&raw_id) else {
                    continue;
                };
                let Some(task) = self.load(task_id).await? else {
                    continue;
                };
                if !task.lease_expired(now) {
                    continue;
                }

                let redelivered = task.clone().redeliver();
                match self.transition(&task, &redelivered, Step::Requeue).await {
                    Ok(()) => {
                        warn!(task_id = %task.id, queue, "Lease expired, task redelivered");
                        reclaimed += 1;
                    }
                    // 已被确认或已被其他调度器重新投递
                    Err(QueueError::LeaseLost(_)) | Err(QueueError::NotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(reclaimed)
    }

    async fn dead_letters(&self) -> Result<Vec<Task>, QueueError> {
        let mut con = self.connection.clone();
        let ids: Vec<String> = con.lrange(self.dead_letter_key(), 0, -1).await?;
        let mut tasks = Vec::with_capacity(ids.len());
        for raw_id in ids {
            if let Ok(task_id) = Uuid::parse_str(&raw_id) {
                if let Some(task) = self.load(task_id).await? {
                    tasks.push(task);
                }
            }
        }
        Ok(tasks)
    }
}
