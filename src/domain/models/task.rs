// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::models::DomainError;
use crate::queue::routing::route_queue;

/// 任务实体
///
/// 任务队列中的一条消息：按注册名称路由到对应队列，
/// 携带 JSON 参数，并记录状态、重试次数和执行结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// 任务唯一标识符，也是状态查询使用的标识
    pub id: Uuid,
    /// 注册名称，格式为 `<queue>:<task>`
    pub name: String,
    /// 任务参数
    pub args: serde_json::Value,
    /// 任务状态
    pub status: TaskStatus,
    /// 已重试次数
    pub attempt_count: u32,
    /// 最大重试次数，超过后进入死信队列
    pub max_retries: u32,
    /// 最早可执行时间（重试延迟）
    pub eta: Option<DateTime<Utc>>,
    /// 派发该任务的父任务
    pub parent_id: Option<Uuid>,
    /// 成功时的结果值
    pub result: Option<serde_json::Value>,
    /// 最近一次错误信息
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// 租约过期时间，过期未确认的任务会被重新投递
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// 本次投递的令牌，每次领取都会更换；确认时据此判断是否仍持有租约
    #[serde(default)]
    pub delivery_id: Option<Uuid>,
}

/// 任务状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → Started → Success/Failure，
/// Started → Retry → Started …
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// 已入队，尚未被任何工作者领取
    #[default]
    Pending,
    /// 正在执行
    Started,
    /// 执行成功
    Success,
    /// 最终失败（不可重试或重试次数耗尽）
    Failure,
    /// 等待延迟重试
    Retry,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::Started => write!(f, "STARTED"),
            TaskStatus::Success => write!(f, "SUCCESS"),
            TaskStatus::Failure => write!(f, "FAILURE"),
            TaskStatus::Retry => write!(f, "RETRY"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "STARTED" => Ok(TaskStatus::Started),
            "SUCCESS" => Ok(TaskStatus::Success),
            "FAILURE" => Ok(TaskStatus::Failure),
            "RETRY" => Ok(TaskStatus::Retry),
            _ => Err(()),
        }
    }
}

impl Task {
    /// 创建一个新的任务
    ///
    /// # 参数
    ///
    /// * `name` - 注册名称
    /// * `args` - 任务参数
    /// * `max_retries` - 最大重试次数
    pub fn new(name: impl Into<String>, args: serde_json::Value, max_retries: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            args,
            status: TaskStatus::Pending,
            attempt_count: 0,
            max_retries,
            eta: None,
            parent_id: None,
            result: None,
            error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
            lease_expires_at: None,
            delivery_id: None,
        }
    }

    /// 设置父任务
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// 任务应投递到的队列
    pub fn queue(&self) -> &str {
        route_queue(&self.name)
    }

    /// 领取任务
    ///
    /// 将任务状态从 Pending/Retry 变更为 Started，并设置租约
    pub fn start(mut self, lease: Duration) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Pending | TaskStatus::Retry => {
                let now = Utc::now();
                self.status = TaskStatus::Started;
                self.started_at = Some(now);
                self.lease_expires_at = Some(now + lease);
                self.delivery_id = Some(Uuid::new_v4());
                self.updated_at = now;
                Ok(self)
            }
            other => Err(DomainError::InvalidStateTransition(other.to_string())),
        }
    }

    /// 完成任务
    pub fn succeed(mut self, result: Option<serde_json::Value>) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Started => {
                let now = Utc::now();
                self.status = TaskStatus::Success;
                self.result = result;
                self.error = None;
                self.completed_at = Some(now);
                self.lease_expires_at = None;
                self.updated_at = now;
                Ok(self)
            }
            other => Err(DomainError::InvalidStateTransition(other.to_string())),
        }
    }

    /// 安排延迟重试，参数保持不变
    pub fn schedule_retry(mut self, delay: Duration, error: String) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Started => {
                let now = Utc::now();
                self.status = TaskStatus::Retry;
                self.attempt_count += 1;
                self.eta = Some(now + delay);
                self.error = Some(error);
                self.started_at = None;
                self.lease_expires_at = None;
                self.updated_at = now;
                Ok(self)
            }
            other => Err(DomainError::InvalidStateTransition(other.to_string())),
        }
    }

    /// 标记任务最终失败
    pub fn fail(mut self, error: String) -> Result<Self, DomainError> {
        match self.status {
            TaskStatus::Started | TaskStatus::Pending | TaskStatus::Retry => {
                let now = Utc::now();
                self.status = TaskStatus::Failure;
                self.error = Some(error);
                self.completed_at = Some(now);
                self.lease_expires_at = None;
                self.updated_at = now;
                Ok(self)
            }
            other => Err(DomainError::InvalidStateTransition(other.to_string())),
        }
    }

    /// 租约过期后重新投递
    pub fn redeliver(mut self) -> Self {
        self.status = TaskStatus::Pending;
        self.started_at = None;
        self.lease_expires_at = None;
        self.delivery_id = None;
        self.updated_at = Utc::now();
        self
    }

    /// 判断任务是否还有重试额度
    pub fn can_retry(&self) -> bool {
        self.attempt_count < self.max_retries
    }

    /// 延迟时间是否已到
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.eta.is_none_or(|eta| eta <= now)
    }

    /// 调用方持有的投递是否就是当前记录中的投递
    ///
    /// 租约过期被重新投递后，旧投递的确认必须被拒绝
    pub fn holds_lease(&self, stored: &Task) -> bool {
        stored.status == TaskStatus::Started
            && stored.delivery_id.is_some()
            && stored.delivery_id == self.delivery_id
    }

    /// 是否已到达终态
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Success | TaskStatus::Failure)
    }

    /// 租约是否已过期
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Started && self.lease_expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task() -> Task {
        Task::new("crawling:crawl_author", json!({"author_name": "x"}), 3)
    }

    #[test]
    fn test_task_routes_by_name_prefix() {
        assert_eq!(task().queue(), "crawling");
        assert_eq!(Task::new("cleanup", json!({}), 0).queue(), "default");
    }

    #[test]
    fn test_task_lifecycle_happy_path() {
        let task = task().start(Duration::minutes(30)).unwrap();
        assert_eq!(task.status, TaskStatus::Started);
        assert!(task.lease_expires_at.is_some());

        let task = task.succeed(Some(json!("t2_x"))).unwrap();
        assert_eq!(task.status, TaskStatus::Success);
        assert_eq!(task.result, Some(json!("t2_x")));
        assert!(task.lease_expires_at.is_none());
    }

    #[test]
    fn test_retry_keeps_arguments_and_counts_attempts() {
        let original = task();
        let retried = original
            .clone()
            .start(Duration::minutes(30))
            .unwrap()
            .schedule_retry(Duration::seconds(60), "timeout".into())
            .unwrap();

        assert_eq!(retried.status, TaskStatus::Retry);
        assert_eq!(retried.args, original.args);
        assert_eq!(retried.attempt_count, 1);
        assert!(!retried.is_due(Utc::now()));
        assert!(retried.is_due(Utc::now() + Duration::seconds(61)));
        assert!(retried.can_retry());
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        assert!(task().succeed(None).is_err());
        let done = task().start(Duration::minutes(1)).unwrap().succeed(None).unwrap();
        assert!(done.clone().start(Duration::minutes(1)).is_err());
        assert!(done.fail("x".into()).is_err());
    }

    #[test]
    fn test_lease_expiry() {
        let task = task().start(Duration::seconds(10)).unwrap();
        assert!(!task.lease_expired(Utc::now()));
        assert!(task.lease_expired(Utc::now() + Duration::seconds(11)));
        assert_eq!(task.redeliver().status, TaskStatus::Pending);
    }

    #[test]
    fn test_each_delivery_gets_a_fresh_token() {
        let first = task().start(Duration::seconds(1)).unwrap();
        assert!(first.holds_lease(&first));

        let second = first.clone().redeliver().start(Duration::seconds(1)).unwrap();
        assert_ne!(first.delivery_id, second.delivery_id);
        assert!(!first.holds_lease(&second));
        assert!(second.holds_lease(&second));

        let done = second.clone().succeed(None).unwrap();
        assert!(!second.holds_lease(&done));
    }

    #[test]
    fn test_status_uses_upper_case_wire_names() {
        assert_eq!(serde_json::to_value(TaskStatus::Retry).unwrap(), json!("RETRY"));
        assert_eq!("SUCCESS".parse::<TaskStatus>(), Ok(TaskStatus::Success));
    }
}
