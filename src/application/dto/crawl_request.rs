// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::task::{Task, TaskStatus};

/// 默认回溯天数
pub const DEFAULT_LOOKBACK_DAYS: u32 = 21;

/// 提交爬取请求数据传输对象
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SubmitCrawlRequestDto {
    /// 数据源类型，如 `reddit`
    #[validate(length(min = 1, message = "source_type cannot be empty"))]
    pub source_type: String,
    /// 作者名称
    #[validate(length(min = 1, message = "author_name cannot be empty"))]
    pub author_name: String,
    /// 回溯天数，用于计算起始时间
    #[validate(range(min = 1, max = 365, message = "lookback_days must be between 1 and 365"))]
    pub lookback_days: Option<u32>,
    /// 最多提取的帖子数
    #[validate(range(min = 1, message = "limit must be positive"))]
    pub limit: Option<u32>,
}

impl SubmitCrawlRequestDto {
    pub fn lookback_days(&self) -> u32 {
        self.lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS)
    }
}

/// 提交爬取响应
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SubmitCrawlResponseDto {
    pub task_id: Uuid,
}

/// 任务状态响应
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TaskStatusResponseDto {
    pub task_id: Uuid,
    pub status: TaskStatus,
    /// 成功时为阶段结果，无数据时为空
    pub result: Option<Value>,
    /// 失败或重试时的错误信息
    pub error: Option<String>,
    /// 已重试次数
    pub attempts: u32,
}

impl From<Task> for TaskStatusResponseDto {
    fn from(task: Task) -> Self {
        let result = match task.status {
            TaskStatus::Success => task.result,
            _ => None,
        };
        Self {
            task_id: task.id,
            status: task.status,
            result,
            error: task.error,
            attempts: task.attempt_count,
        }
    }
}
