// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::domain::models::DomainError;
use crate::utils::errors::ConfigurationError;

/// 数据源类型
///
/// 每种类型对应一个提取器实现，由提取器注册表负责选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Reddit 用户主页
    Reddit,
    /// LinkedIn 个人主页
    Linkedin,
}

impl SourceType {
    /// 所有已知的数据源类型
    pub const ALL: [SourceType; 2] = [SourceType::Reddit, SourceType::Linkedin];

    /// 注册表中使用的键
    pub fn key(&self) -> &'static str {
        match self {
            SourceType::Reddit => "reddit",
            SourceType::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SourceType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reddit" => Ok(SourceType::Reddit),
            "linkedin" => Ok(SourceType::Linkedin),
            other => Err(ConfigurationError::UnknownSourceType(other.to_string())),
        }
    }
}

/// 爬取请求描述
///
/// 描述一次作者爬取：作者、起始时间、数据源类型和帖子上限。
/// 由提交方创建，只被提取器消费一次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Source {
    /// 作者用户名
    #[validate(length(min = 1, message = "author cannot be empty"))]
    pub author: String,
    /// 只保留此时间之后发布的帖子
    pub date_start: DateTime<Utc>,
    /// 数据源类型
    pub source_type: SourceType,
    /// 最多处理的帖子数量
    #[validate(range(min = 1, message = "limit must be positive"))]
    pub limit: u32,
}

impl Source {
    /// 默认帖子上限
    pub const DEFAULT_LIMIT: u32 = 100;

    /// 创建并校验爬取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(Source)` - 校验通过的请求
    /// * `Err(DomainError)` - 作者为空或上限不是正数
    pub fn new(
        author: impl Into<String>,
        date_start: DateTime<Utc>,
        source_type: SourceType,
        limit: u32,
    ) -> Result<Self, DomainError> {
        let source = Self {
            author: author.into().trim().to_string(),
            date_start,
            source_type,
            limit,
        };
        source.validate()?;
        Ok(source)
    }
}
