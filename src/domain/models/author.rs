// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::models::validate_record_id;

/// 作者实体
///
/// 每次爬取结果对应一个作者，`id` 为源站点分配的稳定标识符，
/// 下游阶段从不重新生成。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Author {
    /// 源站点的作者标识
    #[validate(
        length(min = 1, message = "author id cannot be empty"),
        custom(function = "validate_record_id")
    )]
    pub id: String,
    /// 显示名称
    pub name: String,
    /// 个人简介
    #[serde(default)]
    pub headline: Option<String>,
    /// 个人主页地址
    #[serde(default, alias = "url")]
    pub profile_url: Option<String>,
    /// 注册时间
    #[serde(default)]
    pub joined_date: Option<DateTime<Utc>>,
    /// 发帖积分
    #[serde(default)]
    #[validate(range(min = 0, message = "publication score must not be negative"))]
    pub publication_score: i64,
    /// 评论积分
    #[serde(default)]
    #[validate(range(min = 0, message = "comment score must not be negative"))]
    pub comment_score: i64,
}

impl Author {
    /// 创建只包含标识和名称的作者
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            headline: None,
            profile_url: None,
            joined_date: None,
            publication_score: 0,
            comment_score: 0,
        }
    }
}
