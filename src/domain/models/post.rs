// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::models::validate_record_id;

/// 帖子实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Post {
    /// 在数据源内唯一的帖子标识
    #[validate(
        length(min = 1, message = "post id cannot be empty"),
        custom(function = "validate_record_id")
    )]
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub num_likes: Option<i64>,
    #[serde(default)]
    pub num_comments: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    /// 所属作者，引用 `Author::id`
    #[validate(
        length(min = 1, message = "post author_id cannot be empty"),
        custom(function = "validate_record_id")
    )]
    pub author_id: String,
}

impl Post {
    /// 创建只包含标识和作者引用的帖子
    pub fn new(id: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: None,
            title: None,
            timestamp: None,
            num_likes: None,
            num_comments: None,
            url: None,
            author_id: author_id.into(),
        }
    }
}
