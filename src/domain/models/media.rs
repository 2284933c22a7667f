// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use url::Url;
use validator::{Validate, ValidationError};

use crate::domain::models::{validate_record_id, DomainError};

/// 媒体实体
///
/// `hosted_url` 只能写入一次：仅在内容上传成功时设置，
/// 之后必须重新保存元数据记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Media {
    /// 媒体唯一标识
    #[validate(
        length(min = 1, message = "media id cannot be empty"),
        custom(function = "validate_record_id")
    )]
    pub id: String,
    /// 所属帖子，引用 `Post::id`
    #[validate(
        length(min = 1, message = "media post_id cannot be empty"),
        custom(function = "validate_record_id")
    )]
    pub post_id: String,
    /// 原始地址，必须是绝对 http(s) URL
    #[validate(custom(function = "validate_http_url"))]
    pub original_url: Url,
    /// 上传后的托管地址
    #[serde(default)]
    pub hosted_url: Option<String>,
}

fn validate_http_url(url: &Url) -> Result<(), ValidationError> {
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        _ => {
            let mut err = ValidationError::new("http_url");
            err.message = Some(format!("invalid media url: {}", url).into());
            Err(err)
        }
    }
}

impl Media {
    /// 创建媒体记录
    ///
    /// # 返回值
    ///
    /// * `Ok(Media)` - 合法的媒体记录
    /// * `Err(DomainError)` - 原始地址不是绝对 http(s) URL
    pub fn new(
        id: impl Into<String>,
        post_id: impl Into<String>,
        original_url: &str,
    ) -> Result<Self, DomainError> {
        let original_url = Url::parse(original_url)
            .map_err(|e| DomainError::Validation(format!("invalid media url {}: {}", original_url, e)))?;
        let media = Self {
            id: id.into(),
            post_id: post_id.into(),
            original_url,
            hosted_url: None,
        };
        media.validate()?;
        Ok(media)
    }

    /// 记录上传成功后的托管地址
    ///
    /// 已经存在不同的托管地址时返回错误
    pub fn mark_hosted(&mut self, hosted_url: String) -> Result<(), DomainError> {
        match &self.hosted_url {
            Some(existing) if *existing != hosted_url => Err(DomainError::Validation(format!(
                "media {} already hosted at {}",
                self.id, existing
            ))),
            _ => {
                self.hosted_url = Some(hosted_url);
                Ok(())
            }
        }
    }
}
