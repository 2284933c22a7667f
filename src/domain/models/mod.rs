// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 爬取请求（source）：描述要爬取的作者、平台和时间窗口
/// - 作者、帖子、媒体（author / post / media）：规范化后的持久化记录
/// - 提取结果（extraction）：一次提取调用产生的暂存聚合
/// - 任务（task）：任务队列中流转的消息
///
/// 记录在进入任务队列后只以普通 JSON 负载的形式传递。
pub mod author;
pub mod extraction;
pub mod media;
pub mod post;
pub mod source;
pub mod task;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use validator::{Validate, ValidationError};

pub use author::Author;
pub use extraction::{ExtractionPayloads, ExtractionResult};
pub use media::Media;
pub use post::Post;
pub use source::{Source, SourceType};

/// 领域错误类型
///
/// 表示在领域层可能发生的各种错误情况
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 无效的状态转换，当任务状态转换不符合业务规则时发生
    #[error("Invalid state transition from {0}")]
    InvalidStateTransition(String),

    /// 验证错误，记录字段不合法
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(err: validator::ValidationErrors) -> Self {
        DomainError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Validation(err.to_string())
    }
}

/// 校验记录标识
///
/// 标识会原样成为存储键 `{category}/{id}` 的一部分，
/// 不能包含路径分隔符或 `..`
pub fn validate_record_id(id: &str) -> Result<(), ValidationError> {
    if id.contains(['/', '\\']) || id.contains("..") {
        let mut err = ValidationError::new("record_id");
        err.message = Some(format!("record id must not contain path segments: {}", id).into());
        return Err(err);
    }
    Ok(())
}

/// 从 JSON 负载重建并校验记录
pub fn decode_record<T>(value: Value) -> Result<T, DomainError>
where
    T: DeserializeOwned + Validate,
{
    let record: T = serde_json::from_value(value)?;
    record.validate()?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_record_applies_validation() {
        let author: Author = decode_record(json!({"id": "a1", "name": "A"})).unwrap();
        assert_eq!(author.publication_score, 0);
        assert_eq!(author.comment_score, 0);

        let negative = decode_record::<Author>(json!({
            "id": "a1", "name": "A", "publication_score": -1
        }));
        assert!(matches!(negative, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_decode_media_rejects_bad_url() {
        let bad = decode_record::<Media>(json!({
            "id": "m1", "post_id": "p1", "original_url": "not a url"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_ids_with_path_segments_are_rejected() {
        for id in ["../../../escaped", "a/b", "a\\b", "..", "x..y"] {
            assert!(validate_record_id(id).is_err(), "{id}");
        }
        assert!(validate_record_id("t3_abc.1").is_ok());

        let post = decode_record::<Post>(json!({"id": "../escaped", "author_id": "a1"}));
        assert!(matches!(post, Err(DomainError::Validation(_))));
        let post = decode_record::<Post>(json!({"id": "p1", "author_id": "a/1"}));
        assert!(matches!(post, Err(DomainError::Validation(_))));
        let author = decode_record::<Author>(json!({"id": "..\\x", "name": "A"}));
        assert!(matches!(author, Err(DomainError::Validation(_))));
        let media = decode_record::<Media>(json!({
            "id": "../m1", "post_id": "p1", "original_url": "https://i.redd.it/a.png"
        }));
        assert!(matches!(media, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_author_accepts_legacy_url_field() {
        let author: Author = decode_record(json!({
            "id": "a1", "name": "A", "url": "https://reddit.com/user/A"
        }))
        .unwrap();
        assert_eq!(author.profile_url.as_deref(), Some("https://reddit.com/user/A"));
    }
}
