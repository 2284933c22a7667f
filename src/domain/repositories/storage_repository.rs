// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 对象存储后端错误
    #[error("Storage backend error: {0}")]
    Backend(String),
    /// 媒体下载错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// 记录编码错误
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// 存储键不合法（包含上级目录或绝对路径）
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

/// 存储中的对象
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// 对象内容
    pub body: Vec<u8>,
    /// 写入时声明的内容类型
    pub content_type: Option<String>,
}

/// 对象存储特质
///
/// 按存储桶和键读写对象。同一个键写入两次会覆盖之前的对象。
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 确保存储桶存在，已存在时直接返回
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// 写入对象，内容长度和类型按参数设置
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// 读取对象
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// 检查对象是否存在
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// 列出指定前缀下的所有键
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;
}
