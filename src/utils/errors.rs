// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 配置错误类型
///
/// 表示部署或配置缺陷，而不是暂时性故障，永远不会重试
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unknown source type: {0}")]
    UnknownSourceType(String),

    #[error("source type is disabled: {0}")]
    DisabledSourceType(String),

    #[error("no extractor implementation '{implementation}' registered for source type {source_type}")]
    UnregisteredImplementation {
        source_type: String,
        implementation: String,
    },

    #[error("unsupported storage backend: {0}")]
    UnsupportedStorage(String),

    #[error("unsupported queue backend: {0}")]
    UnsupportedQueue(String),

    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },
}

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("队列错误: {0}")]
    QueueError(String),

    #[error("领域错误: {0}")]
    DomainError(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}
