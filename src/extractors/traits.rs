// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{DomainError, ExtractionResult, Source};
use crate::engines::traits::EngineError;
use async_trait::async_trait;
use thiserror::Error;

/// 提取错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("Extraction timed out: {0}")]
    Timeout(String),
    #[error("Expected page structure is missing: {0}")]
    MissingStructure(String),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Inconsistent extraction result: {0}")]
    Inconsistent(#[from] DomainError),
}

impl From<EngineError> for ExtractionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Timeout(msg) => ExtractionError::Timeout(msg),
            EngineError::Navigation(msg) => ExtractionError::Navigation(msg),
            EngineError::MissingElement(selector) => ExtractionError::MissingStructure(selector),
            EngineError::Browser(msg) => ExtractionError::Browser(msg),
        }
    }
}

/// 数据源提取器
///
/// 针对一个 `Source` 产出作者、帖子和媒体记录。
/// 返回 `Ok(None)` 表示该数据源暂无可提取的数据，不视为错误。
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, source: &Source) -> Result<Option<ExtractionResult>, ExtractionError>;

    /// 实现名称，与配置中的 `implementation` 对应
    fn name(&self) -> &'static str;
}
