// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ExtractorSettings;
use crate::domain::models::{ExtractionResult, Source, SourceType};
use crate::engines::traits::BrowserEngine;
use crate::extractors::reddit::RedditExtractor;
use crate::extractors::traits::{ExtractionError, Extractor};
use crate::utils::errors::ConfigurationError;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// 提取器构造函数
pub type ExtractorConstructor = fn(Arc<dyn BrowserEngine>) -> Arc<dyn Extractor>;

/// 编译期已知的提取器实现
fn constructors() -> HashMap<&'static str, ExtractorConstructor> {
    let mut table: HashMap<&'static str, ExtractorConstructor> = HashMap::new();
    table.insert(RedditExtractor::IMPLEMENTATION, RedditExtractor::boxed);
    table
}

/// 提取器注册表
///
/// 由配置决定每种数据源是否启用以及使用哪个实现
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<SourceType, Arc<dyn Extractor>>,
    disabled: HashSet<SourceType>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 根据配置构建注册表
    ///
    /// # 参数
    ///
    /// * `settings` - 以数据源类型为键的提取器配置
    /// * `engine` - 提取器共享的浏览器引擎
    ///
    /// # 返回值
    ///
    /// * `Ok(ExtractorRegistry)` - 构建成功
    /// * `Err(ConfigurationError)` - 未知的数据源类型或未注册的实现
    pub fn from_settings(
        settings: &HashMap<String, ExtractorSettings>,
        engine: Arc<dyn BrowserEngine>,
    ) -> Result<Self, ConfigurationError> {
        let table = constructors();
        let mut registry = Self::new();

        for (key, entry) in settings {
            let source_type = SourceType::from_str(key)?;
            if !entry.enabled {
                registry.disabled.insert(source_type);
                continue;
            }

            let constructor = table.get(entry.implementation.as_str()).ok_or_else(|| {
                ConfigurationError::UnregisteredImplementation {
                    source_type: key.clone(),
                    implementation: entry.implementation.clone(),
                }
            })?;
            info!(
                source_type = %source_type,
                implementation = %entry.implementation,
                "Registered extractor"
            );
            registry
                .extractors
                .insert(source_type, constructor(engine.clone()));
        }

        Ok(registry)
    }

    /// 直接注册一个提取器实例
    pub fn register(mut self, source_type: SourceType, extractor: Arc<dyn Extractor>) -> Self {
        self.disabled.remove(&source_type);
        self.extractors.insert(source_type, extractor);
        self
    }

    /// 查找数据源类型对应的提取器
    pub fn resolve(&self, source_type: SourceType) -> Result<Arc<dyn Extractor>, ConfigurationError> {
        match self.extractors.get(&source_type) {
            Some(extractor) => Ok(extractor.clone()),
            None if self.disabled.contains(&source_type) => Err(
                ConfigurationError::DisabledSourceType(source_type.key().to_string()),
            ),
            None => Err(ConfigurationError::UnknownSourceType(
                source_type.key().to_string(),
            )),
        }
    }

    /// 解析数据源类型字符串并确认其已启用
    pub fn ensure_enabled(&self, source_type: &str) -> Result<SourceType, ConfigurationError> {
        let parsed = SourceType::from_str(source_type)?;
        self.resolve(parsed)?;
        Ok(parsed)
    }

    pub fn enabled_types(&self) -> Vec<SourceType> {
        SourceType::ALL
            .iter()
            .copied()
            .filter(|t| self.extractors.contains_key(t))
            .collect()
    }
}

/// 执行提取并校验结果的内部一致性
pub async fn extract_validated(
    extractor: &dyn Extractor,
    source: &Source,
) -> Result<Option<ExtractionResult>, ExtractionError> {
    match extractor.extract(source).await? {
        Some(result) => {
            result.validate()?;
            Ok(Some(result))
        }
        None => Ok(None),
    }
}
