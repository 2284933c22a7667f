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

use async_trait::async_trait;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 页面加载、脚本执行或等待超时
    #[error("Timeout: {0}")]
    Timeout(String),
    /// 导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 等待的元素没有出现
    #[error("Element not found: {0}")]
    MissingElement(String),
    /// 浏览器会话错误
    #[error("Browser error: {0}")]
    Browser(String),
}

/// 渲染请求
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// 目标URL
    pub url: String,
    /// 需要等待出现的 CSS 选择器
    pub wait_for: Option<String>,
    /// 是否滚动到底部以加载更多内容
    pub scroll: bool,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            wait_for: None,
            scroll: false,
        }
    }

    pub fn wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for = Some(selector.into());
        self
    }

    pub fn with_scroll(mut self) -> Self {
        self.scroll = true;
        self
    }
}

/// 浏览器引擎特质
///
/// 给定 URL 和等待条件，返回渲染后的页面 HTML。
/// 每次调用独立获取并释放浏览器会话。
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// 渲染页面
    async fn render(&self, request: &RenderRequest) -> Result<String, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
