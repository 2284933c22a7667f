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

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::utils::retry_policy::RetryPolicy;

/// 应用程序配置设置
///
/// 包含服务器、Redis、队列、工作者、存储、浏览器和提取器等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 任务队列配置
    pub queue: QueueSettings,
    /// 各队列的工作者数量
    pub workers: WorkerSettings,
    /// 存储配置
    pub storage: StorageSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 媒体下载配置
    pub media: MediaSettings,
    /// 提取器注册表配置，键为数据源类型
    pub extractors: HashMap<String, ExtractorSettings>,
    /// 指标导出配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// Redis配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis连接URL
    pub url: String,
    /// 键名前缀
    pub namespace: String,
}

/// 任务队列配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    /// 队列后端 (redis, memory)
    pub backend: String,
    /// 最大重试次数，耗尽后进入死信队列
    pub max_retries: u32,
    /// 重试延迟（秒）
    pub retry_delay_secs: u64,
    /// 是否按指数增长重试延迟，默认固定延迟
    pub exponential_backoff: bool,
    /// 指数退避的延迟上限（秒）
    pub max_retry_delay_secs: u64,
    /// 任务租约时长（秒），超时未确认的任务会被重新投递
    pub visibility_timeout_secs: u64,
    /// 空闲时的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 维护循环间隔（秒）
    pub maintenance_interval_secs: u64,
    /// 成功任务记录的保留时长（秒），失败任务永久保留在死信队列
    pub result_ttl_secs: u64,
}

impl QueueSettings {
    /// 阶段任务使用的重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        let delay = Duration::from_secs(self.retry_delay_secs);
        if self.exponential_backoff {
            RetryPolicy::exponential(delay, Duration::from_secs(self.max_retry_delay_secs))
        } else {
            RetryPolicy::fixed(delay)
        }
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }
}

/// 各队列的工作者数量
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    pub crawling: usize,
    pub processing: usize,
    pub storage: usize,
    pub media: usize,
    pub default: usize,
    /// 停止时等待当前任务完成的时间（秒）
    pub shutdown_grace_secs: u64,
}

impl WorkerSettings {
    /// 按队列名称列出工作者数量
    pub fn per_queue(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("crawling", self.crawling),
            ("processing", self.processing),
            ("storage", self.storage),
            ("media", self.media),
            ("default", self.default),
        ]
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// 存储类型 (s3, local, memory)
    pub storage_type: String,
    /// 对象存储主机
    pub host: String,
    /// 对象存储端口
    pub port: u16,
    /// 访问密钥
    pub access_key: String,
    /// 密钥
    pub secret_key: String,
    /// 是否启用 TLS
    pub secure: bool,
    /// S3 区域
    pub region: String,
    /// 记录数据存储桶
    pub data_bucket: String,
    /// 媒体文件存储桶
    pub media_bucket: String,
    /// 本地存储路径 (当 type=local 时使用)
    pub local_path: Option<String>,
}

impl StorageSettings {
    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// 对象存储端点，形如 `http://host:port`
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

/// 浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 远程浏览器调试地址，未设置时本地启动无头浏览器
    pub remote_url: Option<String>,
    pub page_load_timeout_secs: u64,
    pub script_timeout_secs: u64,
    pub element_wait_timeout_secs: u64,
    /// 元素出现后的固定等待时间
    pub settle_delay_ms: u64,
    pub scroll_pause_ms: u64,
    pub scroll_growth_timeout_secs: u64,
    pub max_scroll_attempts: u32,
    pub user_agent: String,
}

/// 媒体下载配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    pub download_timeout_secs: u64,
}

/// 单个提取器的注册配置
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExtractorSettings {
    /// 是否启用
    pub enabled: bool,
    /// 实现名称，对应编译期注册的构造函数
    pub implementation: String,
}

/// 指标导出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 和 `POSTHARVEST__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("POSTHARVEST").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 从 TOML 文本加载配置，未出现的键使用默认值
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("redis.url", "redis://localhost:6379/0")?
            .set_default("redis.namespace", "postharvest")?
            // Default queue settings
            .set_default("queue.backend", "redis")?
            .set_default("queue.max_retries", 3)?
            .set_default("queue.retry_delay_secs", 60)?
            .set_default("queue.exponential_backoff", false)?
            .set_default("queue.max_retry_delay_secs", 600)?
            .set_default("queue.visibility_timeout_secs", 1800)?
            .set_default("queue.poll_interval_ms", 1000)?
            .set_default("queue.maintenance_interval_secs", 1)?
            .set_default("queue.result_ttl_secs", 86400)?
            // Default worker pool sizes
            .set_default("workers.crawling", 1)?
            .set_default("workers.processing", 2)?
            .set_default("workers.storage", 2)?
            .set_default("workers.media", 4)?
            .set_default("workers.default", 1)?
            .set_default("workers.shutdown_grace_secs", 30)?
            // Default Storage settings
            .set_default("storage.storage_type", "s3")?
            .set_default("storage.host", "localhost")?
            .set_default("storage.port", 9000)?
            .set_default("storage.access_key", "minioadmin")?
            .set_default("storage.secret_key", "minioadmin")?
            .set_default("storage.secure", false)?
            .set_default("storage.region", "us-east-1")?
            .set_default("storage.data_bucket", "extracts-data")?
            .set_default("storage.media_bucket", "extracts-media")?
            .set_default("storage.local_path", "./storage")?
            // Default browser settings
            .set_default("browser.page_load_timeout_secs", 45)?
            .set_default("browser.script_timeout_secs", 45)?
            .set_default("browser.element_wait_timeout_secs", 30)?
            .set_default("browser.settle_delay_ms", 2000)?
            .set_default("browser.scroll_pause_ms", 3000)?
            .set_default("browser.scroll_growth_timeout_secs", 10)?
            .set_default("browser.max_scroll_attempts", 5)?
            .set_default(
                "browser.user_agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            )?
            .set_default("media.download_timeout_secs", 60)?
            // Default extractor registry
            .set_default("extractors.reddit.enabled", true)?
            .set_default("extractors.reddit.implementation", "reddit")?
            .set_default("extractors.linkedin.enabled", false)?
            .set_default("extractors.linkedin.implementation", "linkedin")?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9100")
    }
}
