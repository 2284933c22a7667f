// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::domain::repositories::storage_repository::StorageError;

/// 未声明内容类型时上传使用的类型
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

const KNOWN_EXTENSIONS: [(&str, &str); 9] = [
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("video/mp4", ".mp4"),
    ("video/webm", ".webm"),
    ("video/quicktime", ".mov"),
    ("application/pdf", ".pdf"),
];

/// 规范化内容类型：去掉参数部分，去空白并转小写
pub fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// 根据内容类型确定文件扩展名
///
/// 已知类型查表；未知但包含 `/` 的类型使用子类型；否则为 `.bin`
///
/// # 参数
///
/// * `content_type` - 响应声明的内容类型
///
/// # 返回值
///
/// 带前导点的扩展名
pub fn classify_content_type(content_type: &str) -> String {
    let normalized = normalize_content_type(content_type);

    if let Some((_, ext)) = KNOWN_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == normalized)
    {
        return ext.to_string();
    }

    match normalized.rsplit_once('/') {
        Some((_, subtype)) => format!(".{}", subtype),
        None => ".bin".to_string(),
    }
}

/// 下载得到的媒体内容
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedMedia {
    pub body: Vec<u8>,
    /// 规范化后的内容类型，未声明时为空字符串
    pub content_type: String,
}

impl DownloadedMedia {
    pub fn extension(&self) -> String {
        classify_content_type(&self.content_type)
    }

    /// 上传时声明的内容类型
    pub fn upload_content_type(&self) -> &str {
        if self.content_type.is_empty() {
            FALLBACK_CONTENT_TYPE
        } else {
            &self.content_type
        }
    }
}

/// 媒体下载器
#[derive(Clone)]
pub struct MediaDownloader {
    client: Client,
}

impl MediaDownloader {
    pub fn new(timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// 通过 HTTP GET 下载媒体，响应状态为错误时失败
    pub async fn download(&self, url: &Url) -> Result<DownloadedMedia, StorageError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(normalize_content_type)
            .unwrap_or_default();
        let body = response.bytes().await?.to_vec();

        debug!(url = %url, bytes = body.len(), content_type = %content_type, "Downloaded media");
        Ok(DownloadedMedia { body, content_type })
    }
}
