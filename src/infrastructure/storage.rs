// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::settings::StorageSettings;
use crate::domain::repositories::storage_repository::{ObjectStore, StorageError, StoredObject};
use crate::utils::errors::ConfigurationError;

/// S3 对象存储实现
///
/// 使用路径风格的端点，兼容 MinIO
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(settings: &StorageSettings) -> Self {
        let credentials = aws_sdk_s3::config::Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "static",
        );

        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(settings.endpoint_url())
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(config);

        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        if self.client.head_bucket().bucket(bucket).send().await.is_ok() {
            debug!("Bucket {} already exists", bucket);
            return Ok(());
        }

        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => {
                info!("Created bucket: {}", bucket);
                Ok(())
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_bucket_already_owned_by_you()
                    || service_error.is_bucket_already_exists()
                {
                    info!("Bucket {} already exists", bucket);
                    Ok(())
                } else {
                    Err(StorageError::Backend(format!(
                        "create bucket {}: {}",
                        bucket, service_error
                    )))
                }
            }
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let length = body.len() as i64;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(length)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.into_service_error().to_string()))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>, StorageError> {
        match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => {
                let content_type = output.content_type().map(str::to_string);
                let data = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| StorageError::Backend(e.to_string()))?
                    .into_bytes();
                Ok(Some(StoredObject {
                    body: data.to_vec(),
                    content_type,
                }))
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(StorageError::Backend(service_error.to_string()))
                }
            }
        }
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::Backend(service_error.to_string()))
                }
            }
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| StorageError::Backend(e.into_service_error().to_string()))?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// 只允许普通路径段，键不能离开存储桶目录
fn relative_path(key: &str) -> Result<&Path, StorageError> {
    let path = Path::new(key);
    let normal = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if key.is_empty() || !normal {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(path)
}

/// 本地文件系统存储实现
///
/// 存储桶对应 `base_path` 下的目录，不保存内容类型
pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_path.join(relative_path(bucket)?))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.bucket_path(bucket)?.join(relative_path(key)?))
    }

    async fn collect_keys(root: &Path, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(root) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        fs::create_dir_all(self.bucket_path(bucket)?).await?;
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let full_path = self.object_path(bucket, key)?;

        // 确保目录存在
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&body).await?;
        file.flush().await?;

        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>, StorageError> {
        match fs::read(self.object_path(bucket, key)?).await {
            Ok(body) => Ok(Some(StoredObject {
                body,
                content_type: None,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.object_path(bucket, key)?).await?)
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        Self::collect_keys(&self.bucket_path(bucket)?, prefix).await
    }
}

/// 内存对象存储实现，用于单进程运行和测试
#[derive(Default)]
pub struct InMemoryObjectStore {
    buckets: RwLock<HashSet<String>>,
    objects: RwLock<BTreeMap<(String, String), StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 对象总数
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.buckets.write().insert(bucket.to_string());
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if !self.buckets.read().contains(bucket) {
            return Err(StorageError::Backend(format!("no such bucket: {}", bucket)));
        }
        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: Some(content_type.to_string()),
            },
        );
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>, StorageError> {
        Ok(self
            .objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .objects
            .read()
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .objects
            .read()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }
}

/// 存储工厂函数
///
/// # 参数
///
/// * `settings` - 存储配置
///
/// # 返回值
///
/// * `Ok(Arc<dyn ObjectStore>)` - 配置的对象存储
/// * `Err(ConfigurationError)` - 不支持的存储类型
pub fn create_object_store(
    settings: &StorageSettings,
) -> Result<Arc<dyn ObjectStore>, ConfigurationError> {
    match settings.storage_type.as_str() {
        "s3" | "minio" => Ok(Arc::new(S3ObjectStore::new(settings))),
        "local" => {
            let base_path = settings
                .local_path
                .clone()
                .unwrap_or_else(|| "./storage".to_string());
            Ok(Arc::new(LocalObjectStore::new(base_path)))
        }
        "memory" => Ok(Arc::new(InMemoryObjectStore::new())),
        other => Err(ConfigurationError::UnsupportedStorage(other.to_string())),
    }
}
