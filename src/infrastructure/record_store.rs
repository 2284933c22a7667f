// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::config::settings::StorageSettings;
use crate::domain::models::{validate_record_id, Author, Media, Post};
use crate::domain::repositories::record_repository::{MediaStoreOutcome, RecordRepository};
use crate::domain::repositories::storage_repository::{ObjectStore, StorageError};
use crate::infrastructure::media::MediaDownloader;
use crate::infrastructure::observability::metrics::record_media_bytes;
use crate::infrastructure::parquet::{encode_record, PARQUET_CONTENT_TYPE};

pub fn author_key(id: &str) -> String {
    format!("authors/{}.parquet", id)
}

pub fn post_key(id: &str) -> String {
    format!("posts/{}.parquet", id)
}

pub fn media_metadata_key(id: &str) -> String {
    format!("media/metadata/{}.parquet", id)
}

pub fn media_file_key(id: &str, extension: &str) -> String {
    format!("media/files/{}{}", id, extension)
}

/// 拒绝会改变键布局的记录标识
fn checked_id(id: &str) -> Result<&str, StorageError> {
    validate_record_id(id)
        .map(|_| id)
        .map_err(|_| StorageError::InvalidKey(id.to_string()))
}

/// 基于对象存储的 Parquet 记录仓库
///
/// 每条记录写成单行 Parquet 文件，键由类别和记录 ID 决定，
/// 相同 ID 的写入覆盖之前的对象。
pub struct ParquetRecordStore {
    store: Arc<dyn ObjectStore>,
    downloader: MediaDownloader,
    data_bucket: String,
    media_bucket: String,
    /// 托管地址前缀，形如 `http://host:port`
    public_endpoint: String,
}

impl ParquetRecordStore {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        downloader: MediaDownloader,
        settings: &StorageSettings,
    ) -> Self {
        Self {
            store,
            downloader,
            data_bucket: settings.data_bucket.clone(),
            media_bucket: settings.media_bucket.clone(),
            public_endpoint: settings.endpoint_url(),
        }
    }

    pub fn data_bucket(&self) -> &str {
        &self.data_bucket
    }

    pub fn media_bucket(&self) -> &str {
        &self.media_bucket
    }

    /// 媒体文件的托管地址
    pub fn hosted_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_endpoint, self.media_bucket, key)
    }

    async fn save_parquet<T: serde::Serialize + Sync>(
        &self,
        record: &T,
        key: &str,
    ) -> Result<(), StorageError> {
        let body = encode_record(record)?;
        self.store
            .put(&self.data_bucket, key, body, PARQUET_CONTENT_TYPE)
            .await
    }

    /// 下载媒体并上传到媒体存储桶，返回托管地址
    async fn upload_media_file(&self, media: &Media) -> Result<String, StorageError> {
        let downloaded = self.downloader.download(&media.original_url).await?;
        let key = media_file_key(checked_id(&media.id)?, &downloaded.extension());
        let size = downloaded.body.len() as u64;
        let content_type = downloaded.upload_content_type().to_string();

        self.store
            .put(&self.media_bucket, &key, downloaded.body, &content_type)
            .await?;
        record_media_bytes(size);

        Ok(self.hosted_url(&key))
    }
}

#[async_trait]
impl RecordRepository for ParquetRecordStore {
    async fn setup_buckets(&self) -> Result<(), StorageError> {
        for bucket in [&self.data_bucket, &self.media_bucket] {
            self.store.ensure_bucket(bucket).await?;
        }
        info!(
            data_bucket = %self.data_bucket,
            media_bucket = %self.media_bucket,
            "Storage buckets ready"
        );
        Ok(())
    }

    async fn store_author(&self, author: &Author) -> Result<(), StorageError> {
        let key = author_key(checked_id(&author.id)?);
        self.save_parquet(author, &key)
            .await
            .inspect_err(|e| error!("Error storing author {}: {}", author.id, e))
    }

    async fn store_post(&self, post: &Post) -> Result<(), StorageError> {
        let key = post_key(checked_id(&post.id)?);
        self.save_parquet(post, &key)
            .await
            .inspect_err(|e| error!("Error storing post {}: {}", post.id, e))
    }

    #[instrument(skip(self, media), fields(media_id = %media.id))]
    async fn store_media(&self, mut media: Media) -> Result<MediaStoreOutcome, StorageError> {
        let metadata_key = media_metadata_key(checked_id(&media.id)?);
        self.save_parquet(&media, &metadata_key).await?;

        match self.upload_media_file(&media).await {
            Ok(hosted_url) => {
                media
                    .mark_hosted(hosted_url)
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                self.save_parquet(&media, &metadata_key).await?;
                Ok(MediaStoreOutcome {
                    media,
                    download_error: None,
                })
            }
            Err(e) => {
                warn!("Error downloading media {}: {}", media.id, e);
                Ok(MediaStoreOutcome {
                    media,
                    download_error: Some(e.to_string()),
                })
            }
        }
    }
}
