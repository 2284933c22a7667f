// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

use crate::domain::models::{Author, Media, Post};
use crate::domain::repositories::storage_repository::StorageError;

/// 媒体处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct MediaStoreOutcome {
    /// 最终保存的媒体元数据
    pub media: Media,
    /// 下载或上传失败时的原因，此时没有托管地址
    pub download_error: Option<String>,
}

/// 记录仓库特质
///
/// 按记录 ID 覆盖写入作者、帖子和媒体，重复写入相同记录
/// 得到相同的存储状态。
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// 确保所需的存储桶全部存在
    async fn setup_buckets(&self) -> Result<(), StorageError>;

    /// 保存作者
    async fn store_author(&self, author: &Author) -> Result<(), StorageError>;

    /// 保存帖子
    async fn store_post(&self, post: &Post) -> Result<(), StorageError>;

    /// 保存媒体元数据，下载并上传内容，成功后带托管地址重新保存元数据
    ///
    /// 下载或上传失败不会返回错误，只会在结果中记录原因；
    /// 元数据写入失败才返回错误。
    async fn store_media(&self, media: Media) -> Result<MediaStoreOutcome, StorageError>;
}
