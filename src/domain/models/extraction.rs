// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::Value;
use std::collections::HashSet;

use crate::domain::models::author::Author;
use crate::domain::models::media::Media;
use crate::domain::models::post::Post;
use crate::domain::models::DomainError;

/// 单次提取调用的结果
///
/// 暂存的聚合体：进入任务队列之前被拆分为相互独立的
/// 作者、帖子、媒体负载。
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub author: Author,
    pub posts: Vec<Post>,
    pub medias: Vec<Media>,
}

/// 拆分后的可序列化负载
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionPayloads {
    pub author: Value,
    pub posts: Vec<Value>,
    pub medias: Vec<Value>,
}

impl ExtractionResult {
    pub fn new(author: Author, posts: Vec<Post>, medias: Vec<Media>) -> Self {
        Self {
            author,
            posts,
            medias,
        }
    }

    /// 没有任何帖子时视为“无数据”
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// 校验聚合内的引用关系
    ///
    /// 每个帖子的 `author_id` 必须等于作者 `id`，
    /// 每个媒体的 `post_id` 必须指向本批次中的某个帖子。
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(post) = self.posts.iter().find(|p| p.author_id != self.author.id) {
            return Err(DomainError::Validation(format!(
                "post {} references author {} but result author is {}",
                post.id, post.author_id, self.author.id
            )));
        }

        let post_ids: HashSet<&str> = self.posts.iter().map(|p| p.id.as_str()).collect();
        if let Some(media) = self
            .medias
            .iter()
            .find(|m| !post_ids.contains(m.post_id.as_str()))
        {
            return Err(DomainError::Validation(format!(
                "media {} references unknown post {}",
                media.id, media.post_id
            )));
        }

        Ok(())
    }

    /// 将三个部分转换为普通 JSON 映射，URL 字段转为规范字符串
    pub fn into_payloads(self) -> Result<ExtractionPayloads, DomainError> {
        let author = serde_json::to_value(&self.author)?;
        let posts = self
            .posts
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let medias = self
            .medias
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ExtractionPayloads {
            author,
            posts,
            medias,
        })
    }
}
