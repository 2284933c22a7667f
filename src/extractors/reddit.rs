// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{Author, ExtractionResult, Media, Post, Source};
use crate::engines::traits::{BrowserEngine, RenderRequest};
use crate::extractors::traits::{ExtractionError, Extractor};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

const REDDIT_BASE_URL: &str = "https://www.reddit.com";
const FEED_SELECTOR: &str = "shreddit-feed";
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

fn css(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector)
        .map_err(|e| ExtractionError::MissingStructure(format!("{}: {}", selector, e)))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// 解析数字文本，去掉千位分隔符，无法解析时返回 0
fn parse_count(text: &str) -> i64 {
    text.trim().replace(',', "").parse().unwrap_or(0)
}

/// 解析帖子时间戳，兼容 `+0000` 形式的时区
fn parse_post_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = raw.trim().replace("+0000", "+00:00");
    DateTime::parse_from_rfc3339(&normalized)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn parse_cake_day(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S%.fZ")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Reddit 作者提取器
///
/// 渲染作者的投稿列表页并从 `shreddit-post` 元素中解析作者、帖子和图片
pub struct RedditExtractor {
    engine: Arc<dyn BrowserEngine>,
    base_url: String,
}

impl RedditExtractor {
    pub const IMPLEMENTATION: &'static str = "reddit";

    pub fn new(engine: Arc<dyn BrowserEngine>) -> Self {
        Self {
            engine,
            base_url: REDDIT_BASE_URL.to_string(),
        }
    }

    pub fn boxed(engine: Arc<dyn BrowserEngine>) -> Arc<dyn Extractor> {
        Arc::new(Self::new(engine))
    }

    /// 作者投稿列表页地址，作者名作为单个路径段编码
    pub fn listing_url(&self, author: &str) -> Result<Url, ExtractionError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ExtractionError::Navigation(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                ExtractionError::Navigation(format!("{} cannot be a base", self.base_url))
            })?
            .clear()
            .extend(["user", author, "submitted", ""]);
        url.set_query(Some("sort=top&t=month"));
        Ok(url)
    }

    /// 从渲染后的 HTML 中解析提取结果
    ///
    /// # 参数
    ///
    /// * `html` - 列表页 HTML
    /// * `source` - 数据源描述，用于按时间过滤和限制数量
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(ExtractionResult))` - 解析到作者，帖子可能为空
    /// * `Ok(None)` - 页面上没有任何帖子
    /// * `Err(ExtractionError)` - 作者信息缺失
    pub fn parse_listing(
        &self,
        html: &str,
        source: &Source,
    ) -> Result<Option<ExtractionResult>, ExtractionError> {
        let document = Html::parse_document(html);
        let post_selector = css("shreddit-post")?;
        let elements: Vec<ElementRef<'_>> = document.select(&post_selector).collect();

        let Some(first) = elements.first() else {
            debug!(author = %source.author, "No posts on listing page");
            return Ok(None);
        };

        let author = self.parse_author(&document, *first)?;
        let mut posts = Vec::new();
        let mut medias = Vec::new();

        for element in elements.iter().take(source.limit as usize) {
            match self.parse_post(*element, &author.id) {
                Ok((post, post_medias)) => {
                    if post.timestamp.is_some_and(|ts| ts >= source.date_start) {
                        posts.push(post);
                        medias.extend(post_medias);
                    }
                }
                Err(e) => warn!("Skipping unparseable post: {}", e),
            }
        }

        Ok(Some(ExtractionResult::new(author, posts, medias)))
    }

    fn parse_author(
        &self,
        document: &Html,
        first_post: ElementRef<'_>,
    ) -> Result<Author, ExtractionError> {
        let attrs = first_post.value();
        let id = attrs
            .attr("author-id")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ExtractionError::MissingStructure("author-id".to_string()))?;
        let name = attrs
            .attr("author")
            .ok_or_else(|| ExtractionError::MissingStructure("author".to_string()))?;

        let mut author = Author::new(id.trim(), name.trim());
        author.profile_url = Some(format!("{}/user/{}/", self.base_url, author.name));

        let cake_day = css(r#"time[data-testid="cake-day"]"#)?;
        author.joined_date = document
            .select(&cake_day)
            .next()
            .and_then(|el| el.value().attr("datetime"))
            .and_then(parse_cake_day);

        let karma = css(r#"span[data-testid="karma-number"]"#)?;
        let scores: Vec<i64> = document
            .select(&karma)
            .map(|el| parse_count(&text_of(el)))
            .collect();
        author.publication_score = scores.first().copied().unwrap_or(0).max(0);
        author.comment_score = scores.get(1).copied().unwrap_or(0).max(0);

        Ok(author)
    }

    fn parse_post(
        &self,
        element: ElementRef<'_>,
        author_id: &str,
    ) -> Result<(Post, Vec<Media>), ExtractionError> {
        let attrs = element.value();
        let id = attrs
            .attr("id")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ExtractionError::MissingStructure("post id".to_string()))?;
        let timestamp = attrs
            .attr("created-timestamp")
            .and_then(parse_post_timestamp)
            .ok_or_else(|| {
                ExtractionError::MissingStructure(format!("created-timestamp of post {}", id))
            })?;

        let mut post = Post::new(id, author_id);
        post.timestamp = Some(timestamp);
        post.num_likes = Some(attrs.attr("score").map(parse_count).unwrap_or(0));
        post.num_comments = Some(attrs.attr("comment-count").map(parse_count).unwrap_or(0));
        post.url = attrs
            .attr("permalink")
            .map(|permalink| format!("https://reddit.com{}", permalink));

        let title = css(r#"a[id^="post-title-"]"#)?;
        post.title = Some(
            element
                .select(&title)
                .next()
                .map(text_of)
                .unwrap_or_default(),
        );

        let content = css(r#"div[id$="-post-rtjson-content"]"#)?;
        let paragraphs = css("p, li")?;
        post.text = Some(
            element
                .select(&content)
                .next()
                .map(|body| {
                    body.select(&paragraphs)
                        .map(text_of)
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default(),
        );

        let images = css("img.media-lightbox-img")?;
        let sources = element
            .select(&images)
            .filter_map(|img| img.value().attr("src"))
            .filter(|src| IMAGE_EXTENSIONS.iter().any(|ext| src.contains(ext)));

        let mut medias = Vec::new();
        for (index, src) in sources.enumerate() {
            match Media::new(format!("{}_{}", post.id, index), post.id.clone(), src) {
                Ok(media) => medias.push(media),
                Err(e) => warn!(post_id = %post.id, "Skipping invalid media url {}: {}", src, e),
            }
        }

        Ok((post, medias))
    }
}

#[async_trait]
impl Extractor for RedditExtractor {
    #[instrument(skip(self), fields(author = %source.author))]
    async fn extract(&self, source: &Source) -> Result<Option<ExtractionResult>, ExtractionError> {
        let url = self.listing_url(&source.author)?;
        info!("Rendering reddit listing {}", url);

        let request = RenderRequest::new(url.as_str())
            .wait_for(FEED_SELECTOR)
            .with_scroll();
        let html = self.engine.render(&request).await?;

        self.parse_listing(&html, source)
    }

    fn name(&self) -> &'static str {
        Self::IMPLEMENTATION
    }
}
