// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{extract::Extension, http::StatusCode, Json};
use std::sync::Arc;

use crate::application::dto::crawl_request::{SubmitCrawlRequestDto, SubmitCrawlResponseDto};
use crate::application::use_cases::crawl_use_case::SubmitCrawlUseCase;
use crate::presentation::errors::AppError;

/// 提交爬取请求
///
/// # 返回值
///
/// * `202 Accepted` - 返回可用于轮询的任务 ID
/// * `400 Bad Request` - 请求无效或数据源未启用
pub async fn submit_crawl(
    Extension(use_case): Extension<Arc<SubmitCrawlUseCase>>,
    Json(payload): Json<SubmitCrawlRequestDto>,
) -> Result<(StatusCode, Json<SubmitCrawlResponseDto>), AppError> {
    let task = use_case.execute(payload).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitCrawlResponseDto { task_id: task.id }),
    ))
}
