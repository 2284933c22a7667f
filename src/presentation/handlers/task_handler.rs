// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::dto::crawl_request::TaskStatusResponseDto;
use crate::application::use_cases::crawl_use_case::TaskStatusUseCase;
use crate::presentation::errors::AppError;

/// 查询任务状态
pub async fn get_task_status(
    Extension(use_case): Extension<Arc<TaskStatusUseCase>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskStatusResponseDto>, AppError> {
    Ok(Json(use_case.execute(id).await?))
}
