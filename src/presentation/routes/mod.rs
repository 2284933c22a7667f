// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::use_cases::crawl_use_case::{SubmitCrawlUseCase, TaskStatusUseCase};
use crate::presentation::handlers::{crawl_handler, task_handler};

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version))
        .route("/v1/crawl", post(crawl_handler::submit_crawl))
        .route("/v1/tasks/{id}", get(task_handler::get_task_status))
}

/// 注入用例并加上请求追踪层
pub fn create_app(submit: Arc<SubmitCrawlUseCase>, status: Arc<TaskStatusUseCase>) -> Router {
    routes()
        .layer(Extension(submit))
        .layer(Extension(status))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
