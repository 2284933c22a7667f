// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 错误响应
pub mod errors;
/// 请求处理器
pub mod handlers;
/// 路由
pub mod routes;
