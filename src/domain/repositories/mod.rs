// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// - 对象存储（storage_repository）：按桶和键读写对象
/// - 记录仓库（record_repository）：作者、帖子、媒体的覆盖写入
pub mod record_repository;
pub mod storage_repository;
