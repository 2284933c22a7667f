// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 提供领域层抽象接口的具体实现：
/// - 对象存储（storage）：S3、本地文件和内存实现
/// - 记录存储（record_store）：以 Parquet 文件持久化作者、帖子和媒体
/// - 媒体（media）：媒体下载和内容类型分类
/// - 可观测性（observability）：Prometheus 指标
pub mod media;
pub mod observability;
pub mod parquet;
pub mod record_store;
pub mod storage;
