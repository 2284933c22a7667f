// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 提交爬取请求和查询任务状态的用例
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心记录类型、任务消息和仓库接口
pub mod domain;

/// 引擎模块
///
/// 浏览器渲染引擎
pub mod engines;

/// 提取器模块
///
/// 按数据源类型实现的提取器及其注册表
pub mod extractors;

/// 基础设施模块
///
/// 对象存储、Parquet 记录存储、媒体下载和指标
pub mod infrastructure;

/// 流水线模块
///
/// crawl、dispatch、store-metadata 和 store-media 阶段
pub mod pipeline;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由和处理器
pub mod presentation;

/// 队列模块
///
/// 实现任务队列和调度功能
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现后台任务处理和工作器管理
pub mod workers;
