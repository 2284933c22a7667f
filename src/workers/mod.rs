// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作进程管理器
pub mod manager;
/// 阶段工作者
pub mod stage_worker;
/// 工作者特质
pub mod worker;
