// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 流水线编排模块
///
/// crawl → dispatch → store-metadata + store-media(*N)
pub mod orchestrator;
pub mod stage;

pub use orchestrator::Pipeline;
pub use stage::{Stage, StageError, StageOutput};
