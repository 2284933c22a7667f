// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 浏览器密集型的爬取队列
pub const CRAWLING_QUEUE: &str = "crawling";
/// 轻量的派发队列
pub const PROCESSING_QUEUE: &str = "processing";
/// 对象存储写入队列
pub const STORAGE_QUEUE: &str = "storage";
/// 媒体下载和上传队列
pub const MEDIA_QUEUE: &str = "media";
/// 名称中没有队列前缀的任务进入此队列
pub const DEFAULT_QUEUE: &str = "default";

/// 所有持久队列
pub const ALL_QUEUES: [&str; 5] = [
    CRAWLING_QUEUE,
    PROCESSING_QUEUE,
    STORAGE_QUEUE,
    MEDIA_QUEUE,
    DEFAULT_QUEUE,
];

/// 根据任务注册名称选择队列
///
/// 名称格式为 `<queue>:<task>`，取 `:` 之前的部分；
/// 没有 `:` 或前缀为空时返回默认队列。
pub fn route_queue(task_name: &str) -> &str {
    match task_name.split_once(':') {
        Some((queue, _)) if !queue.is_empty() => queue,
        _ => DEFAULT_QUEUE,
    }
}
