// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::queue::task_queue::TaskQueue;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// 任务调度器
///
/// 负责队列的周期性维护：把到期的延迟重试任务移回就绪队列，
/// 并重新投递租约过期的在途任务。任务的领取由工作者主动拉取。
pub struct TaskScheduler<Q: TaskQueue + ?Sized + 'static> {
    /// 任务队列
    queue: Arc<Q>,
    /// 维护间隔
    tick: Duration,
}

impl<Q: TaskQueue + ?Sized + 'static> TaskScheduler<Q> {
    /// 创建新的任务调度器实例
    ///
    /// # 参数
    ///
    /// * `queue` - 任务队列
    /// * `tick` - 维护间隔
    pub fn new(queue: Arc<Q>, tick: Duration) -> Self {
        Self { queue, tick }
    }

    /// 执行一轮维护
    ///
    /// # 返回值
    ///
    /// 返回 (移回就绪队列的任务数, 重新投递的任务数)
    pub async fn run_once(&self) -> (usize, usize) {
        let now = Utc::now();

        let promoted = match self.queue.promote_due(now).await {
            Ok(count) => count,
            Err(e) => {
                error!("Failed to promote delayed tasks: {}", e);
                0
            }
        };

        let reclaimed = match self.queue.reclaim_expired(now).await {
            Ok(count) => count,
            Err(e) => {
                error!("Failed to reclaim expired tasks: {}", e);
                0
            }
        };

        if promoted > 0 || reclaimed > 0 {
            info!(promoted, reclaimed, "Scheduler maintenance tick");
        } else {
            debug!("Scheduler maintenance tick");
        }
        (promoted, reclaimed)
    }

    /// 启动调度器后台任务
    ///
    /// # 返回值
    ///
    /// 返回后台任务的句柄
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}
