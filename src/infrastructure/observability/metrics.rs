// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::settings::MetricsSettings;

/// 初始化指标系统
///
/// 未启用时不安装导出器，指标宏调用为空操作
pub fn init_metrics(settings: &MetricsSettings) -> anyhow::Result<()> {
    if !settings.enabled {
        return Ok(());
    }

    let addr: SocketAddr = settings.listen_addr.parse()?;

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return Ok(());
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "pipeline_stage_total",
        "Total number of stage executions by outcome"
    );
    describe_histogram!(
        "pipeline_stage_duration_seconds",
        "Duration of stage executions in seconds"
    );
    describe_counter!(
        "media_bytes_stored_total",
        "Total number of media bytes uploaded to the object store"
    );
}

/// 记录一次阶段执行
pub fn record_stage(stage: &str, outcome: &'static str, elapsed: Duration) {
    counter!("pipeline_stage_total", "stage" => stage.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("pipeline_stage_duration_seconds", "stage" => stage.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_media_bytes(bytes: u64) {
    counter!("media_bytes_stored_total").increment(bytes);
}
