// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// 注册指标描述
///
/// 未安装导出器时指标调用为空操作
pub fn describe_metrics() {
    describe_counter!(
        "discovery_queries_total",
        "Total number of search queries issued per provider"
    );
    describe_counter!(
        "discovery_domains_total",
        "Total number of distinct domains contributed per provider call"
    );
    describe_counter!(
        "audit_tasks_total",
        "Total number of audit tasks finished, labelled by outcome"
    );
    describe_histogram!(
        "audit_task_duration_seconds",
        "Wall-clock duration of a single audit task in seconds"
    );
}

pub fn record_query(provider: &'static str) {
    counter!("discovery_queries_total", "provider" => provider).increment(1);
}

pub fn record_domains(provider: &'static str, count: usize) {
    counter!("discovery_domains_total", "provider" => provider).increment(count as u64);
}

/// 记录单个审计任务的结果与耗时
pub fn record_audit_task(success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "failure" };
    counter!("audit_tasks_total", "outcome" => outcome).increment(1);
    histogram!("audit_task_duration_seconds").record(elapsed.as_secs_f64());
}
