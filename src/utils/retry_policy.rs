// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;

/// 退避策略配置
///
/// 总尝试次数为 `attempts`，第一次尝试不等待，
/// 因此延迟序列长度为 `attempts - 1`
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// 初始退避时间
    pub base: Duration,
    /// 最大退避时间
    pub max: Duration,
    /// 总尝试次数
    pub attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(8),
            attempts: 3,
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration, attempts: u32) -> Self {
        Self {
            base,
            max,
            attempts,
        }
    }

    /// 由秒数构造，负数和非有限值按 0 处理
    pub fn from_secs_f64(base_secs: f64, max_secs: f64, attempts: u32) -> Self {
        Self::new(secs(base_secs), secs(max_secs), attempts)
    }

    /// 预先计算完整的延迟序列: base, base*2, base*4, ... 每项不超过 max
    ///
    /// 序列耗尽即放弃重试
    pub fn delays(&self) -> Vec<Duration> {
        let retries = self.attempts.saturating_sub(1) as usize;
        if retries == 0 {
            return Vec::new();
        }

        let mut schedule = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(self.max)
            .with_max_elapsed_time(None)
            .build();

        (0..retries)
            .map(|_| {
                schedule
                    .next_backoff()
                    .unwrap_or(self.max)
                    .min(self.max)
            })
            .collect()
    }
}

/// 以秒为单位的延迟序列
pub fn backoff_delays(base_secs: f64, max_secs: f64, attempts: u32) -> Vec<f64> {
    BackoffPolicy::from_secs_f64(base_secs, max_secs, attempts)
        .delays()
        .into_iter()
        .map(|d| d.as_secs_f64())
        .collect()
}

fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// 判断 HTTP 状态码是否属于可重试的限流/不可用信号
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 503)
}
