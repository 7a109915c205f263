// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

/// 单个搜索提供方的请求节奏控制器
///
/// 每次远程调用前等待 `1/rps ± jitter` 秒；`rps <= 0` 表示不限速
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// 每秒请求数
    rps: f64,
    /// 抖动百分比 (0-100)
    jitter_percent: f64,
}

impl RateLimiter {
    pub fn new(rps: f64, jitter_percent: f64) -> Self {
        Self {
            rps,
            jitter_percent: jitter_percent.clamp(0.0, 100.0),
        }
    }

    /// 不限速的控制器
    pub fn unlimited() -> Self {
        Self::new(0.0, 0.0)
    }

    /// 基础间隔；不限速时返回 None
    pub fn base_interval(&self) -> Option<Duration> {
        if self.rps.is_nan() || self.rps <= 0.0 {
            return None;
        }
        Some(Duration::try_from_secs_f64(1.0 / self.rps).unwrap_or(Duration::MAX))
    }

    /// 计算下一次等待时间（含抖动，下限为 0）
    pub fn next_delay(&self) -> Option<Duration> {
        let interval = self.base_interval()?.as_secs_f64();
        let jitter = interval * (self.jitter_percent / 100.0);
        let offset = if jitter > 0.0 {
            rand::random_range(-jitter..=jitter)
        } else {
            0.0
        };
        let delay = (interval + offset).max(0.0);
        Some(Duration::try_from_secs_f64(delay).unwrap_or(Duration::MAX))
    }

    /// 等待到允许发出下一次请求
    ///
    /// 只挂起当前任务，返回实际等待时间
    pub async fn wait(&self) -> Duration {
        match self.next_delay() {
            Some(delay) if !delay.is_zero() => {
                tokio::time::sleep(delay).await;
                delay
            }
            _ => Duration::ZERO,
        }
    }
}
