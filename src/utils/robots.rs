// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::time::Duration;
use tracing::{debug, warn};

use crate::utils::sanitize::sanitize_error;

/// 发现阶段所有 HTTP 请求使用的 User-Agent
pub const DISCOVERY_USER_AGENT: &str = "LeadGen-Audit-Discover/1.0";

/// robots.txt 请求超时
const ROBOTS_TIMEOUT: Duration = Duration::from_secs(6);

static CRAWL_DELAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*crawl-?delay\s*:\s*([0-9.]+)")
        .expect("Failed to compile crawl-delay regex")
});

/// robots.txt 检查结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotsDecision {
    /// 是否允许访问
    pub allowed: bool,
    /// 每次请求前需要额外等待的时间
    pub crawl_delay: Option<Duration>,
}

impl RobotsDecision {
    /// 获取失败时的默认结果：允许，无延迟
    pub fn allow_all() -> Self {
        Self {
            allowed: true,
            crawl_delay: None,
        }
    }
}

/// Robots.txt 检查器
///
/// 尽力而为，任何失败都放行，不会让结果静默归零
#[derive(Clone)]
pub struct RobotsPolicy {
    /// HTTP客户端
    client: Client,
    /// 协议，默认 https
    scheme: String,
    user_agent: String,
}

impl Default for RobotsPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotsPolicy {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            scheme: "https".to_string(),
            user_agent: DISCOVERY_USER_AGENT.to_string(),
        }
    }

    /// 更换协议（本地测试服务器只支持 http）
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// 获取并解析 `{scheme}://{host}/robots.txt`
    pub async fn check(&self, host: &str) -> RobotsDecision {
        let robots_url = format!("{}://{}/robots.txt", self.scheme, host);

        let response = match self
            .client
            .get(&robots_url)
            .header("User-Agent", &self.user_agent)
            .timeout(ROBOTS_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    host,
                    error = %sanitize_error(&e.to_string()),
                    "robots.txt fetch failed, allowing"
                );
                return RobotsDecision::allow_all();
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            debug!(host, status = response.status().as_u16(), "robots.txt not available");
            return RobotsDecision::allow_all();
        }

        let content = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(host, error = %e, "robots.txt body unreadable, allowing");
                return RobotsDecision::allow_all();
            }
        };

        let mut matcher = DefaultMatcher::default();
        let root_url = format!("{}://{}/", self.scheme, host);
        let allowed = matcher.one_agent_allowed_by_robots(&content, &self.user_agent, &root_url);
        let crawl_delay = parse_crawl_delay(&content)
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        if !allowed {
            warn!(host, "robots.txt disallows the discovery user agent");
        }
        debug!(host, allowed, crawl_delay = ?crawl_delay, "robots.txt parsed");

        RobotsDecision {
            allowed,
            crawl_delay,
        }
    }
}

/// 解析 Crawl-delay 指令（秒）
///
/// 不区分 User-agent 块，第一条匹配的指令生效
pub fn parse_crawl_delay(robots_txt: &str) -> Option<f64> {
    robots_txt
        .lines()
        .find_map(|line| CRAWL_DELAY.captures(line))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
