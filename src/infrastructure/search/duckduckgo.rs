// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::settings::ProviderSettings;
use crate::domain::search::engine::{SearchError, SearchProvider};
use crate::infrastructure::observability::metrics;
use crate::utils::rate_limiter::RateLimiter;
use crate::utils::retry_policy::BackoffPolicy;
use crate::utils::robots::{RobotsDecision, RobotsPolicy, DISCOVERY_USER_AGENT};
use crate::utils::sanitize::sanitize_error;

/// DuckDuckGo HTML 结果页
pub const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// 文本搜索的单条结果
///
/// 不同后端给出的字段名不同，按 href、link、url 的顺序取第一个非空值
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TextHit {
    pub href: Option<String>,
    pub link: Option<String>,
    pub url: Option<String>,
}

impl TextHit {
    pub fn from_href(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::default()
        }
    }

    pub fn target(&self) -> Option<&str> {
        [&self.href, &self.link, &self.url]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|value| !value.trim().is_empty())
    }
}

/// 文本搜索后端
#[async_trait]
pub trait TextSearchBackend: Send + Sync {
    async fn text(&self, keyword: &str, max_results: usize) -> Result<Vec<TextHit>, SearchError>;
}

/// 基于 DuckDuckGo HTML 页面的后端
pub struct DuckDuckGoHtmlBackend {
    client: Client,
    endpoint: String,
}

impl Default for DuckDuckGoHtmlBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DuckDuckGoHtmlBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            endpoint: DUCKDUCKGO_HTML_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TextSearchBackend for DuckDuckGoHtmlBackend {
    async fn text(&self, keyword: &str, max_results: usize) -> Result<Vec<TextHit>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", keyword)])
            .header(USER_AGENT, DISCOVERY_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let html = response.text().await?;
        let mut hits = parse_result_links(&html)?;
        hits.truncate(max_results);
        Ok(hits)
    }
}

/// 提取结果页中的 `a.result__a` 链接
pub fn parse_result_links(html: &str) -> Result<Vec<TextHit>, SearchError> {
    let selector = Selector::parse("a.result__a")
        .map_err(|e| SearchError::Backend(format!("invalid result selector: {:?}", e)))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(decode_result_href)
        .map(TextHit::from_href)
        .collect())
}

/// 还原跳转链接 `//duckduckgo.com/l/?uddg=<encoded>` 中的目标地址
pub fn decode_result_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    let is_redirect = parsed
        .host_str()
        .map(|host| host.ends_with("duckduckgo.com"))
        .unwrap_or(false);

    if is_redirect {
        return parsed
            .query_pairs()
            .find(|(name, _)| name == "uddg")
            .map(|(_, target)| target.into_owned())
            .filter(|target| !target.is_empty());
    }

    match parsed.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

/// DuckDuckGo 提供方
///
/// 构造时检查一次 robots.txt 并在整个生命周期内沿用结果
pub struct DuckDuckGoProvider {
    settings: ProviderSettings,
    backend: Box<dyn TextSearchBackend>,
    limiter: RateLimiter,
    backoff: BackoffPolicy,
    robots: RobotsDecision,
    queries_made: u32,
}

impl DuckDuckGoProvider {
    pub const NAME: &'static str = "duckduckgo";
    pub const HOST: &'static str = "duckduckgo.com";

    /// 检查 robots.txt 后创建默认后端的提供方
    pub async fn connect(settings: ProviderSettings, robots: &RobotsPolicy) -> Self {
        let decision = robots.check(Self::HOST).await;
        Self::from_parts(settings, Box::new(DuckDuckGoHtmlBackend::new()), decision)
    }

    pub fn from_parts(
        settings: ProviderSettings,
        backend: Box<dyn TextSearchBackend>,
        robots: RobotsDecision,
    ) -> Self {
        if settings.method != "scrape" {
            warn!(
                provider = Self::NAME,
                method = %settings.method,
                "unsupported method; using scrape"
            );
        }

        let limiter = RateLimiter::new(settings.rate_limit_rps, settings.jitter_percent);
        let backoff = BackoffPolicy::from_secs_f64(
            settings.backoff_base_seconds,
            settings.backoff_max_seconds,
            settings.retry_attempts,
        );

        Self {
            settings,
            backend,
            limiter,
            backoff,
            robots,
            queries_made: 0,
        }
    }

    pub fn robots_decision(&self) -> RobotsDecision {
        self.robots
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn queries_made(&self) -> u32 {
        self.queries_made
    }

    fn quota(&self) -> u32 {
        self.settings.daily_quota_threshold
    }

    async fn query(&mut self, keyword: &str, max_results: usize) -> Vec<String> {
        if !self.can_continue() {
            debug!(
                provider = Self::NAME,
                keyword,
                results = 0,
                queries_made = self.queries_made,
                error_code = "quota",
                "search skipped"
            );
            return Vec::new();
        }

        self.limiter.wait().await;
        if let Some(delay) = self.robots.crawl_delay {
            tokio::time::sleep(delay).await;
        }
        self.queries_made += 1;
        metrics::record_query(Self::NAME);

        let mut delays = self.backoff.delays().into_iter();
        loop {
            match self.backend.text(keyword, max_results).await {
                Ok(hits) => {
                    let urls: Vec<String> = hits
                        .iter()
                        .filter_map(TextHit::target)
                        .take(max_results)
                        .map(str::to_string)
                        .collect();
                    info!(
                        provider = Self::NAME,
                        keyword,
                        results = urls.len(),
                        queries_made = self.queries_made,
                        crawl_delay = ?self.robots.crawl_delay,
                        "search call completed"
                    );
                    return urls;
                }
                Err(e) => match delays.next() {
                    Some(delay) => {
                        debug!(
                            provider = Self::NAME,
                            keyword,
                            error_code = %e.code(),
                            delay_ms = delay.as_millis() as u64,
                            "retrying after backoff"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        warn!(
                            provider = Self::NAME,
                            keyword,
                            results = 0,
                            error_code = %e.code(),
                            error = %sanitize_error(&e.to_string()),
                            "search call gave up"
                        );
                        return Vec::new();
                    }
                },
            }
        }
    }
}
