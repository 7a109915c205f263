// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::settings::ProviderSettings;
use crate::domain::search::engine::{SearchError, SearchProvider};
use crate::infrastructure::observability::metrics;
use crate::utils::rate_limiter::RateLimiter;
use crate::utils::retry_policy::BackoffPolicy;
use crate::utils::robots::DISCOVERY_USER_AGENT;
use crate::utils::sanitize::sanitize_error;

/// Custom Search JSON API 地址
pub const GOOGLE_CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// 单页最多 10 条
const PAGE_SIZE: usize = 10;
/// `start` 参数上限，API 最多返回 100 条
const MAX_START: usize = 91;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    link: Option<String>,
    #[serde(rename = "formattedUrl")]
    formatted_url: Option<String>,
}

/// Google Custom Search 提供方
///
/// 需要 API Key 与搜索引擎 ID 两个凭据，均从配置指定的环境变量读取。
/// 缺少凭据时查询照常计数但不发出请求。
pub struct GoogleCseProvider {
    settings: ProviderSettings,
    api_key: Option<String>,
    cx: Option<String>,
    endpoint: String,
    client: Client,
    limiter: RateLimiter,
    backoff: BackoffPolicy,
    queries_made: u32,
}

impl GoogleCseProvider {
    pub const NAME: &'static str = "google_cse";

    pub fn new(settings: ProviderSettings) -> Self {
        let api_key = read_credential(&settings.api_key_env);
        let cx = read_credential(&settings.cx_env);
        if api_key.is_none() || cx.is_none() {
            warn!(
                provider = Self::NAME,
                api_key_env = %settings.api_key_env,
                cx_env = %settings.cx_env,
                "credentials missing; queries will return no results"
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
            api_key,
            cx,
            endpoint: GOOGLE_CSE_ENDPOINT.to_string(),
            client: Client::new(),
            limiter,
            backoff,
            queries_made: 0,
        }
    }

    /// 替换 API 地址
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.cx.is_some()
    }

    async fn fetch_page(
        &self,
        api_key: &str,
        cx: &str,
        keyword: &str,
        start: usize,
        num: usize,
    ) -> Result<Vec<String>, SearchError> {
        let params = [
            ("key", api_key.to_string()),
            ("cx", cx.to_string()),
            ("q", keyword.to_string()),
            ("num", num.to_string()),
            ("start", start.to_string()),
            ("safe", "active".to_string()),
        ];

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .header(USER_AGENT, DISCOVERY_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(body
            .items
            .into_iter()
            .filter_map(|item| item.link.or(item.formatted_url))
            .filter(|url| !url.is_empty())
            .collect())
    }

    /// 单页请求，可重试错误按退避序列重发，序列耗尽即放弃
    async fn fetch_page_with_retry(
        &self,
        api_key: &str,
        cx: &str,
        keyword: &str,
        start: usize,
        num: usize,
    ) -> Result<Vec<String>, SearchError> {
        let mut delays = self.backoff.delays().into_iter();
        loop {
            match self.fetch_page(api_key, cx, keyword, start, num).await {
                Ok(urls) => return Ok(urls),
                Err(e) if e.is_retryable() => match delays.next() {
                    Some(delay) => {
                        debug!(
                            provider = Self::NAME,
                            keyword,
                            start,
                            error_code = %e.code(),
                            delay_ms = delay.as_millis() as u64,
                            "retrying page after backoff"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleCseProvider {
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
        self.queries_made += 1;
        metrics::record_query(Self::NAME);

        let (api_key, cx) = match (self.api_key.as_deref(), self.cx.as_deref()) {
            (Some(key), Some(cx)) => (key, cx),
            _ => {
                warn!(
                    provider = Self::NAME,
                    keyword,
                    results = 0,
                    error_code = "no-credentials",
                    "search skipped"
                );
                return Vec::new();
            }
        };

        let mut urls: Vec<String> = Vec::new();
        let mut failure: Option<SearchError> = None;
        let mut start = 1;
        let mut first_page = true;

        while urls.len() < max_results && start <= MAX_START {
            let num = PAGE_SIZE.min(max_results - urls.len());
            if !first_page {
                self.limiter.wait().await;
            }
            first_page = false;

            match self
                .fetch_page_with_retry(api_key, cx, keyword, start, num)
                .await
            {
                Ok(page) => {
                    let received = page.len();
                    urls.extend(page);
                    if received < num {
                        break;
                    }
                    start += PAGE_SIZE;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        urls.truncate(max_results);

        match failure {
            Some(e) => warn!(
                provider = Self::NAME,
                keyword,
                results = urls.len(),
                error_code = %e.code(),
                error = %sanitize_error(&e.to_string()),
                "search call gave up"
            ),
            None => info!(
                provider = Self::NAME,
                keyword,
                results = urls.len(),
                "search call completed"
            ),
        }

        urls
    }
}

fn read_credential(env_name: &str) -> Option<String> {
    std::env::var(env_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
