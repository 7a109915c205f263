// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

use crate::utils::errors::ConfigurationError;

/// 环境变量覆盖前缀
const ENV_PREFIX: &str = "LEADGEN";

/// 单个搜索提供方的配置
///
/// 运行期间不可变，由提供方实例持有
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProviderSettings {
    /// 是否启用
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 每秒请求数，<= 0 表示不限速
    #[serde(default = "default_rate_limit_rps")]
    #[validate(range(min = 0.0))]
    pub rate_limit_rps: f64,
    /// 抖动百分比
    #[serde(default = "default_jitter_percent")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub jitter_percent: f64,
    /// 总尝试次数（含第一次）
    #[serde(default = "default_retry_attempts")]
    #[validate(range(min = 1))]
    pub retry_attempts: u32,
    /// 初始退避秒数
    #[serde(default = "default_backoff_base_seconds")]
    #[validate(range(min = 0.0))]
    pub backoff_base_seconds: f64,
    /// 最大退避秒数
    #[serde(default = "default_backoff_max_seconds")]
    #[validate(range(min = 0.0))]
    pub backoff_max_seconds: f64,
    /// 每日配额阈值
    #[serde(default = "default_daily_quota_threshold")]
    pub daily_quota_threshold: u32,
    /// API Key 所在的环境变量名
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// 搜索引擎 ID 所在的环境变量名
    #[serde(default = "default_cx_env")]
    pub cx_env: String,
    /// 获取方式
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_true() -> bool {
    true
}
fn default_rate_limit_rps() -> f64 {
    0.5
}
fn default_jitter_percent() -> f64 {
    20.0
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_backoff_base_seconds() -> f64 {
    0.5
}
fn default_backoff_max_seconds() -> f64 {
    8.0
}
fn default_daily_quota_threshold() -> u32 {
    1_000_000_000
}
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}
fn default_cx_env() -> String {
    "GOOGLE_CSE_ID".to_string()
}
fn default_method() -> String {
    "scrape".to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            rate_limit_rps: default_rate_limit_rps(),
            jitter_percent: default_jitter_percent(),
            retry_attempts: default_retry_attempts(),
            backoff_base_seconds: default_backoff_base_seconds(),
            backoff_max_seconds: default_backoff_max_seconds(),
            daily_quota_threshold: default_daily_quota_threshold(),
            api_key_env: default_api_key_env(),
            cx_env: default_cx_env(),
            method: default_method(),
        }
    }
}

/// 发现阶段配置
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// 关键词列表，非空
    pub keywords: Vec<String>,
    /// 提供方名称 -> 配置
    pub providers: BTreeMap<String, ProviderSettings>,
}

impl DiscoverySettings {
    /// 从配置文件加载，`LEADGEN` 前缀的环境变量可覆盖文件中的值
    ///
    /// # Returns
    ///
    /// * `Ok(DiscoverySettings)` - 成功加载的配置
    /// * `Err(ConfigurationError)` - 文件缺失、关键词缺失/类型错误/为空，或提供方配置越界
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::FileNotFound(path.to_path_buf()));
        }

        let config = with_sources(Config::builder(), Some(path)).build()?;
        let keywords = parse_keywords(&config)?;

        let providers = match config.get::<BTreeMap<String, ProviderSettings>>("providers") {
            Ok(providers) => providers,
            Err(ConfigError::NotFound(_)) => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        for (name, provider) in &providers {
            provider
                .validate()
                .map_err(|e| ConfigurationError::InvalidProvider {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
        }

        Ok(Self {
            keywords,
            providers,
        })
    }

    /// 获取提供方配置，未配置时使用默认值
    pub fn provider(&self, name: &str) -> ProviderSettings {
        self.providers.get(name).cloned().unwrap_or_default()
    }
}

fn parse_keywords(config: &Config) -> Result<Vec<String>, ConfigurationError> {
    let value = match config.get::<config::Value>("keywords") {
        Ok(value) => value,
        Err(ConfigError::NotFound(_)) => return Err(ConfigurationError::MissingKeywords),
        Err(e) => return Err(e.into()),
    };

    let items = value
        .into_array()
        .map_err(|_| ConfigurationError::KeywordsNotList)?;

    let mut keywords = Vec::with_capacity(items.len());
    for item in items {
        let keyword = item
            .into_string()
            .map_err(|_| ConfigurationError::KeywordsNotList)?;
        let keyword = keyword.trim();
        if !keyword.is_empty() {
            keywords.push(keyword.to_string());
        }
    }

    if keywords.is_empty() {
        return Err(ConfigurationError::EmptyKeywords);
    }
    Ok(keywords)
}

/// 审计阶段配置
#[derive(Debug, Clone, Deserialize)]
pub struct AuditSettings {
    /// 审计工具可执行文件
    pub binary: String,
    /// 审计结果目录
    pub output_dir: PathBuf,
    /// 并发工作数
    pub workers: usize,
    /// 单个任务的硬超时（秒）
    pub timeout_seconds: u64,
    /// 传给审计工具的页面加载超时（毫秒），必须短于任务超时
    pub max_wait_for_load_ms: u64,
}

impl AuditSettings {
    /// 加载审计配置，配置文件可选
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        if let Some(p) = path {
            if !p.exists() {
                return Err(ConfigurationError::FileNotFound(p.to_path_buf()));
            }
        }

        let builder = Config::builder()
            .set_default("audit.binary", "lighthouse")?
            .set_default("audit.output_dir", "outputs/lighthouse")?
            .set_default("audit.workers", 4)?
            .set_default("audit.timeout_seconds", 60)?
            .set_default("audit.max_wait_for_load_ms", 45000)?;

        let settings: AuditSettings = with_sources(builder, path).build()?.get("audit")?;
        settings.validate()?;
        Ok(settings)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.workers == 0 {
            return Err(ConfigurationError::InvalidAudit(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidAudit(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.max_wait_for_load_ms >= self.timeout_seconds.saturating_mul(1000) {
            return Err(ConfigurationError::InvalidAudit(format!(
                "max_wait_for_load_ms ({}) must be shorter than timeout_seconds ({}s)",
                self.max_wait_for_load_ms, self.timeout_seconds
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn with_sources(
    builder: ConfigBuilder<DefaultState>,
    path: Option<&Path>,
) -> ConfigBuilder<DefaultState> {
    let builder = match path {
        Some(p) => builder.add_source(File::from(p)),
        None => builder,
    };
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    )
}
