// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::settings::DiscoverySettings;
use crate::domain::search::engine::SearchProvider;
use crate::infrastructure::search::duckduckgo::DuckDuckGoProvider;
use crate::infrastructure::search::google_cse::GoogleCseProvider;
use crate::utils::errors::ConfigurationError;
use crate::utils::robots::RobotsPolicy;

/// 已知提供方，按查询顺序排列
pub const KNOWN_PROVIDERS: [&str; 2] = [GoogleCseProvider::NAME, DuckDuckGoProvider::NAME];

/// 命令行选择的提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderSelection {
    #[default]
    All,
    Google,
    DuckDuckGo,
}

impl ProviderSelection {
    /// 判断提供方是否被选中
    pub fn includes(&self, provider: &str) -> bool {
        match self {
            Self::All => true,
            Self::Google => provider == GoogleCseProvider::NAME,
            Self::DuckDuckGo => provider == DuckDuckGoProvider::NAME,
        }
    }
}

impl FromStr for ProviderSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "google" | "google_cse" => Ok(Self::Google),
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo),
            other => Err(format!(
                "unknown provider '{}', expected google, duckduckgo or all",
                other
            )),
        }
    }
}

impl fmt::Display for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Google => "google",
            Self::DuckDuckGo => "duckduckgo",
        };
        f.write_str(name)
    }
}

/// 搜索提供方工厂
pub struct SearchProviderFactory;

impl SearchProviderFactory {
    /// 按固定顺序创建已启用且被选中的提供方
    ///
    /// 一个都没有时返回 `ConfigurationError::NoProviders`
    pub async fn create_providers(
        settings: &DiscoverySettings,
        selection: ProviderSelection,
        robots: &RobotsPolicy,
    ) -> Result<Vec<Box<dyn SearchProvider>>, ConfigurationError> {
        for name in settings.providers.keys() {
            if !KNOWN_PROVIDERS.contains(&name.as_str()) {
                warn!(provider = %name, "unknown provider in config; ignoring");
            }
        }

        let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();
        for name in KNOWN_PROVIDERS {
            if !selection.includes(name) {
                continue;
            }
            let provider_settings = settings.provider(name);
            if !provider_settings.enabled {
                info!(provider = name, "provider disabled in config");
                continue;
            }

            let provider: Box<dyn SearchProvider> = match name {
                GoogleCseProvider::NAME => Box::new(GoogleCseProvider::new(provider_settings)),
                _ => Box::new(DuckDuckGoProvider::connect(provider_settings, robots).await),
            };
            providers.push(provider);
        }

        if providers.is_empty() {
            return Err(ConfigurationError::NoProviders);
        }
        Ok(providers)
    }
}
