// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单个提供方的用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUsage {
    /// 已发出的查询次数
    pub queries_made: u32,
    /// 贡献的域名数（按每次调用去重后累加）
    pub domains: usize,
}

/// 提供方名称 -> 用量
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageSummary(BTreeMap<String, ProviderUsage>);

impl UsageSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记提供方，确保未查询的提供方也出现在汇总中
    pub fn register(&mut self, provider: &str) {
        self.0.entry(provider.to_string()).or_default();
    }

    pub fn record(&mut self, provider: &str, queries_made: u32, domains: usize) {
        let usage = self.0.entry(provider.to_string()).or_default();
        usage.queries_made = queries_made;
        usage.domains += domains;
    }

    pub fn get(&self, provider: &str) -> Option<&ProviderUsage> {
        self.0.get(provider)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProviderUsage)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
