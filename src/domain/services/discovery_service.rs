// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::domain::models::usage::UsageSummary;
use crate::domain::search::engine::SearchProvider;
use crate::infrastructure::observability::metrics;
use crate::utils::url_utils::dedupe_sort;

/// 发现阶段的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    /// 排序去重后的域名
    pub domains: Vec<String>,
    /// 各提供方的用量
    pub usage: UsageSummary,
}

/// 发现引擎
///
/// 逐个关键词、按固定顺序逐个提供方查询，把结果规范化后合并为域名集合。
/// 重试完全由提供方负责，这一层不重试任何组合。
pub struct DiscoveryEngine {
    providers: Vec<Box<dyn SearchProvider>>,
}

impl DiscoveryEngine {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Box<dyn SearchProvider>] {
        &self.providers
    }

    /// 执行关键词 × 提供方矩阵
    ///
    /// # Arguments
    ///
    /// * `keywords` - 关键词列表
    /// * `max_results` - 每次调用最多返回的结果数
    pub async fn run(&mut self, keywords: &[String], max_results: usize) -> DiscoveryReport {
        let mut domains: BTreeSet<String> = BTreeSet::new();
        let mut usage = UsageSummary::new();
        for provider in &self.providers {
            usage.register(provider.name());
        }

        for keyword in keywords {
            for provider in self.providers.iter_mut() {
                let name = provider.name();
                if !provider.can_continue() {
                    info!(provider = name, keyword = %keyword, "{} quota reached; skipping", name);
                    continue;
                }

                let urls = provider.query(keyword, max_results).await;
                let found = dedupe_sort(&urls);
                debug!(
                    provider = name,
                    keyword = %keyword,
                    raw = urls.len(),
                    domains = found.len(),
                    "provider call normalized"
                );

                metrics::record_domains(name, found.len());
                usage.record(name, provider.queries_made(), found.len());
                domains.extend(found);
            }
        }

        DiscoveryReport {
            domains: domains.into_iter().collect(),
            usage,
        }
    }
}
