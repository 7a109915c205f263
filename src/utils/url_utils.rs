// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::BTreeSet;
use std::net::IpAddr;

/// 域名最大长度 (RFC 1035)
pub const MAX_DOMAIN_LEN: usize = 253;

/// 将原始 URL 或主机字符串规范化为可比较的域名
///
/// 去掉协议、路径、端口，转为小写并去掉开头的 `www.`。
/// 无法转换的输入返回空字符串。
pub fn normalize_domain(raw: &str) -> String {
    let mut host = raw.trim();
    if let Some((_, rest)) = host.split_once("//") {
        host = rest;
    }
    // split always yields at least one item
    let host = host.split('/').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();

    let mut host = host.to_lowercase();
    loop {
        let trimmed = host.trim();
        match trimmed.strip_prefix("www.") {
            Some(rest) => host = rest.to_string(),
            None => {
                host = trimmed.to_string();
                break;
            }
        }
    }
    host
}

/// 判断规范化后的域名是否可作为审计目标
///
/// 拒绝空串、IP 字面量、localhost、超长域名以及没有顶级域的裸词
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }
    if domain == "localhost" || domain.ends_with(".localhost") {
        return false;
    }
    if domain.parse::<IpAddr>().is_ok() {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return false;
    }

    // heuristic TLD check: the last label must not be purely numeric
    labels
        .last()
        .is_some_and(|tld| !tld.chars().all(|c| c.is_ascii_digit()))
}

/// 规范化、过滤、去重并排序
///
/// 排序保证输出文件稳定，便于 diff
pub fn dedupe_sort<I, S>(raw_urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw_urls
        .into_iter()
        .map(|raw| normalize_domain(raw.as_ref()))
        .filter(|domain| is_valid_domain(domain))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 由 URL 生成文件系统安全的输出名
pub fn output_slug(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    stripped
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 为缺少协议的域名补上 https://
pub fn ensure_scheme(domain: &str) -> String {
    if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}
