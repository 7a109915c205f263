// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

use crate::utils::retry_policy::is_retryable_status;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    #[error("Timeout")]
    Timeout,
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Search backend error: {0}")]
    Backend(String),
}

impl SearchError {
    /// 429/503、超时、连接失败可退避重试，其余直接放弃本次调用
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::Timeout | SearchError::Connection(_) => true,
            SearchError::Status(code) => is_retryable_status(*code),
            _ => false,
        }
    }

    /// 结构化日志中的错误码
    pub fn code(&self) -> String {
        match self {
            SearchError::Timeout | SearchError::Connection(_) => "timeout/conn".to_string(),
            SearchError::Status(code) => code.to_string(),
            SearchError::NetworkError(_) => "network".to_string(),
            SearchError::Decode(_) => "decode".to_string(),
            SearchError::Backend(_) => "backend".to_string(),
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout
        } else if e.is_connect() {
            SearchError::Connection(e.to_string())
        } else if e.is_decode() {
            SearchError::Decode(e.to_string())
        } else {
            SearchError::NetworkError(e.to_string())
        }
    }
}

/// 搜索提供方
///
/// 每个实例独占自己的计数器与限速器，不跨提供方共享可变状态
#[async_trait]
pub trait SearchProvider: Send {
    /// 提供方名称，用于日志与用量汇总
    fn name(&self) -> &'static str;

    /// 本次运行已发出的查询次数
    fn queries_made(&self) -> u32;

    /// 每日配额阈值
    fn quota(&self) -> u32;

    /// 是否仍在配额内
    fn can_continue(&self) -> bool {
        self.queries_made() < self.quota()
    }

    /// 执行一次关键词查询，返回至多 `max_results` 条原始 URL
    ///
    /// 无论成功、失败或重试多少次，计数器只加一；超出配额时返回空且不计数
    async fn query(&mut self, keyword: &str, max_results: usize) -> Vec<String>;
}
