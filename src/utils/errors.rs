// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::PathBuf;
use thiserror::Error;

/// 配置错误类型
///
/// 均为致命错误，在任何发现工作开始前报告
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("配置文件不存在: {0}")]
    FileNotFound(PathBuf),

    #[error("无法读取配置: {0}")]
    Load(#[from] config::ConfigError),

    #[error("config missing 'keywords'")]
    MissingKeywords,

    #[error("'keywords' must be a list of strings")]
    KeywordsNotList,

    #[error("'keywords' is empty")]
    EmptyKeywords,

    #[error("提供方 {name} 配置无效: {reason}")]
    InvalidProvider { name: String, reason: String },

    #[error("审计配置无效: {0}")]
    InvalidAudit(String),

    #[error("没有启用或选中的搜索提供方")]
    NoProviders,
}

/// 产物文件错误类型
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Cannot write to {path}: {source}")]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("域名文件不存在: {0}")]
    MissingInput(PathBuf),

    #[error("域名文件中没有域名: {0}")]
    EmptyInput(PathBuf),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 外部进程错误类型
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("process exited before it could be tracked")]
    Untracked,
}
