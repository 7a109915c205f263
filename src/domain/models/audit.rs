// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::sanitize::error_excerpt;
use crate::utils::url_utils::{ensure_scheme, output_slug};

/// 审计任务
///
/// 一个目标 URL 及其唯一的输出路径，创建后只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTask {
    url: String,
    slug: String,
    output_base: PathBuf,
}

impl AuditTask {
    /// 由域名或 URL 创建任务，缺少协议时补 https://
    pub fn new(target: &str, output_dir: &Path) -> Self {
        let url = ensure_scheme(target);
        let slug = output_slug(&url);
        let output_base = output_dir.join(&slug);
        Self {
            url,
            slug,
            output_base,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// 审计工具的输出路径前缀
    pub fn output_base(&self) -> &Path {
        &self.output_base
    }
}

/// 单个域名的审计结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub url: String,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditOutcome {
    pub fn succeeded(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: true,
            error: None,
        }
    }

    /// 失败结果，错误文本经脱敏并截断
    pub fn failed(url: impl Into<String>, error: &str) -> Self {
        Self {
            url: url.into(),
            success: false,
            error: Some(error_excerpt(error)),
        }
    }
}
