// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
/// 包括域名规范化、请求节奏、退避、robots.txt、错误脱敏与日志初始化
pub mod artifacts;
pub mod errors;
pub mod rate_limiter;
pub mod retry_policy;
pub mod robots;
pub mod sanitize;
pub mod telemetry;
pub mod url_utils;
