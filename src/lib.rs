// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 加载发现与审计配置，支持环境变量覆盖
pub mod config;

/// 领域模块
///
/// 包含审计任务、用量统计、搜索提供方接口与发现引擎
pub mod domain;

/// 基础设施模块
///
/// 提供搜索提供方的 HTTP 实现与指标
pub mod infrastructure;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 外部审计进程的执行与并发编排
pub mod workers;
