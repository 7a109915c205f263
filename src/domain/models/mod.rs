// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// - 审计（audit）：审计任务与单个域名的审计结果
/// - 用量（usage）：发现阶段各提供方的查询与贡献统计
pub mod audit;
pub mod usage;
