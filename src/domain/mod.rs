// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：审计任务、审计结果与用量统计
/// - 搜索（search）：搜索提供方的能力接口
/// - 服务（services）：发现引擎
///
/// 领域层不依赖具体的搜索后端或进程实现。
pub mod models;
pub mod search;
pub mod services;
