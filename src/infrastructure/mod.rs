// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 提供与外部系统交互的具体实现：
/// - 可观测性（observability）：指标描述与记录
/// - 搜索（search）：各搜索提供方的 HTTP 客户端与工厂
pub mod observability;
pub mod search;
