// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 可观测性模块
///
/// 发现与审计阶段的计数器和耗时直方图
pub mod metrics;
