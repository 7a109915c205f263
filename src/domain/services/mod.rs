// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 发现服务（discovery_service）：驱动关键词 × 提供方矩阵并汇总域名与用量
pub mod discovery_service;
