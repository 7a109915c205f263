// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 搜索服务模块
///
/// 提供 Google Custom Search 与 DuckDuckGo 两个提供方，以及按配置创建它们的工厂
pub mod duckduckgo;
pub mod factory;
pub mod google_cse;

pub use factory::{ProviderSelection, SearchProviderFactory};
