// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 审计工作模块
///
/// - 审计命令（audit_command）：由任务生成外部工具调用
/// - 进程登记表（process_registry）：一次运行内所有存活进程的共享集合
/// - 进程树（process_tree）：启动、限时并终止一次外部调用及其子进程
/// - 编排器（audit_orchestrator）：固定大小工作池与中断清理
pub mod audit_command;
pub mod audit_orchestrator;
pub mod process_registry;
pub mod process_tree;

pub use audit_command::{AuditCommandBuilder, CommandSpec, LighthouseCommand};
pub use audit_orchestrator::{AuditOrchestrator, AuditReport};
pub use process_registry::ProcessRegistry;
pub use process_tree::ProcessTree;
