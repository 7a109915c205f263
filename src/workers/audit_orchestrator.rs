// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::future;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::models::audit::{AuditOutcome, AuditTask};
use crate::infrastructure::observability::metrics;
use crate::workers::audit_command::AuditCommandBuilder;
use crate::workers::process_registry::ProcessRegistry;
use crate::workers::process_tree::{ProcessTree, DEFAULT_GRACE};

/// 一次审计运行的汇总
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    /// 按提交顺序排列的结果
    pub outcomes: Vec<AuditOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    /// 运行是否被中断
    pub interrupted: bool,
}

impl AuditReport {
    fn from_outcomes(outcomes: Vec<AuditOutcome>, elapsed: Duration, interrupted: bool) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - succeeded;
        Self {
            outcomes,
            succeeded,
            failed,
            elapsed,
            interrupted,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AuditOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}

/// 审计编排器
///
/// 固定大小的工作池，每个任务由独立的 [`ProcessTree`] 执行，结果按提交顺序收集
pub struct AuditOrchestrator {
    command: Arc<dyn AuditCommandBuilder>,
    output_dir: PathBuf,
    grace: Duration,
}

impl AuditOrchestrator {
    pub fn new(command: Arc<dyn AuditCommandBuilder>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            output_dir: output_dir.into(),
            grace: DEFAULT_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// 运行全部任务，Ctrl-C 或 SIGTERM 会中断运行
    pub async fn run(
        &self,
        domains: &[String],
        worker_count: usize,
        per_task_timeout: Duration,
    ) -> AuditReport {
        let cancel = CancellationToken::new();
        let watcher = spawn_interrupt_watcher(cancel.clone());
        let report = self
            .run_with_cancellation(domains, worker_count, per_task_timeout, cancel)
            .await;
        watcher.abort();
        report
    }

    /// 运行全部任务，`cancel` 被取消后停止派发、清扫存活进程，已在运行的任务尽快返回
    pub async fn run_with_cancellation(
        &self,
        domains: &[String],
        worker_count: usize,
        per_task_timeout: Duration,
        cancel: CancellationToken,
    ) -> AuditReport {
        let registry = ProcessRegistry::new();
        let started = Instant::now();
        let workers = worker_count.max(1);
        let total = domains.len();

        info!(total, workers, timeout_secs = per_task_timeout.as_secs(), "audit run started");

        let tasks: Vec<AuditTask> = domains
            .iter()
            .map(|domain| AuditTask::new(domain, &self.output_dir))
            .collect();

        let dispatch_cancel = cancel.clone();
        // 完成顺序不受限制，收集后按提交序号恢复顺序
        let work = stream::iter(tasks.into_iter().enumerate())
            .take_while(move |_| future::ready(!dispatch_cancel.is_cancelled()))
            .map(|(index, task)| {
                let outcome = self.dispatch(task, &registry, &cancel, per_task_timeout);
                async move { (index, outcome.await) }
            })
            .buffer_unordered(workers)
            .collect::<Vec<(usize, AuditOutcome)>>();
        tokio::pin!(work);

        let finished = tokio::select! {
            outcomes = &mut work => Some(outcomes),
            _ = cancel.cancelled() => None,
        };

        let mut indexed = match finished {
            Some(outcomes) => outcomes,
            None => {
                let swept = registry.sweep(self.grace).await;
                warn!(swept, "audit run interrupted");
                work.await
            }
        };
        indexed.sort_unstable_by_key(|(index, _)| *index);
        let outcomes: Vec<AuditOutcome> = indexed.into_iter().map(|(_, outcome)| outcome).collect();

        // the registry is discarded with this run; anything still listed is reaped now
        let leftover = registry.sweep(self.grace).await;
        if leftover > 0 {
            warn!(leftover, "reaped audit processes left after the run");
        }

        let report =
            AuditReport::from_outcomes(outcomes, started.elapsed(), cancel.is_cancelled());
        info!(
            total = report.total(),
            succeeded = report.succeeded,
            failed = report.failed,
            elapsed_secs = report.elapsed.as_secs_f64(),
            interrupted = report.interrupted,
            "audit run finished"
        );
        report
    }

    fn dispatch(
        &self,
        task: AuditTask,
        registry: &ProcessRegistry,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> impl std::future::Future<Output = AuditOutcome> {
        let tree = ProcessTree::new(registry.clone())
            .with_cancellation(cancel.clone())
            .with_grace(self.grace);
        let command = self.command.build(&task);
        let url = task.url().to_string();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let outcome = tree.run(task.url(), &command, timeout).await;
            metrics::record_audit_task(outcome.success, started.elapsed());
            match &outcome.error {
                None => info!(url = task.url(), "audit succeeded"),
                Some(err) => warn!(url = task.url(), error = %err, "audit failed"),
            }
            outcome
        });

        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(url = %url, error = %e, "audit worker panicked");
                    AuditOutcome::failed(url, &e.to_string())
                }
            }
        }
    }
}

/// 监听 Ctrl-C / SIGTERM 并取消 `cancel`
pub fn spawn_interrupt_watcher(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => {
                warn!("interrupt received; stopping dispatch and sweeping audit processes");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", e);
            future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Unable to listen for SIGTERM: {}", e);
                future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
