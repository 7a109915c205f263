// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashMap;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, Signal, System};
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::models::audit::AuditOutcome;
use crate::utils::errors::ProcessError;
use crate::utils::sanitize::sanitize_error;
use crate::workers::audit_command::CommandSpec;
use crate::workers::process_registry::ProcessRegistry;

/// 终止信号之后等待自愿退出的时间
pub const DEFAULT_GRACE: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 只保留这么多字节的错误输出
const STDERR_CAPTURE_LIMIT: usize = 16 * 1024;

/// 进程退出后继续读取错误输出的最长时间
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

enum Waited {
    Exited(io::Result<ExitStatus>),
    TimedOut,
    Interrupted,
}

/// 保证任何返回路径上都从登记表中移除
struct Registration<'a> {
    registry: &'a ProcessRegistry,
    pid: u32,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.unregister(self.pid);
    }
}

/// 一次外部审计进程调用
///
/// 进程在独立的进程组中启动，超时、中断或出错时终止整棵进程树
pub struct ProcessTree {
    registry: ProcessRegistry,
    cancel: CancellationToken,
    grace: Duration,
}

impl ProcessTree {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self {
            registry,
            cancel: CancellationToken::new(),
            grace: DEFAULT_GRACE,
        }
    }

    /// 观察外部中断，取消后立即终止进程并返回
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// 运行命令直到退出或超时
    ///
    /// # Arguments
    ///
    /// * `url` - 结果中记录的目标
    /// * `command` - 要启动的进程
    /// * `timeout` - 硬超时
    pub async fn run(&self, url: &str, command: &CommandSpec, timeout: Duration) -> AuditOutcome {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = ProcessError::Spawn {
                    program: command.program_name(),
                    source,
                };
                warn!(url, error = %err, "audit process failed to launch");
                return AuditOutcome::failed(url, &err.to_string());
            }
        };

        let Some(pid) = child.id() else {
            return AuditOutcome::failed(url, &ProcessError::Untracked.to_string());
        };
        self.registry.register(pid);
        let _registration = Registration {
            registry: &self.registry,
            pid,
        };
        debug!(url, pid, "audit process started");

        let stderr_task = tokio::spawn(collect_stderr(child.stderr.take()));

        let waited = tokio::select! {
            result = tokio::time::timeout(timeout, child.wait()) => match result {
                Ok(status) => Waited::Exited(status),
                Err(_) => Waited::TimedOut,
            },
            _ = self.cancel.cancelled() => Waited::Interrupted,
        };

        let outcome = match waited {
            Waited::Exited(Ok(status)) => {
                // reap helpers the tool left behind in its group
                terminate_group(pid, self.grace).await;
                if status.success() {
                    stderr_task.abort();
                    AuditOutcome::succeeded(url)
                } else {
                    let stderr = drain_stderr(stderr_task).await;
                    let message = if stderr.trim().is_empty() {
                        format!("exited with {}", status)
                    } else {
                        stderr.trim().to_string()
                    };
                    AuditOutcome::failed(url, &message)
                }
            }
            Waited::Exited(Err(e)) => {
                stderr_task.abort();
                self.terminate(pid, &mut child).await;
                AuditOutcome::failed(url, &ProcessError::Wait(e).to_string())
            }
            Waited::TimedOut => {
                warn!(url, pid, timeout_secs = timeout.as_secs(), "audit process timed out");
                stderr_task.abort();
                self.terminate(pid, &mut child).await;
                AuditOutcome::failed(url, &format!("Timeout after {}s", timeout.as_secs()))
            }
            Waited::Interrupted => {
                stderr_task.abort();
                self.terminate(pid, &mut child).await;
                AuditOutcome::failed(url, "Interrupted")
            }
        };

        debug!(url, pid, success = outcome.success, "audit process finished");
        outcome
    }

    async fn terminate(&self, pid: u32, child: &mut tokio::process::Child) {
        terminate_tree(pid, self.grace).await;
        if let Err(e) = child.start_kill() {
            debug!(pid, error = %e, "root already gone");
        }
        let _ = child.wait().await;
        terminate_group(pid, self.grace).await;
    }
}

async fn collect_stderr(stderr: Option<ChildStderr>) -> String {
    let Some(mut stderr) = stderr else {
        return String::new();
    };

    let mut captured = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if captured.len() < STDERR_CAPTURE_LIMIT {
                    captured.extend_from_slice(&chunk[..n]);
                }
            }
        }
    }
    String::from_utf8_lossy(&captured).into_owned()
}

/// 读取已收集的错误输出；管道被进程组外的进程占用时放弃读取
async fn drain_stderr(mut task: tokio::task::JoinHandle<String>) -> String {
    match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, &mut task).await {
        Ok(Ok(text)) => sanitize_error(&text),
        Ok(Err(_)) => String::new(),
        Err(_) => {
            task.abort();
            String::new()
        }
    }
}

/// 终止进程树，再清理其进程组中的残留进程
pub async fn terminate_process_tree(pid: u32, grace: Duration) {
    terminate_tree(pid, grace).await;
    terminate_group(pid, grace).await;
}

/// 按父子关系终止根进程及其全部后代
///
/// 先对后代发送终止信号，等待宽限期后强杀残留者，再以同样方式处理根进程。
/// 进程已退出或无权限均视为正常。
pub async fn terminate_tree(pid: u32, grace: Duration) {
    let root = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let descendants = collect_descendants(&system, root);
    if !descendants.is_empty() {
        debug!(pid, descendants = descendants.len(), "terminating descendants");
        send_signal(&system, &descendants, Signal::Term);
        let survivors = wait_for_exit(&mut system, &descendants, grace).await;
        send_signal(&system, &survivors, Signal::Kill);
    }

    if is_alive(&system, root) {
        send_signal(&system, &[root], Signal::Term);
        let survivors = wait_for_exit(&mut system, &[root], grace).await;
        send_signal(&system, &survivors, Signal::Kill);
    }
}

fn collect_descendants(system: &System, root: Pid) -> Vec<Pid> {
    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for (pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent).or_default().push(*pid);
        }
    }

    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        if let Some(kids) = children.get(&current) {
            for kid in kids {
                if *kid != root && !found.contains(kid) {
                    found.push(*kid);
                    stack.push(*kid);
                }
            }
        }
    }
    found
}

fn is_alive(system: &System, pid: Pid) -> bool {
    system
        .process(pid)
        .is_some_and(|process| process.status() != ProcessStatus::Zombie)
}

fn send_signal(system: &System, pids: &[Pid], signal: Signal) {
    for pid in pids {
        if let Some(process) = system.process(*pid) {
            if process.kill_with(signal).is_none() && signal == Signal::Kill {
                process.kill();
            }
        }
    }
}

/// 等待进程退出，返回宽限期结束时仍存活的进程
async fn wait_for_exit(system: &mut System, pids: &[Pid], grace: Duration) -> Vec<Pid> {
    let deadline = Instant::now() + grace;
    loop {
        system.refresh_processes(ProcessesToUpdate::Some(pids), true);
        let alive: Vec<Pid> = pids
            .iter()
            .copied()
            .filter(|pid| is_alive(system, *pid))
            .collect();
        if alive.is_empty() || Instant::now() >= deadline {
            return alive;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// 终止进程组中剩余的进程
///
/// 根进程退出后被收养的孤儿进程只能通过进程组找到
#[cfg(unix)]
pub async fn terminate_group(pgid: u32, grace: Duration) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    if pgid <= 1 {
        return;
    }

    // SAFETY: killpg only delivers a signal; a missing group returns ESRCH
    if unsafe { libc::killpg(pgid, libc::SIGTERM) } != 0 {
        return;
    }

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        // SAFETY: signal 0 only checks whether the group still exists
        if unsafe { libc::killpg(pgid, 0) } != 0 {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    debug!(pgid, "process group survived grace period; killing");
    // SAFETY: as above
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
pub async fn terminate_group(_pgid: u32, _grace: Duration) {}
