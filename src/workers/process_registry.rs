// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::workers::process_tree::terminate_process_tree;

#[derive(Debug, Default)]
struct RegistryInner {
    pids: Mutex<HashSet<u32>>,
    swept: AtomicBool,
}

/// 存活进程登记表
///
/// 生命周期限定在一次审计运行内，由所有并发的进程树与中断处理共享
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<RegistryInner>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pid: u32) {
        self.inner.pids.lock().insert(pid);
    }

    /// 移除登记，返回其是否仍在表中
    pub fn unregister(&self, pid: u32) -> bool {
        self.inner.pids.lock().remove(&pid)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.inner.pids.lock().contains(&pid)
    }

    pub fn snapshot(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.inner.pids.lock().iter().copied().collect();
        pids.sort_unstable();
        pids
    }

    pub fn len(&self) -> usize {
        self.inner.pids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.pids.lock().is_empty()
    }

    pub fn has_swept(&self) -> bool {
        self.inner.swept.load(Ordering::SeqCst)
    }

    /// 终止所有登记的进程树
    ///
    /// 只在第一次调用时生效，重复调用（如连续两次 Ctrl-C）直接返回 0
    pub async fn sweep(&self, grace: Duration) -> usize {
        if self.inner.swept.swap(true, Ordering::SeqCst) {
            return 0;
        }

        let pids: Vec<u32> = self.inner.pids.lock().drain().collect();
        if pids.is_empty() {
            return 0;
        }

        info!(count = pids.len(), "sweeping live audit processes");
        let count = pids.len();
        join_all(pids.into_iter().map(|pid| terminate_process_tree(pid, grace))).await;
        count
    }
}
