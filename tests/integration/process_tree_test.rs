// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

#![cfg(unix)]

use leadgen_audit::workers::process_tree::terminate_process_tree;
use leadgen_audit::workers::{CommandSpec, ProcessRegistry, ProcessTree};
use std::path::Path;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

fn read_pids(path: &Path) -> Vec<u32> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(|p| p.parse().ok())
        .collect()
}

async fn wait_for_pids(path: &Path, count: usize) -> Vec<u32> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let pids = read_pids(path);
        if pids.len() >= count || Instant::now() > deadline {
            return pids;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn running(pids: &[u32]) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    pids.iter()
        .copied()
        .filter(|pid| {
            system
                .process(Pid::from_u32(*pid))
                .is_some_and(|p| p.status() != ProcessStatus::Zombie)
        })
        .collect()
}

#[tokio::test]
async fn test_timeout_terminates_whole_tree() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pids");
    let script = format!(
        "sleep 30 & echo \"$$ $!\" > '{}'; wait",
        pid_file.display()
    );

    let registry = ProcessRegistry::new();
    let tree = ProcessTree::new(registry.clone()).with_grace(Duration::from_millis(300));

    let started = Instant::now();
    let outcome = tree
        .run(
            "https://hangs.com",
            &CommandSpec::new("sh", ["-c", script.as_str()]),
            Duration::from_secs(1),
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Timeout after 1s"));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(registry.is_empty());

    let pids = read_pids(&pid_file);
    assert_eq!(pids.len(), 2, "script should record root and child pids");
    assert!(running(&pids).is_empty(), "processes survived: {:?}", running(&pids));
}

#[tokio::test]
async fn test_registry_tracks_live_process() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pid");
    let script = format!("echo $$ > '{}'; sleep 1", pid_file.display());

    let registry = ProcessRegistry::new();
    let tree = ProcessTree::new(registry.clone());
    let command = CommandSpec::new("sh", ["-c", script.as_str()]);

    let run = tree.run("https://tracked.com", &command, Duration::from_secs(10));
    let observe = async {
        let pids = wait_for_pids(&pid_file, 1).await;
        (pids.clone(), registry.snapshot())
    };
    let (outcome, (pids, snapshot)) = tokio::join!(run, observe);

    assert!(outcome.success);
    assert_eq!(pids.len(), 1);
    assert_eq!(snapshot, pids);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_terminate_tolerates_missing_process() {
    let started = Instant::now();
    // a pid far above the usual pid_max
    terminate_process_tree(4_000_000, Duration::from_millis(100)).await;
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_sweep_kills_registered_trees() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pids");
    let script = format!(
        "sleep 30 & echo \"$$ $!\" > '{}'; wait",
        pid_file.display()
    );

    let mut child = tokio::process::Command::new("sh")
        .args(["-c", script.as_str()])
        .process_group(0)
        .kill_on_drop(true)
        .spawn()
        .unwrap();
    let pid = child.id().unwrap();
    let pids = wait_for_pids(&pid_file, 2).await;
    assert_eq!(pids.len(), 2, "script should record root and child pids");

    let registry = ProcessRegistry::new();
    registry.register(pid);

    let swept = registry.sweep(Duration::from_millis(300)).await;
    assert_eq!(swept, 1);
    assert!(registry.is_empty());
    assert!(registry.has_swept());

    // reap the root so it does not linger as a zombie
    tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .expect("root should exit after sweep")
        .unwrap();
    assert!(running(&pids).is_empty(), "processes survived: {:?}", running(&pids));

    // a second sweep is a no-op
    registry.register(pid);
    assert_eq!(registry.sweep(Duration::from_millis(300)).await, 0);
}
