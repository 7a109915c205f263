// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::ffi::OsString;

use crate::domain::models::audit::AuditTask;

/// 无人值守、无沙箱的无头浏览器参数
const CHROME_FLAGS: &[&str] = &[
    "--headless=new",
    "--no-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-software-rasterizer",
    "--disable-extensions",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-background-networking",
    "--disable-sync",
    "--metrics-recording-only",
    "--mute-audio",
];

const CATEGORIES: &str = "performance,accessibility,seo,best-practices";

/// 一次外部进程调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<OsString>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// 用于日志的程序名
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// 由审计任务生成进程调用
pub trait AuditCommandBuilder: Send + Sync {
    fn build(&self, task: &AuditTask) -> CommandSpec;
}

/// Lighthouse 调用
#[derive(Debug, Clone)]
pub struct LighthouseCommand {
    binary: String,
    max_wait_for_load_ms: u64,
}

impl LighthouseCommand {
    pub fn new(binary: impl Into<String>, max_wait_for_load_ms: u64) -> Self {
        Self {
            binary: binary.into(),
            max_wait_for_load_ms,
        }
    }
}

impl AuditCommandBuilder for LighthouseCommand {
    fn build(&self, task: &AuditTask) -> CommandSpec {
        let mut output_path = OsString::from("--output-path=");
        output_path.push(task.output_base().as_os_str());

        let args: Vec<OsString> = vec![
            task.url().into(),
            "--preset=desktop".into(),
            format!("--only-categories={}", CATEGORIES).into(),
            "--output=json".into(),
            "--output=html".into(),
            output_path,
            "--save-assets".into(),
            "--quiet".into(),
            format!("--chrome-flags={}", CHROME_FLAGS.join(" ")).into(),
            format!("--max-wait-for-load={}", self.max_wait_for_load_ms).into(),
        ];

        CommandSpec {
            program: OsString::from(&self.binary),
            args,
        }
    }
}
