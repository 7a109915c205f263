// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use leadgen_audit::config::settings::{AuditSettings, DiscoverySettings};
use leadgen_audit::domain::services::discovery_service::DiscoveryEngine;
use leadgen_audit::infrastructure::observability::metrics;
use leadgen_audit::infrastructure::search::{ProviderSelection, SearchProviderFactory};
use leadgen_audit::utils::artifacts::{ensure_writable, read_targets, write_domains};
use leadgen_audit::utils::errors::ConfigurationError;
use leadgen_audit::utils::robots::RobotsPolicy;
use leadgen_audit::utils::telemetry;
use leadgen_audit::workers::{AuditOrchestrator, AuditReport, LighthouseCommand};

/// 配置错误（含输出路径不可写）
const EXIT_CONFIG: u8 = 2;
/// 没有可用的搜索提供方
const EXIT_NO_PROVIDERS: u8 = 3;
/// 审计被中断
const EXIT_INTERRUPTED: u8 = 130;

/// 失败列表最多显示的条数
const MAX_LISTED_FAILURES: usize = 20;

/// Discover candidate domains and audit them with Lighthouse.
#[derive(Parser)]
#[command(name = "leadgen-audit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit one JSON object per log record
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query search providers for each keyword and write the domain list
    Discover {
        /// Configuration file with keywords and providers
        #[arg(short, long)]
        config: PathBuf,

        /// Output file, one domain per line
        #[arg(short, long)]
        output: PathBuf,

        /// Restrict to one provider: google, duckduckgo or all
        #[arg(long, default_value_t = ProviderSelection::All)]
        provider: ProviderSelection,

        /// Maximum results requested per provider call
        #[arg(long, default_value_t = 100)]
        max_results: usize,

        /// Run discovery without writing the output file
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the audit tool against every domain in a list
    Audit {
        /// Domain list produced by `discover`
        #[arg(short, long)]
        domains: PathBuf,

        /// Configuration file with an `audit` section
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of parallel workers
        #[arg(long)]
        workers: Option<usize>,

        /// Hard timeout per domain in seconds
        #[arg(long)]
        timeout_seconds: Option<u64>,

        /// Directory for audit results
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.log_json);
    metrics::describe_metrics();

    match cli.command {
        Commands::Discover {
            config,
            output,
            provider,
            max_results,
            dry_run,
        } => run_discover(config, output, provider, max_results, dry_run).await,
        Commands::Audit {
            domains,
            config,
            workers,
            timeout_seconds,
            output_dir,
        } => run_audit(domains, config, workers, timeout_seconds, output_dir).await,
    }
}

async fn run_discover(
    config: PathBuf,
    output: PathBuf,
    selection: ProviderSelection,
    max_results: usize,
    dry_run: bool,
) -> Result<ExitCode> {
    let settings = match DiscoverySettings::load(&config) {
        Ok(settings) => settings,
        Err(e) => return Ok(fatal(&e, EXIT_CONFIG)),
    };

    if !dry_run {
        if let Err(e) = ensure_writable(&output) {
            return Ok(fatal(&e, EXIT_CONFIG));
        }
    }

    let robots = RobotsPolicy::new();
    let providers =
        match SearchProviderFactory::create_providers(&settings, selection, &robots).await {
            Ok(providers) => providers,
            Err(e @ ConfigurationError::NoProviders) => return Ok(fatal(&e, EXIT_NO_PROVIDERS)),
            Err(e) => return Ok(fatal(&e, EXIT_CONFIG)),
        };

    info!(
        keywords = settings.keywords.len(),
        providers = providers.len(),
        max_results,
        "discovery started"
    );

    let mut engine = DiscoveryEngine::new(providers);
    let report = engine.run(&settings.keywords, max_results).await;

    if dry_run {
        info!(domains = report.domains.len(), "dry run; output not written");
    } else {
        write_domains(&output, &report.domains)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }

    info!(
        keywords = settings.keywords.len(),
        domains = report.domains.len(),
        output = %output.display(),
        dry_run,
        collected_at = %Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        usage = %report.usage.to_json(),
        "discovery summary"
    );

    Ok(ExitCode::SUCCESS)
}

async fn run_audit(
    domains_path: PathBuf,
    config: Option<PathBuf>,
    workers: Option<usize>,
    timeout_seconds: Option<u64>,
    output_dir: Option<PathBuf>,
) -> Result<ExitCode> {
    let mut settings = match AuditSettings::load(config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => return Ok(fatal(&e, EXIT_CONFIG)),
    };
    if let Some(workers) = workers {
        settings.workers = workers;
    }
    if let Some(timeout) = timeout_seconds {
        settings.timeout_seconds = timeout;
    }
    if let Some(dir) = output_dir {
        settings.output_dir = dir;
    }
    if let Err(e) = settings.validate() {
        return Ok(fatal(&e, EXIT_CONFIG));
    }

    let targets = read_targets(&domains_path)?;
    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!("failed to create {}", settings.output_dir.display())
    })?;

    let command = Arc::new(LighthouseCommand::new(
        settings.binary.clone(),
        settings.max_wait_for_load_ms,
    ));
    let orchestrator = AuditOrchestrator::new(command, settings.output_dir.clone());

    println!("[RUN] Parallel audit with {} workers", settings.workers);
    println!("[RUN] Processing {} domains", targets.len());

    let report = orchestrator
        .run(&targets, settings.workers, settings.timeout())
        .await;
    print_summary(&report, targets.len(), &settings);

    if report.interrupted {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary(report: &AuditReport, total: usize, settings: &AuditSettings) {
    let total = total.max(1) as f64;
    let elapsed = report.elapsed.as_secs_f64();

    println!();
    println!("{}", "=".repeat(60));
    println!("AUDIT SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Total domains:  {}", report.total());
    println!(
        "Successful:     {} ({:.1}%)",
        report.succeeded,
        report.succeeded as f64 / total * 100.0
    );
    println!(
        "Failed:         {} ({:.1}%)",
        report.failed,
        report.failed as f64 / total * 100.0
    );
    println!("Total time:     {:.1}s ({:.1} min)", elapsed, elapsed / 60.0);
    println!("Avg time:       {:.1}s per domain", elapsed / total);
    if report.interrupted {
        println!("Interrupted:    yes");
    }

    if report.failed > 0 {
        println!();
        println!("Failed domains:");
        for outcome in report.failures().take(MAX_LISTED_FAILURES) {
            println!(
                "  • {}: {}",
                outcome.url,
                outcome.error.as_deref().unwrap_or("Unknown error")
            );
        }
    }

    println!();
    println!("Output: {}", settings.output_dir.display());
    println!("{}", "=".repeat(60));
}

fn fatal(err: &dyn std::fmt::Display, code: u8) -> ExitCode {
    error!(error = %err, "fatal error");
    eprintln!("ERROR: {}", err);
    ExitCode::from(code)
}
