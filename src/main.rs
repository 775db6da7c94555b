//! Scenario runner for my_first_app
//!
//! Runs every registered scenario against `alice` and `bob` and prints a TAP
//! report on stdout. The exit code is 0 only if every assertion passed.
//!
//! Usage:
//!   my-first-app-test
//!   my-first-app-test --dna dist/my_first_app.dna.json --concurrent
//!   my-first-app-test --only "commitment" -v

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use diorama_core::logging::{write_run_metadata, JsonlLayer, RunMetadata};
use diorama_scenarios::{Diorama, ExecutorPolicy};
use my_first_app::{config, scenarios, DEFAULT_DNA_PATH};

/// my_first_app scenario runner
#[derive(Parser, Debug)]
#[command(name = "my-first-app-test")]
#[command(about = "Run the my_first_app scenarios against alice and bob")]
struct Args {
    /// DNA file the instances run
    #[arg(long, default_value = DEFAULT_DNA_PATH)]
    dna: PathBuf,

    /// Run scenarios concurrently; each still gets its own instances
    #[arg(long)]
    concurrent: bool,

    /// Per-scenario time budget in seconds
    #[arg(long, env = "DIORAMA_SCENARIO_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,

    /// Log every zome call and its result
    #[arg(long)]
    debug_log: bool,

    /// Only run scenarios whose description contains this text
    #[arg(long)]
    only: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool, logs_dir: Option<&str>, run_id: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let jsonl = logs_dir.map(|dir| JsonlLayer::new(dir, run_id));
    let (jsonl_layer, jsonl_error) = match jsonl {
        Some(Ok(layer)) => (Some(layer), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let jsonl_enabled = jsonl_layer.is_some();

    // stdout carries the TAP report, so logs go to stderr
    tracing_subscriber::registry()
        .with(jsonl_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    if let Some(e) = jsonl_error {
        tracing::warn!("Failed to initialize JSONL logging: {}", e);
    } else if jsonl_enabled {
        tracing::info!(logs_dir = ?logs_dir, run = %run_id, "JSONL logging enabled");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let logs_dir = std::env::var("DIORAMA_LOGS_DIR").ok();
    let run_id = ulid::Ulid::new().to_string();
    init_tracing(args.verbose, logs_dir.as_deref(), &run_id);

    let executor = if args.concurrent {
        ExecutorPolicy::Concurrent
    } else {
        ExecutorPolicy::Sequential
    };
    let config = config(&args.dna)
        .debug_log(args.debug_log)
        .executor(executor)
        .scenario_timeout(Duration::from_secs(args.timeout_secs))
        .call_log_dir(logs_dir.as_ref().map(PathBuf::from));

    let mut diorama = Diorama::new(config)
        .with_context(|| format!("Failed to configure instances from {}", args.dna.display()))?;
    scenarios::register(&mut diorama);

    if let Some(pattern) = &args.only {
        if diorama.focus(pattern) == 0 {
            anyhow::bail!("No scenario matches '{}'", pattern);
        }
    }

    if let Some(logs_dir) = &logs_dir {
        let metadata = RunMetadata::new(
            run_id.as_str(),
            diorama.scenario_descriptions().into_iter().map(String::from).collect(),
            diorama.instance_names().into_iter().map(String::from).collect(),
        );
        if let Err(e) = write_run_metadata(logs_dir, &metadata) {
            tracing::warn!(error = %e, "Failed to write run metadata");
        }
    }

    let report = diorama.run_with_id(run_id).await;

    print!("{}", report.to_tap());
    for line in report.summary_lines() {
        tracing::info!("{}", line);
    }

    Ok(ExitCode::from(report.exit_code()))
}
