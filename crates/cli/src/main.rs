// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `runwatch`: the one CLI surface spec.md §6 describes — load a config
//! file, start the daemon, run until interrupted.

use anyhow::Context;
use clap::Parser;
use runwatch_config::Config;
use runwatch_daemon::Supervisor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Watches sequencing-instrument output directories and dispatches the
/// staged analysis pipeline as runs and libraries become available.
#[derive(Parser, Debug)]
#[command(name = "runwatch", version = env!("BUILD_GIT_HASH"), about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,
}

fn init_tracing(nextflow_logs_dir: &std::path::Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(nextflow_logs_dir).context("creating log directory")?;
    let file_appender = tracing_appender::rolling::daily(nextflow_logs_dir, "runwatch.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !cli.config.is_file() {
        eprintln!("config file not found: {}", cli.config.display());
        std::process::exit(1);
    }

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    let _tracing_guard = init_tracing(&config.nextflow_logs_dir)?;

    let supervisor = Supervisor::start(cli.config).await.context("starting supervisor")?;

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    tracing::info!("received shutdown signal");
    supervisor.shutdown().await;

    Ok(())
}
