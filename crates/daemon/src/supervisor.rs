// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor (C10): owns the process lifecycle described in
//! spec.md §4.10 — load config once, start the periodic reloaders, wire
//! the bus, start the scanners/dispatcher/consumers, honour stop signals.

use runwatch_adapters::{CsvSampleSheetReader, ProcessPipelineRunner};
use runwatch_config::Config;
use runwatch_engine::dispatch::DispatcherConfig;
use runwatch_engine::{Bus, ExclusionRegistry, LinkMaterializer, LoggingConsumer, ProgressRegistry, RunDiscoverer, StageBatcher, StageDispatcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The bus's per-subscriber channel depth. Chosen generously relative to
/// `analysis-batch-max-size` so a full analysis batch plus some headroom
/// can sit in flight without a publisher blocking under normal load.
const BUS_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] runwatch_config::ConfigError),
}

/// Re-reads the configuration file on a cadence and logs whether it
/// changed. Already-running tasks captured their configuration at start;
/// spec.md does not define live-reconfiguration semantics for them, so
/// this loop is observability only (a config edit takes effect on the
/// next process restart).
async fn run_config_reload_loop(path: PathBuf, interval: Duration, stop: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match Config::load(&path) {
                    Ok(_) => info!(path = %path.display(), "configuration reloaded"),
                    Err(err) => warn!(path = %path.display(), error = %err, "configuration reload failed, keeping running configuration"),
                }
            }
            _ = stop.cancelled() => break,
        }
    }
}

/// Consumes analysis batches from `batches` and hands each to the
/// dispatcher. Ticks on `heartbeat_interval` (`analysis-scanning-interval-ms`)
/// so the loop can be observed as alive even while idle.
async fn run_dispatch_loop(
    dispatcher: Arc<StageDispatcher>,
    mut batches: mpsc::Receiver<Vec<runwatch_core::BusMessage>>,
    heartbeat_interval: Duration,
    stop: CancellationToken,
) {
    let mut heartbeat = tokio::time::interval(heartbeat_interval);
    loop {
        tokio::select! {
            batch = batches.recv() => {
                let Some(batch) = batch else { break };
                dispatcher.handle_batch(batch).await;
            }
            _ = heartbeat.tick() => {}
            _ = stop.cancelled() => break,
        }
    }
}

/// Owns every background task's handle so the process can be torn down
/// cleanly: cancel the shared token, then await every handle.
pub struct Supervisor {
    stop: CancellationToken,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl Supervisor {
    /// Loads `config_path` once and starts every component described in
    /// spec.md §4.10.
    pub async fn start(config_path: PathBuf) -> Result<Self, SupervisorError> {
        let config = Config::load(&config_path)?;
        let stop = CancellationToken::new();
        let mut handles = Vec::new();

        let bus = Arc::new(Bus::new(BUS_CHANNEL_CAPACITY));

        let exclusions = Arc::new(ExclusionRegistry::new(
            config.run_exclude_files.clone(),
            config.library_exclude_files.clone(),
        ));
        handles.push(tokio::spawn(exclusions.clone().run_reload_loop(
            Duration::from_millis(config.exclude_files_reload_interval_ms),
            stop.child_token(),
        )));

        let progress = Arc::new(ProgressRegistry::new());

        let discoverer = Arc::new(RunDiscoverer::new(
            config.run_dirs.clone(),
            exclusions.clone(),
            progress.clone(),
            bus.clone(),
        ));
        handles.push(tokio::spawn(discoverer.run_loop(
            Duration::from_millis(config.symlinking_scanning_interval_ms),
            stop.child_token(),
        )));

        let materializer = Arc::new(LinkMaterializer::new(
            config.samplesheet_project_id.clone(),
            config.fastq_symlinks_dir.clone(),
            Arc::new(CsvSampleSheetReader),
            exclusions.clone(),
            progress.clone(),
            bus.clone(),
        ));
        let symlinking_sub = bus.subscribe(runwatch_core::Topic::Symlinking);
        handles.push(tokio::spawn(
            materializer.run_loop(symlinking_sub, stop.child_token()),
        ));

        let (batch_tx, batch_rx) = mpsc::channel(16);
        let analysis_sub = bus.subscribe(runwatch_core::Topic::Analysis);
        let batcher_stop = stop.child_token();
        let batcher = StageBatcher::new(
            config.analysis_batch_max_size,
            Duration::from_millis(config.analysis_batch_timeout_ms),
        );
        handles.push(tokio::spawn(async move {
            tokio::select! {
                _ = batcher.run_loop(analysis_sub, batch_tx) => {}
                _ = batcher_stop.cancelled() => {}
            }
        }));

        let dispatcher = Arc::new(StageDispatcher::new(
            DispatcherConfig {
                analysis_output_dir: config.analysis_output_dir.clone(),
                nextflow_logs_dir: config.nextflow_logs_dir.clone(),
                taxon_abundance: config.taxon_abundance_config.clone(),
                routine_assembly: config.routine_assembly_config.clone(),
                mlst_nf: config.mlst_nf_config.clone(),
                plasmid_screen: config.plasmid_screen_config.clone(),
            },
            Arc::new(ProcessPipelineRunner::default()),
            bus.clone(),
        ));
        handles.push(tokio::spawn(run_dispatch_loop(
            dispatcher,
            batch_rx,
            Duration::from_millis(config.analysis_scanning_interval_ms),
            stop.child_token(),
        )));

        let logging_sub = bus.subscribe(runwatch_core::Topic::Logging);
        let logging_stop = stop.child_token();
        handles.push(tokio::spawn(async move {
            LoggingConsumer::new().run_loop(logging_sub, logging_stop).await;
        }));

        handles.push(tokio::spawn(run_config_reload_loop(
            config_path,
            Duration::from_millis(config.config_reload_interval_ms),
            stop.child_token(),
        )));

        if config.repl {
            warn!("repl=true in configuration, but the operator REPL is not implemented by this core");
        }

        info!("supervisor started");
        Ok(Self { stop, handles })
    }

    /// Signals every task to stop on its next cooperative checkpoint, then
    /// waits for all of them to exit.
    pub async fn shutdown(self) {
        self.stop.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("supervisor stopped");
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
