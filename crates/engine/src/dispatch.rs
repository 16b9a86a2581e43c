// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C8: the stage dispatcher — groups a batch by event kind and
//! library-year, invokes the appropriate external pipeline per group, and
//! emits downstream completion events.

use crate::bus::Bus;
use runwatch_config::{MlstNfConfig, PlasmidScreenConfig, RoutineAssemblyConfig, TaxonAbundanceConfig};
use runwatch_core::{year_of, BusMessage, Event, LibraryId, Payload};
use runwatch_adapters::{PipelineInvocation, PipelineRunner};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// One library's row of inputs as it flows through a (kind, year)
/// partition: which fields are populated depends on the upstream event.
#[derive(Debug, Clone)]
struct LibraryRow {
    id: LibraryId,
    r1: Option<PathBuf>,
    r2: Option<PathBuf>,
    assembly: Option<PathBuf>,
}

fn current_year_partition() -> String {
    format!("{:02}", chrono::Utc::now().format("%y"))
}

fn partition_key(id: &LibraryId) -> String {
    year_of(id.as_str()).unwrap_or_else(current_year_partition)
}

/// Groups a batch's domain events by kind, then by library-year.
fn group_batch(batch: Vec<BusMessage>) -> (HashMap<String, Vec<LibraryRow>>, HashMap<String, Vec<LibraryRow>>) {
    let mut symlinks_created: HashMap<String, Vec<LibraryRow>> = HashMap::new();
    let mut assembly_completed: HashMap<String, Vec<LibraryRow>> = HashMap::new();

    for msg in batch {
        let Payload::Event(event) = msg.payload else {
            continue;
        };
        match event {
            Event::SymlinksCreated { id, symlink_paths } => {
                let year = partition_key(&id);
                symlinks_created.entry(year).or_default().push(LibraryRow {
                    id,
                    r1: Some(symlink_paths.r1),
                    r2: Some(symlink_paths.r2),
                    assembly: None,
                });
            }
            Event::AssemblyCompleted {
                id,
                r1_path,
                r2_path,
                assembly_path,
                ..
            } => {
                let year = partition_key(&id);
                assembly_completed.entry(year).or_default().push(LibraryRow {
                    id,
                    r1: Some(r1_path),
                    r2: Some(r2_path),
                    assembly: Some(assembly_path),
                });
            }
            _ => {}
        }
    }

    (symlinks_created, assembly_completed)
}

fn major_minor(version: &str) -> String {
    version.splitn(3, '.').take(2).collect::<Vec<_>>().join(".")
}

fn pipeline_outdir(analysis_output_dir: &Path, year: &str, lib_id: &LibraryId, pipeline_short: &str, version: &str) -> PathBuf {
    analysis_output_dir
        .join(year)
        .join(lib_id.as_str())
        .join(format!("{pipeline_short}-{}-output", major_minor(version)))
}

/// Writes a sample sheet with one row per library, columns chosen by the
/// caller, at `path`.
fn write_sample_sheet(path: &Path, header: &str, rows: &[String]) -> std::io::Result<()> {
    let mut contents = String::from(header);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    std::fs::write(path, contents)
}

/// Recursively sets directories to 0750 and files to 0640 under `root`.
fn chmod_output_tree(root: &Path) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            let _ = runwatch_adapters::fs::set_mode(&path, 0o750);
            chmod_output_tree(&path);
        } else {
            let _ = runwatch_adapters::fs::set_mode(&path, 0o640);
        }
    }
    let _ = runwatch_adapters::fs::set_mode(root, 0o750);
}

/// Configuration the dispatcher needs beyond what's baked into each
/// pipeline invocation's arguments.
pub struct DispatcherConfig {
    pub analysis_output_dir: PathBuf,
    pub nextflow_logs_dir: PathBuf,
    pub taxon_abundance: TaxonAbundanceConfig,
    pub routine_assembly: RoutineAssemblyConfig,
    pub mlst_nf: MlstNfConfig,
    pub plasmid_screen: PlasmidScreenConfig,
}

pub struct StageDispatcher {
    config: DispatcherConfig,
    runner: Arc<dyn PipelineRunner>,
    bus: Arc<Bus>,
}

impl StageDispatcher {
    pub fn new(config: DispatcherConfig, runner: Arc<dyn PipelineRunner>, bus: Arc<Bus>) -> Self {
        Self { config, runner, bus }
    }

    pub async fn handle_batch(&self, batch: Vec<BusMessage>) {
        let (symlinks_created, assembly_completed) = group_batch(batch);

        let mut joins = tokio::task::JoinSet::new();
        for (year, rows) in symlinks_created {
            let rows = Arc::new(rows);
            self.spawn_routine_assembly(&mut joins, year.clone(), rows.clone());
            self.spawn_taxon_abundance(&mut joins, year, rows);
        }
        for (year, rows) in assembly_completed {
            let rows = Arc::new(rows);
            self.spawn_mlst(&mut joins, year.clone(), rows.clone());
            self.spawn_plasmid_screen(&mut joins, year, rows);
        }

        while let Some(result) = joins.join_next().await {
            if let Err(err) = result {
                error!(error = %err, "pipeline invocation task panicked");
            }
        }
    }

    fn spawn_routine_assembly(&self, joins: &mut tokio::task::JoinSet<()>, year: String, rows: Arc<Vec<LibraryRow>>) {
        let cfg = self.config.routine_assembly.clone();
        let invoker = self.invoker();
        joins.spawn(async move {
            let rows_for_sheet: Vec<String> = rows
                .iter()
                .filter_map(|r| Some(format!("{},{},{}", r.id, r.r1.as_ref()?.display(), r.r2.as_ref()?.display())))
                .collect();
            let args = vec![
                "--version".to_string(),
                cfg.version.clone(),
                "--assembly-tool".to_string(),
                cfg.assembly_tool.clone(),
                "--annotation-tool".to_string(),
                cfg.annotation_tool.clone(),
            ];
            invoker
                .run_partition(
                    "routine-assembly",
                    &cfg.version,
                    &year,
                    "ID,R1,R2",
                    rows_for_sheet,
                    args,
                    rows.as_ref(),
                    CompletionKind::Assembly {
                        assembly_tool: cfg.assembly_tool.clone(),
                        annotation_tool: cfg.annotation_tool.clone(),
                    },
                )
                .await;
        });
    }

    fn spawn_taxon_abundance(&self, joins: &mut tokio::task::JoinSet<()>, year: String, rows: Arc<Vec<LibraryRow>>) {
        let cfg = self.config.taxon_abundance.clone();
        let invoker = self.invoker();
        joins.spawn(async move {
            let rows_for_sheet: Vec<String> = rows
                .iter()
                .filter_map(|r| Some(format!("{},{},{}", r.id, r.r1.as_ref()?.display(), r.r2.as_ref()?.display())))
                .collect();
            let args = vec![
                "--version".to_string(),
                cfg.version.clone(),
                "--kraken-db".to_string(),
                cfg.kraken_db.display().to_string(),
                "--bracken-db".to_string(),
                cfg.bracken_db.display().to_string(),
            ];
            invoker
                .run_partition(
                    "taxon-abundance",
                    &cfg.version,
                    &year,
                    "ID,R1,R2",
                    rows_for_sheet,
                    args,
                    rows.as_ref(),
                    CompletionKind::None,
                )
                .await;
        });
    }

    fn spawn_mlst(&self, joins: &mut tokio::task::JoinSet<()>, year: String, rows: Arc<Vec<LibraryRow>>) {
        let cfg = self.config.mlst_nf.clone();
        let invoker = self.invoker();
        joins.spawn(async move {
            let rows_for_sheet: Vec<String> = rows
                .iter()
                .filter_map(|r| Some(format!("{},{}", r.id, r.assembly.as_ref()?.display())))
                .collect();
            let args = vec!["--version".to_string(), cfg.version.clone()];
            invoker
                .run_partition("mlst", &cfg.version, &year, "ID,ASSEMBLY", rows_for_sheet, args, rows.as_ref(), CompletionKind::Mlst)
                .await;
        });
    }

    fn spawn_plasmid_screen(&self, joins: &mut tokio::task::JoinSet<()>, year: String, rows: Arc<Vec<LibraryRow>>) {
        let cfg = self.config.plasmid_screen.clone();
        let invoker = self.invoker();
        joins.spawn(async move {
            let rows_for_sheet: Vec<String> = rows
                .iter()
                .filter_map(|r| {
                    Some(format!(
                        "{},{},{},{}",
                        r.id,
                        r.r1.as_ref()?.display(),
                        r.r2.as_ref()?.display(),
                        r.assembly.as_ref()?.display()
                    ))
                })
                .collect();
            let args = vec![
                "--version".to_string(),
                cfg.version.clone(),
                "--mob-suite-db".to_string(),
                cfg.mob_suite_db.display().to_string(),
            ];
            invoker
                .run_partition(
                    "plasmid-screen",
                    &cfg.version,
                    &year,
                    "ID,R1,R2,ASSEMBLY",
                    rows_for_sheet,
                    args,
                    rows.as_ref(),
                    CompletionKind::PlasmidScreen,
                )
                .await;
        });
    }

    fn invoker(&self) -> Invoker {
        Invoker {
            analysis_output_dir: self.config.analysis_output_dir.clone(),
            nextflow_logs_dir: self.config.nextflow_logs_dir.clone(),
            runner: self.runner.clone(),
            bus: self.bus.clone(),
        }
    }
}

/// What per-library completion event(s) to emit once an invocation
/// succeeds, and the paths it needs to populate them. `None` means the
/// pipeline has no per-library completion event defined by spec.md §3
/// (taxon-abundance's result is observed only via its marker file).
enum CompletionKind {
    None,
    Assembly { assembly_tool: String, annotation_tool: String },
    Mlst,
    PlasmidScreen,
}

/// Bundles the dependencies one pipeline invocation needs, so each
/// `spawn_*` closure only has to carry its own config and rows.
struct Invoker {
    analysis_output_dir: PathBuf,
    nextflow_logs_dir: PathBuf,
    runner: Arc<dyn PipelineRunner>,
    bus: Arc<Bus>,
}

impl Invoker {
    #[allow(clippy::too_many_arguments)]
    async fn run_partition(
        &self,
        pipeline_short: &str,
        version: &str,
        year: &str,
        sheet_header: &str,
        sheet_rows: Vec<String>,
        extra_args: Vec<String>,
        rows: &[LibraryRow],
        completion: CompletionKind,
    ) {
        if sheet_rows.is_empty() {
            return;
        }

        let invocation_id = uuid::Uuid::new_v4().to_string();
        let timestamp_digits = chrono::Utc::now().timestamp_millis();
        let tmp = std::env::temp_dir();
        let work_dir = tmp.join(format!("work-{pipeline_short}-{invocation_id}"));
        let sheet_path = tmp.join(format!("runwatch-{invocation_id}.csv"));
        let log_path = self
            .nextflow_logs_dir
            .join(format!("{timestamp_digits}-{pipeline_short}-nextflow.log"));
        let output_dir = self.analysis_output_dir.join(year);

        if runwatch_adapters::fs::make_directory_tree(&work_dir).is_err() {
            error!(pipeline = pipeline_short, "failed to create work directory");
            return;
        }
        if let Err(e) = write_sample_sheet(&sheet_path, sheet_header, &sheet_rows) {
            error!(pipeline = pipeline_short, error = %e, "failed to write sample sheet");
            return;
        }
        if runwatch_adapters::fs::make_directory_tree(&output_dir).is_err()
            || runwatch_adapters::fs::set_mode(&output_dir, 0o750).is_err()
        {
            error!(pipeline = pipeline_short, "failed to prepare output directory");
            return;
        }

        let mut args = vec!["--samplesheet".to_string(), sheet_path.display().to_string()];
        args.extend(extra_args);

        let invocation = PipelineInvocation {
            pipeline: pipeline_short.to_string(),
            args,
            work_dir: work_dir.clone(),
            log_path,
        };

        self.publish(Event::AnalysisStarted {
            pipeline_name: pipeline_short.to_string(),
            id: invocation_id.clone(),
        })
        .await;

        let outcome = self.runner.run(&invocation).await;

        chmod_output_tree(&output_dir);
        let _ = runwatch_adapters::fs::remove_tree(&work_dir);
        let _ = std::fs::remove_file(&sheet_path);

        match outcome {
            Ok(outcome) if outcome.succeeded() => {
                info!(pipeline = pipeline_short, year, "invocation succeeded");
                self.publish(Event::AnalysisCompleted {
                    pipeline_name: pipeline_short.to_string(),
                    pipeline_version: version.to_string(),
                    id: invocation_id,
                    outdir: output_dir.clone(),
                })
                .await;
                self.mark_complete_and_publish(pipeline_short, version, year, rows, &completion).await;
            }
            Ok(outcome) => {
                warn!(pipeline = pipeline_short, exit_code = outcome.exit_code, "invocation failed, not retrying");
            }
            Err(err) => {
                error!(pipeline = pipeline_short, error = %err, "invocation could not be run");
            }
        }
    }

    async fn mark_complete_and_publish(
        &self,
        pipeline_short: &str,
        version: &str,
        year: &str,
        rows: &[LibraryRow],
        completion: &CompletionKind,
    ) {
        let timestamp = chrono::Utc::now().to_rfc3339();
        for row in rows {
            let outdir = pipeline_outdir(&self.analysis_output_dir, year, &row.id, pipeline_short, version);
            if runwatch_adapters::fs::make_directory_tree(&outdir).is_err() {
                continue;
            }
            let marker = format!("{{\"timestamp\":\"{timestamp}\"}}");
            if std::fs::write(outdir.join("analysis_complete.json"), marker).is_err() {
                continue;
            }

            let event = match completion {
                CompletionKind::None => None,
                CompletionKind::Assembly {
                    assembly_tool,
                    annotation_tool,
                } => Some(Event::AssemblyCompleted {
                    id: row.id.clone(),
                    r1_path: row.r1.clone().unwrap_or_default(),
                    r2_path: row.r2.clone().unwrap_or_default(),
                    assembly_path: outdir.join("assembly.fasta"),
                    assembly_tool: assembly_tool.clone(),
                    annotation_tool: annotation_tool.clone(),
                }),
                CompletionKind::Mlst => Some(Event::MlstCompleted {
                    id: row.id.clone(),
                    mlst_sequence_type_path: outdir.join("mlst.tsv"),
                }),
                CompletionKind::PlasmidScreen => Some(Event::PlasmidScreenCompleted {
                    id: row.id.clone(),
                    resistance_gene_report_path: outdir.join("plasmid_screen_report.tsv"),
                }),
            };

            if let Some(event) = event {
                self.publish(event).await;
            }
        }
    }

    async fn publish(&self, event: Event) {
        for topic in event.topics() {
            self.bus
                .publish(BusMessage::event(*topic, chrono::Utc::now(), event.clone()))
                .await;
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
