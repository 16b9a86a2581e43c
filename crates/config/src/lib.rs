// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! runwatch-config: the daemon's configuration file.
//!
//! A plain TOML table (spec.md §6) parsed into a typed [`Config`]. CLI
//! argument parsing and bad-file exit codes live in `runwatch-cli`; this
//! crate only owns the shape of the file and its defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

fn default_symlinking_scanning_interval_ms() -> u64 {
    2000
}

fn default_analysis_scanning_interval_ms() -> u64 {
    5000
}

fn default_config_reload_interval_ms() -> u64 {
    30_000
}

fn default_exclude_files_reload_interval_ms() -> u64 {
    60_000
}

fn default_analysis_batch_max_size() -> usize {
    50
}

fn default_analysis_batch_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaxonAbundanceConfig {
    pub version: String,
    pub kraken_db: PathBuf,
    pub bracken_db: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutineAssemblyConfig {
    pub version: String,
    pub assembly_tool: String,
    pub annotation_tool: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MlstNfConfig {
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlasmidScreenConfig {
    pub version: String,
    pub mob_suite_db: PathBuf,
}

/// The daemon's configuration, one-to-one with the keys in spec.md §6.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub run_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub run_exclude_files: Vec<PathBuf>,
    #[serde(default)]
    pub library_exclude_files: Vec<PathBuf>,
    pub fastq_symlinks_dir: PathBuf,
    pub analysis_output_dir: PathBuf,
    pub nextflow_logs_dir: PathBuf,
    pub samplesheet_project_id: String,

    pub taxon_abundance_config: TaxonAbundanceConfig,
    pub routine_assembly_config: RoutineAssemblyConfig,
    pub mlst_nf_config: MlstNfConfig,
    pub plasmid_screen_config: PlasmidScreenConfig,

    #[serde(default = "default_symlinking_scanning_interval_ms")]
    pub symlinking_scanning_interval_ms: u64,
    #[serde(default = "default_analysis_scanning_interval_ms")]
    pub analysis_scanning_interval_ms: u64,
    #[serde(default = "default_config_reload_interval_ms")]
    pub config_reload_interval_ms: u64,
    #[serde(default = "default_exclude_files_reload_interval_ms")]
    pub exclude_files_reload_interval_ms: u64,

    #[serde(default = "default_analysis_batch_max_size")]
    pub analysis_batch_max_size: usize,
    #[serde(default = "default_analysis_batch_timeout_ms")]
    pub analysis_batch_timeout_ms: u64,

    /// Enables an operator REPL over a per-process socket. Parsed but not
    /// implemented by this core (spec.md §6 marks it "optional; not core").
    #[serde(default)]
    pub repl: bool,
}

impl Config {
    /// Loads and parses the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
