// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sample-sheet reader.
//!
//! Spec.md §1 names this an external collaborator ("the core calls a
//! supplied function that returns the library identifiers of interest")
//! and §4.5/§8 pin down its exact contract. We model the contract as a
//! trait so the engine can be exercised against a fake, and ship a CSV
//! reference implementation that satisfies the contract end to end.

use runwatch_core::LibraryId;

/// Extracts the library ids of interest from a parsed sample sheet.
pub trait SampleSheetReader: Send + Sync {
    /// Returns the library ids whose row's `project_id_col` equals
    /// `project_id`, within the section introduced by `section_header`.
    ///
    /// `lines` is the sample-sheet file split on newlines. Rows with fewer
    /// columns than `project_id_col`/`library_id_col` require are treated
    /// as having an empty string in the missing column (so they simply
    /// never match `project_id` rather than panicking or erroring).
    fn libraries_of_interest(
        &self,
        lines: &[String],
        section_header: &str,
        project_id: &str,
        project_id_col: usize,
        library_id_col: usize,
    ) -> Vec<LibraryId>;
}

/// Reference sample-sheet reader for Illumina-style comma-separated sheets.
#[derive(Debug, Clone, Default)]
pub struct CsvSampleSheetReader;

/// Number of lines immediately after the section header that are skipped
/// unconditionally: the column-name row and the blank/secondary row that
/// Illumina sample sheets always place right under a `[Data]`/`[Cloud_Data]`
/// header.
const HEADER_ROWS_SKIPPED: usize = 2;

fn column(row: &[&str], index: usize) -> &str {
    row.get(index).copied().unwrap_or("")
}

impl SampleSheetReader for CsvSampleSheetReader {
    fn libraries_of_interest(
        &self,
        lines: &[String],
        section_header: &str,
        project_id: &str,
        project_id_col: usize,
        library_id_col: usize,
    ) -> Vec<LibraryId> {
        let Some(header_idx) = lines.iter().position(|line| line.trim() == section_header) else {
            return Vec::new();
        };

        let data_start = header_idx + 1 + HEADER_ROWS_SKIPPED;
        lines
            .iter()
            .skip(data_start)
            .take_while(|line| !line.trim_start().starts_with('['))
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let row: Vec<&str> = line.split(',').collect();
                if column(&row, project_id_col) == project_id {
                    Some(LibraryId::from(column(&row, library_id_col)))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "samplesheet_tests.rs"]
mod tests;
