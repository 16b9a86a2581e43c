// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;
use tempfile::tempdir;

fn write_file(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(f, "{line}").unwrap();
    }
    path
}

#[test]
fn empty_registry_excludes_nothing() {
    let registry = ExclusionRegistry::new(vec![], vec![]);
    registry.reload();
    assert!(!registry.is_run_excluded(&RunId::from("220101_M00001_0001_000000000-ABCDE".to_string())));
}

#[test]
fn reload_unions_multiple_files() {
    let dir = tempdir().unwrap();
    let f1 = write_file(dir.path(), "runs1.txt", &["run-a", "run-b"]);
    let f2 = write_file(dir.path(), "runs2.txt", &["run-c"]);
    let registry = ExclusionRegistry::new(vec![f1, f2], vec![]);
    registry.reload();

    assert!(registry.is_run_excluded(&RunId::from("run-a".to_string())));
    assert!(registry.is_run_excluded(&RunId::from("run-b".to_string())));
    assert!(registry.is_run_excluded(&RunId::from("run-c".to_string())));
    assert!(!registry.is_run_excluded(&RunId::from("run-d".to_string())));
}

#[test]
fn missing_file_is_silently_skipped() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.txt");
    let registry = ExclusionRegistry::new(vec![missing], vec![]);
    registry.reload();
    assert!(!registry.is_run_excluded(&RunId::from("whatever".to_string())));
}

#[test]
fn blank_lines_are_ignored() {
    let dir = tempdir().unwrap();
    let f = write_file(dir.path(), "runs.txt", &["run-a", "", "   ", "run-b"]);
    let registry = ExclusionRegistry::new(vec![f], vec![]);
    registry.reload();
    assert!(registry.is_run_excluded(&RunId::from("run-a".to_string())));
    assert!(registry.is_run_excluded(&RunId::from("run-b".to_string())));
}

#[test]
fn reload_replaces_rather_than_accumulates() {
    let dir = tempdir().unwrap();
    let f = dir.path().join("runs.txt");
    std::fs::write(&f, "run-a\n").unwrap();
    let registry = ExclusionRegistry::new(vec![f.clone()], vec![]);
    registry.reload();
    assert!(registry.is_run_excluded(&RunId::from("run-a".to_string())));

    std::fs::write(&f, "run-b\n").unwrap();
    registry.reload();
    assert!(!registry.is_run_excluded(&RunId::from("run-a".to_string())));
    assert!(registry.is_run_excluded(&RunId::from("run-b".to_string())));
}

#[test]
fn library_exclusion_is_independent_of_run_exclusion() {
    let dir = tempdir().unwrap();
    let runs = write_file(dir.path(), "runs.txt", &["run-a"]);
    let libraries = write_file(dir.path(), "libs.txt", &["BC21A001A"]);
    let registry = ExclusionRegistry::new(vec![runs], vec![libraries]);
    registry.reload();

    assert!(registry.is_run_excluded(&RunId::from("run-a".to_string())));
    assert!(!registry.is_library_excluded(&LibraryId::from("run-a".to_string())));
    assert!(registry.is_library_excluded(&LibraryId::from("BC21A001A".to_string())));
}

#[tokio::test]
async fn reload_loop_picks_up_changes_and_stops_on_cancellation() {
    let dir = tempdir().unwrap();
    let f = dir.path().join("runs.txt");
    std::fs::write(&f, "run-a\n").unwrap();
    let registry = Arc::new(ExclusionRegistry::new(vec![f.clone()], vec![]));

    let stop = CancellationToken::new();
    let handle = tokio::spawn(registry.clone().run_reload_loop(std::time::Duration::from_millis(5), stop.clone()));

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(registry.is_run_excluded(&RunId::from("run-a".to_string())));

    stop.cancel();
    handle.await.unwrap();
}
