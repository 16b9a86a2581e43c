// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use runwatch_core::Payload;
use tempfile::tempdir;

fn make_run_dir(root: &Path, name: &str, with_marker: bool) -> PathBuf {
    let path = root.join(name);
    std::fs::create_dir_all(&path).unwrap();
    if with_marker {
        std::fs::write(path.join(UPLOAD_MARKER), "{}").unwrap();
    }
    path
}

fn discoverer(root: PathBuf) -> (Arc<RunDiscoverer>, Arc<Bus>) {
    let bus = Arc::new(Bus::new(8));
    let exclusions = Arc::new(ExclusionRegistry::new(vec![], vec![]));
    exclusions.reload();
    let progress = Arc::new(ProgressRegistry::new());
    let discoverer = Arc::new(RunDiscoverer::new(vec![root], exclusions, progress, bus.clone()));
    (discoverer, bus)
}

#[tokio::test]
async fn finds_an_eligible_run_and_publishes_it() {
    let dir = tempdir().unwrap();
    let run = make_run_dir(dir.path(), "220207_M00123_0123_000000000-A7TRG", true);
    let (discoverer, bus) = discoverer(dir.path().to_path_buf());
    let mut sub = bus.subscribe(Topic::Symlinking);

    let found = discoverer.scan_once().await;
    assert_eq!(found, Some(run));

    let msg = sub.recv().await.expect("event published");
    match msg.payload {
        Payload::Event(Event::RunDirectoryFound { .. }) => {}
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn ignores_directories_missing_the_upload_marker() {
    let dir = tempdir().unwrap();
    make_run_dir(dir.path(), "220207_M00123_0123_000000000-A7TRG", false);
    let (discoverer, _bus) = discoverer(dir.path().to_path_buf());

    assert_eq!(discoverer.scan_once().await, None);
}

#[tokio::test]
async fn ignores_directories_that_dont_match_the_run_name_pattern() {
    let dir = tempdir().unwrap();
    make_run_dir(dir.path(), "not-a-run-directory", true);
    let (discoverer, _bus) = discoverer(dir.path().to_path_buf());

    assert_eq!(discoverer.scan_once().await, None);
}

#[tokio::test]
async fn excluded_runs_are_never_emitted() {
    let dir = tempdir().unwrap();
    make_run_dir(dir.path(), "220207_M00123_0123_000000000-A7TRG", true);
    let bus = Arc::new(Bus::new(8));
    let exclude_file = dir.path().join("excluded.txt");
    std::fs::write(&exclude_file, "220207_M00123_0123_000000000-A7TRG\n").unwrap();
    let exclusions = Arc::new(ExclusionRegistry::new(vec![exclude_file], vec![]));
    exclusions.reload();
    let progress = Arc::new(ProgressRegistry::new());
    let discoverer = RunDiscoverer::new(vec![dir.path().to_path_buf()], exclusions, progress, bus);

    assert_eq!(discoverer.scan_once().await, None);
}

#[tokio::test]
async fn already_promoted_runs_are_not_reemitted() {
    let dir = tempdir().unwrap();
    make_run_dir(dir.path(), "220207_M00123_0123_000000000-A7TRG", true);
    let bus = Arc::new(Bus::new(8));
    let exclusions = Arc::new(ExclusionRegistry::new(vec![], vec![]));
    exclusions.reload();
    let progress = Arc::new(ProgressRegistry::new());
    progress.mark_promoted(RunId::from("220207_M00123_0123_000000000-A7TRG".to_string()));
    let discoverer = RunDiscoverer::new(vec![dir.path().to_path_buf()], exclusions, progress, bus);

    assert_eq!(discoverer.scan_once().await, None);
}

#[tokio::test]
async fn at_most_one_run_is_emitted_per_tick_even_with_several_eligible() {
    let dir = tempdir().unwrap();
    make_run_dir(dir.path(), "220207_M00100_0001_000000000-AAAAA", true);
    make_run_dir(dir.path(), "220207_M00200_0002_000000000-BBBBB", true);
    let (discoverer, _bus) = discoverer(dir.path().to_path_buf());

    let found = discoverer.scan_once().await;
    assert!(found.is_some());
}

#[tokio::test]
async fn stop_token_ends_the_run_loop_cooperatively() {
    let dir = tempdir().unwrap();
    let (discoverer, _bus) = discoverer(dir.path().to_path_buf());
    let stop = CancellationToken::new();
    let handle = tokio::spawn(discoverer.run_loop(std::time::Duration::from_millis(5), stop.clone()));

    tokio::time::sleep(std::time::Duration::from_millis(15)).await;
    stop.cancel();
    handle.await.unwrap();
}

