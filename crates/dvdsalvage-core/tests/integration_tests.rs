//! Integration tests for dvdsalvage-core
//!
//! These tests copy extracted `VIDEO_TS` trees from temporary directories.

use dvdsalvage_core::{
    copy, list_files, second_pass, CopyConfig, CopyEvent, DiscCopier, Domain, Error, FileId,
    SkipReason, SECTOR_SIZE,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn sectors(seed: u8, count: u64) -> Vec<u8> {
    (0..count)
        .flat_map(|b| std::iter::repeat_n(seed.wrapping_add(b as u8), SECTOR_SIZE as usize))
        .collect()
}

/// A small two-title disc
fn make_disc() -> TempDir {
    let dir = TempDir::new().unwrap();
    let video_ts = dir.path().join("VIDEO_TS");
    std::fs::create_dir(&video_ts).unwrap();

    for (name, seed, blocks) in [
        ("VIDEO_TS.IFO", 1, 2),
        ("VIDEO_TS.BUP", 1, 2),
        ("VIDEO_TS.VOB", 2, 5),
        ("VTS_01_0.IFO", 3, 3),
        ("VTS_01_0.BUP", 3, 3),
        ("VTS_01_1.VOB", 4, 40),
        ("VTS_01_2.VOB", 5, 12),
        ("VTS_02_0.IFO", 6, 2),
        ("VTS_02_1.VOB", 7, 9),
    ] {
        std::fs::write(video_ts.join(name), sectors(seed, blocks)).unwrap();
    }
    dir
}

fn assert_same_tree(source: &Path, dest: &Path) {
    for entry in std::fs::read_dir(source.join("VIDEO_TS")).unwrap() {
        let entry = entry.unwrap();
        let copied = dest.join("VIDEO_TS").join(entry.file_name());
        assert_eq!(
            std::fs::read(entry.path()).unwrap(),
            std::fs::read(&copied).unwrap(),
            "{:?} differs",
            entry.file_name()
        );
    }
}

// ============================================================================
// Copy integration tests
// ============================================================================

#[test]
fn test_copy_extracted_disc() {
    let disc = make_disc();
    let out = TempDir::new().unwrap();
    let dest = out.path().join("movie");

    let summary = copy(disc.path(), &dest, CopyConfig::default()).unwrap();

    assert_eq!(summary.missing_sectors, 0);
    assert_eq!(summary.files_absent, 0);
    assert_same_tree(disc.path(), &dest);
    assert!(!dest.join("dvdsalvage.bad").exists());
}

#[test]
fn test_copy_twice_skips_everything() {
    let disc = make_disc();
    let out = TempDir::new().unwrap();

    copy(disc.path(), out.path(), CopyConfig::default()).unwrap();
    let summary = copy(disc.path(), out.path(), CopyConfig::default()).unwrap();

    assert_eq!(summary.files_copied, 0);
    assert_same_tree(disc.path(), out.path());
}

#[test]
fn test_copy_resumes_truncated_output() {
    let disc = make_disc();
    let out = TempDir::new().unwrap();
    copy(disc.path(), out.path(), CopyConfig::default()).unwrap();

    // Simulate an interrupted run in the middle of the first title
    let part1 = out.path().join("VIDEO_TS/VTS_01_1.VOB");
    let part2 = out.path().join("VIDEO_TS/VTS_01_2.VOB");
    let file = std::fs::OpenOptions::new().write(true).open(&part1).unwrap();
    file.set_len(17 * SECTOR_SIZE + 5).unwrap();
    drop(file);
    std::fs::remove_file(&part2).unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&events);
    let mut copier = DiscCopier::open(disc.path(), out.path(), CopyConfig::default())
        .unwrap()
        .on_event(move |e| {
            if let CopyEvent::FileStarted {
                id, start_block, ..
            } = e
            {
                seen.lock().unwrap().push((*id, *start_block));
            }
        });
    copier.copy_all().unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![(FileId::new(1, Domain::TitleVobs, 1), 17)]
    );
    assert_same_tree(disc.path(), out.path());
}

#[test]
fn test_copy_reports_continuations() {
    let disc = make_disc();
    let out = TempDir::new().unwrap();

    let skipped = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&skipped);
    DiscCopier::open(disc.path(), out.path(), CopyConfig::default())
        .unwrap()
        .on_event(move |e| {
            if let CopyEvent::Skipped { id, reason } = e {
                seen.lock().unwrap().push((*id, *reason));
            }
        })
        .copy_all()
        .unwrap();

    assert_eq!(
        *skipped.lock().unwrap(),
        vec![(
            FileId::new(1, Domain::TitleVobs, 2),
            SkipReason::Continuation
        )]
    );
}

#[cfg(unix)]
#[test]
fn test_shared_storage_becomes_hard_link() {
    let disc = make_disc();
    let video_ts = disc.path().join("VIDEO_TS");
    std::fs::remove_file(video_ts.join("VTS_02_0.IFO")).unwrap();
    std::fs::hard_link(video_ts.join("VTS_01_0.IFO"), video_ts.join("VTS_02_0.IFO")).unwrap();
    let out = TempDir::new().unwrap();

    let summary = copy(disc.path(), out.path(), CopyConfig::default()).unwrap();

    assert_eq!(summary.files_linked, 1);
    assert!(dvdsalvage_platform::is_same_file(
        &out.path().join("VIDEO_TS/VTS_02_0.IFO"),
        &out.path().join("VIDEO_TS/VTS_01_0.IFO")
    )
    .unwrap());
}

// ============================================================================
// Setup failures
// ============================================================================

#[test]
fn test_copy_missing_source() {
    let out = TempDir::new().unwrap();
    let result = copy(Path::new("/nonexistent/dvd"), out.path(), CopyConfig::default());
    assert!(matches!(result, Err(Error::SourceNotFound(_))));
}

#[test]
fn test_copy_source_without_video_ts() {
    let disc = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let result = copy(disc.path(), out.path(), CopyConfig::default());
    assert!(matches!(result, Err(Error::DeviceOpen { .. })));
    // Destination setup still ran
    assert!(out.path().join("VIDEO_TS").is_dir());
}

#[test]
fn test_copy_invalid_config() {
    let disc = make_disc();
    let out = TempDir::new().unwrap();
    let result = copy(
        disc.path(),
        out.path(),
        CopyConfig::new().ledger_file_name(""),
    );
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

// ============================================================================
// Repair integration tests
// ============================================================================

#[test]
fn test_second_pass_fills_recorded_gap() {
    let disc = make_disc();
    let out = TempDir::new().unwrap();
    copy(disc.path(), out.path(), CopyConfig::default()).unwrap();

    // Punch a hole and record it as if the drive had failed there
    let part = out.path().join("VIDEO_TS/VTS_02_1.VOB");
    let mut data = std::fs::read(&part).unwrap();
    data[3 * 2048..5 * 2048].fill(0);
    std::fs::write(&part, &data).unwrap();
    std::fs::write(
        out.path().join("dvdsalvage.bad"),
        "VTS_02_1.VOB: 2,3,1  3 (2)\n",
    )
    .unwrap();

    let repair = second_pass(disc.path(), out.path(), CopyConfig::default()).unwrap();

    assert_eq!(repair.outcomes.len(), 1);
    assert_eq!(repair.total_missing, 0);
    assert_same_tree(disc.path(), out.path());
}

#[test]
fn test_second_pass_without_ledger() {
    let disc = make_disc();
    let out = TempDir::new().unwrap();

    let repair = second_pass(disc.path(), out.path(), CopyConfig::default()).unwrap();
    assert!(!repair.ledger_found);
    assert_eq!(repair.total_missing, 0);
}

// ============================================================================
// Listing
// ============================================================================

#[test]
fn test_list_files_inventory() {
    let disc = make_disc();
    let table = list_files(disc.path()).unwrap();

    assert_eq!(table.len(), 9);
    let first = table.iter().next().unwrap();
    assert_eq!(first.id, FileId::new(0, Domain::Info, 1));
    assert_eq!(
        table
            .part_blocks(&FileId::new(1, Domain::TitleVobs, 1)),
        vec![40, 12]
    );
}
