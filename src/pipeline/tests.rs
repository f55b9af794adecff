use super::*;
use crate::aggregate::{Record, StationMap, aggregate_chunk};
use crate::error::BrcError;
use crate::reader::ReadStrategy;
use std::fs;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

/// Create a test file with the given content in the given directory and return its path.
fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn config(workers: usize, chunk_size: Option<u64>, strategy: ReadStrategy) -> PipelineConfig {
    PipelineConfig {
        workers,
        chunk_size,
        strategy,
        ..PipelineConfig::default()
    }
}

/// Deterministic measurements over a handful of stations.
fn generate_measurements(lines: usize) -> Vec<u8> {
    const STATIONS: [&str; 7] = [
        "Hamburg",
        "Bulawayo",
        "Palembang",
        "St. John's",
        "Cracow",
        "Bridgetown",
        "Istanbul",
    ];
    let mut data = Vec::new();
    let mut seed = 0x2545_f491_u32;
    for _ in 0..lines {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let station = STATIONS[(seed % STATIONS.len() as u32) as usize];
        let tenths = (seed >> 8) as i32 % 1999 - 999;
        let sign = if tenths < 0 { "-" } else { "" };
        let abs = tenths.abs();
        data.extend_from_slice(format!("{station};{sign}{}.{}\n", abs / 10, abs % 10).as_bytes());
    }
    data
}

// ──────────────────────────────────────────────────
// Reference scenarios
// ──────────────────────────────────────────────────

#[test]
fn test_reference_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_test_file(dir.path(), "m.txt", b"A;10.0\nB;-5.5\nA;20.0\n");
    for strategy in [ReadStrategy::Mmap, ReadStrategy::Read] {
        let out = run(&path, &config(2, None, strategy)).unwrap();
        assert_eq!(out, "{A=10.0/15.0/20.0, B=-5.5/-5.5/-5.5}");
    }
}

#[test]
fn test_same_key_split_across_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_test_file(dir.path(), "m.txt", b"A;10.0\nB;-5.5\nA;20.0\n");
    // Each 6-byte target lands on a '\n', so every line gets its own chunk.
    let result = aggregate_file(&path, &config(3, Some(6), ReadStrategy::Mmap)).unwrap();
    assert_eq!(result.stats.chunks, 3);
    assert_eq!(
        *result.stations.get(b"A").unwrap(),
        Record {
            count: 2,
            sum: 300,
            min: 100,
            max: 200
        }
    );
}

#[test]
fn test_missing_trailing_newline() {
    let dir = tempfile::tempdir().unwrap();
    let with = create_test_file(dir.path(), "with.txt", b"A;10.0\nB;-5.5\nA;20.0\n");
    let without = create_test_file(dir.path(), "without.txt", b"A;10.0\nB;-5.5\nA;20.0");
    for chunk_size in [None, Some(1), Some(8)] {
        let cfg = config(2, chunk_size, ReadStrategy::Mmap);
        assert_eq!(run(&with, &cfg).unwrap(), run(&without, &cfg).unwrap());
    }
}

#[test]
fn test_invalid_value_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_test_file(dir.path(), "m.txt", b"B;1.0\nA;abc\n");
    let err = run(&path, &config(2, Some(3), ReadStrategy::Mmap)).unwrap_err();
    match err {
        BrcError::Parse { offset, value } => {
            assert_eq!(offset, 6);
            assert_eq!(value, "abc");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_malformed_line_in_one_chunk_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = generate_measurements(2000);
    data.extend_from_slice(b"no delimiter here\n");
    data.extend_from_slice(&generate_measurements(2000));
    let path = create_test_file(dir.path(), "m.txt", &data);
    let err = run(&path, &config(4, Some(1024), ReadStrategy::Read)).unwrap_err();
    assert!(matches!(err, BrcError::Format { .. }), "{err}");
}

#[test]
fn test_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_test_file(dir.path(), "m.txt", b"");
    let result = aggregate_file(&path, &PipelineConfig::default()).unwrap();
    assert_eq!(result.stats.chunks, 0);
    assert_eq!(run(&path, &PipelineConfig::default()).unwrap(), "{}");
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = run(&dir.path().join("none.txt"), &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, BrcError::Io { .. }), "{err}");
}

#[cfg(unix)]
#[test]
fn test_fifo_input_fails_instead_of_reading_empty() {
    use std::os::unix::ffi::OsStrExt;
    let dir = tempfile::tempdir().unwrap();
    let fifo = dir.path().join("m.fifo");
    let c_path = std::ffi::CString::new(fifo.as_os_str().as_bytes()).unwrap();
    assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);
    for strategy in [ReadStrategy::Mmap, ReadStrategy::Read] {
        let err = run(&fifo, &config(2, None, strategy)).unwrap_err();
        assert!(matches!(err, BrcError::Io { .. }), "{err}");
        assert!(err.to_string().contains("not a regular file"), "{err}");
    }
}

// ──────────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────────

#[test]
fn test_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_test_file(dir.path(), "m.txt", b"A;1.0\n");
    let zero_workers = config(0, None, ReadStrategy::Mmap);
    assert!(matches!(run(&path, &zero_workers), Err(BrcError::Config(_))));
    let zero_chunk = config(1, Some(0), ReadStrategy::Mmap);
    assert!(matches!(run(&path, &zero_chunk), Err(BrcError::Config(_))));
    let bad_page = PipelineConfig {
        page_size: 1000,
        ..PipelineConfig::default()
    };
    assert!(matches!(bad_page.validate(), Err(BrcError::Config(_))));
}

#[test]
fn test_effective_chunk_size() {
    let cfg = config(4, None, ReadStrategy::Mmap);
    assert_eq!(cfg.effective_chunk_size(100), 25);
    assert_eq!(cfg.effective_chunk_size(101), 26);
    assert_eq!(cfg.effective_chunk_size(0), 1);
    assert_eq!(config(4, Some(64), ReadStrategy::Mmap).effective_chunk_size(100), 64);
}

#[test]
fn test_read_strategy_default_chunk_is_capped() {
    let huge = 13 * 1024 * 1024 * 1024u64;
    let read = config(8, None, ReadStrategy::Read);
    assert_eq!(read.effective_chunk_size(huge), MAX_READ_CHUNK_SIZE);
    assert_eq!(read.effective_chunk_size(1000), 125);
    // An explicit size wins, and mapping is not capped.
    assert_eq!(
        config(8, Some(1 << 30), ReadStrategy::Read).effective_chunk_size(huge),
        1 << 30
    );
    assert_eq!(
        config(8, None, ReadStrategy::Mmap).effective_chunk_size(huge),
        huge / 8
    );
}

#[test]
fn test_default_config_is_valid() {
    let cfg = PipelineConfig::default();
    assert!(cfg.workers >= 1);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_stats() {
    let dir = tempfile::tempdir().unwrap();
    let data = generate_measurements(500);
    let path = create_test_file(dir.path(), "m.txt", &data);
    let result = aggregate_file(&path, &config(3, Some(1000), ReadStrategy::Mmap)).unwrap();
    assert_eq!(result.stats.file_size, data.len() as u64);
    assert_eq!(result.stats.chunk_size, 1000);
    assert_eq!(result.stats.workers, 3);
    assert_eq!(result.stats.stations, result.stations.len());
    assert!(result.stats.chunks >= data.len() / 1100);
}

// ──────────────────────────────────────────────────
// Chunking independence
// ──────────────────────────────────────────────────

#[test]
fn test_chunk_count_and_strategy_do_not_change_result() {
    let dir = tempfile::tempdir().unwrap();
    let data = generate_measurements(20_000);
    let path = create_test_file(dir.path(), "m.txt", &data);
    let single = aggregate_chunk(&data, 0).unwrap();
    for strategy in [ReadStrategy::Mmap, ReadStrategy::Read] {
        for (workers, chunk_size) in [(1, None), (4, None), (8, Some(4096)), (3, Some(333)), (2, Some(1))] {
            let result = aggregate_file(&path, &config(workers, chunk_size, strategy)).unwrap();
            assert_eq!(result.stations, single, "{strategy:?} {workers} {chunk_size:?}");
        }
    }
}

#[test]
fn test_aggregate_bytes_matches_single_pass() {
    let data = generate_measurements(5_000);
    let single = aggregate_chunk(&data, 0).unwrap();
    for chunk_size in [1, 17, 4096, 1 << 20] {
        assert_eq!(aggregate_bytes(&data, chunk_size).unwrap(), single);
    }
    assert!(matches!(aggregate_bytes(&data, 0), Err(BrcError::Config(_))));
}

fn render(pairs: &[(u8, i32)], trailing: bool) -> Vec<u8> {
    let keys = ["Abha", "Oslo", "Tokyo", "Zagreb", "Dhaka"];
    let mut lines: Vec<String> = pairs
        .iter()
        .map(|&(k, v)| {
            let sign = if v < 0 { "-" } else { "" };
            format!("{};{}{}.{}", keys[k as usize], sign, v.abs() / 10, v.abs() % 10)
        })
        .collect();
    if trailing {
        lines.push(String::new());
    }
    lines.join("\n").into_bytes()
}

proptest! {
    #[test]
    fn prop_chunking_is_irrelevant(
        pairs in prop::collection::vec((0u8..5, -999i32..=999), 1..200),
        trailing in any::<bool>(),
        chunk_size in 1u64..256,
    ) {
        let data = render(&pairs, trailing);
        let single = aggregate_chunk(&data, 0).unwrap();
        prop_assert_eq!(aggregate_bytes(&data, chunk_size).unwrap(), single);
    }

    #[test]
    fn prop_records_hold_invariants(
        pairs in prop::collection::vec((0u8..5, -999i32..=999), 1..200),
        chunk_size in 1u64..128,
    ) {
        let data = render(&pairs, true);
        let map: StationMap = aggregate_bytes(&data, chunk_size).unwrap();
        let total: u64 = map.iter().map(|(_, r)| r.count).sum();
        prop_assert_eq!(total, pairs.len() as u64);
        for (_, r) in map.iter() {
            prop_assert!(r.count >= 1);
            prop_assert!(r.min <= r.max);
            prop_assert!(pairs.iter().any(|&(_, v)| v == r.min));
            prop_assert!(pairs.iter().any(|&(_, v)| v == r.max));
        }
    }
}
