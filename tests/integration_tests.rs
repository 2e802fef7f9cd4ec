//! Integration tests for the complete Tracemock pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Config file → MockLoader → MemoryTsdb
//! - Write ordering as seen by the store journal
//! - Snapshot export and reload
//!
//! Run with: cargo test --test integration_tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::tempdir;
use tracemock_core::{
    BackfillError, BackfillWindow, ConfigError, MagnitudeRange, Resolution, ScopeKey, SystemScopes,
    TsdbModel,
};
use tracemock_fixtures::{LoadConfig, LoadError, MockLoader};
use tracemock_storage::{JournalOp, MemoryTsdb, TsdbConfig, TsdbSnapshot};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}

fn journaled() -> MemoryTsdb {
    MemoryTsdb::new(TsdbConfig {
        record_journal: true,
        ..TsdbConfig::default()
    })
    .unwrap()
}

/// Short windows keep the journal small.
fn small_config(seed: u64) -> LoadConfig {
    let mut config = LoadConfig {
        seed: Some(seed),
        skip_default_setup: true,
        ..LoadConfig::default()
    };
    config.backfill.fine = BackfillWindow {
        ticks: 4,
        ..BackfillWindow::fine()
    };
    config.backfill.coarse = BackfillWindow {
        ticks: 3,
        ..BackfillWindow::coarse()
    };
    config
}

// ============================================================================
// Config file → loader
// ============================================================================

#[test]
fn test_config_file_drives_the_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tracemock.json");
    let mut config = small_config(21);
    config.num_events = 2;
    config.with_releases = false;
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = LoadConfig::from_path(&path).unwrap();
    assert_eq!(loaded, config);

    let tsdb = journaled();
    let summary = MockLoader::new(&tsdb, loaded).unwrap().run(now()).unwrap();

    // system + 6 projects x 2 events, 7 ticks each
    assert_eq!(summary.subjects(), 13);
    assert_eq!(summary.counter_calls, 13 * 7 * 3);
    assert_eq!(summary.frequency_calls, 12 * 7);
    assert_eq!(tsdb.stats().increment_calls, 13 * 7 * 3);
}

#[test]
fn test_invalid_window_is_rejected_before_any_write() {
    let mut config = small_config(1);
    config.backfill.fine.magnitude = MagnitudeRange { min: 10, max: 1 };

    let tsdb = journaled();
    let err = MockLoader::new(&tsdb, config).err().unwrap();
    assert!(matches!(
        err,
        LoadError::Config(ConfigError::EmptyMagnitudeRange { .. })
    ));
    assert!(tsdb.journal_entries().is_empty());
}

#[test]
fn test_now_near_min_time_fails_without_writes() {
    let tsdb = journaled();
    let near_min = DateTime::<Utc>::MIN_UTC + Duration::hours(1);
    let err = MockLoader::new(&tsdb, small_config(2))
        .unwrap()
        .run(near_min)
        .unwrap_err();

    match err {
        LoadError::Backfill {
            subject,
            source: BackfillError::Config(ConfigError::WindowOutOfRange { resolution }),
        } => {
            assert_eq!(subject, "system");
            assert_eq!(resolution, Resolution::Coarse);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(tsdb.journal_entries().is_empty());
}

// ============================================================================
// Write ordering
// ============================================================================

#[test]
fn test_journal_groups_writes_per_tick() {
    let tsdb = journaled();
    MockLoader::new(&tsdb, small_config(5))
        .unwrap()
        .run(now())
        .unwrap();
    let journal = tsdb.journal_entries();

    // system subject first: three counter writes per tick
    let (system, entities) = journal.split_at(7 * 3);
    assert!(system
        .iter()
        .all(|e| matches!(e.op, JournalOp::Increment { .. })));
    for tick in system.chunks(3) {
        assert!(tick.iter().all(|e| e.timestamp == tick[0].timestamp));
    }
    let fine: Vec<_> = system.chunks(3).take(4).map(|t| t[0].timestamp).collect();
    assert_eq!(fine[0], now());
    assert!(fine.windows(2).all(|w| w[0] - w[1] == Duration::seconds(1)));
    assert_eq!(system[4 * 3].timestamp, now());

    // entity ticks: three counter writes then one frequency write
    assert_eq!(entities.len(), 6 * 7 * 4);
    for tick in entities.chunks(4) {
        assert!(tick[..3]
            .iter()
            .all(|e| matches!(e.op, JournalOp::Increment { .. })));
        match &tick[3].op {
            JournalOp::Frequency { entries } => assert_eq!(entries.len(), 4),
            other => panic!("expected a frequency write, got {other:?}"),
        }
        assert!(tick.iter().all(|e| e.timestamp == tick[0].timestamp));
    }

    assert!(journal.windows(2).all(|w| w[0].sequence < w[1].sequence));
}

#[test]
fn test_rollups_agree() {
    let tsdb = journaled();
    let summary = MockLoader::new(&tsdb, small_config(13))
        .unwrap()
        .run(now())
        .unwrap();

    let requests = SystemScopes::default().requests;
    assert_eq!(
        tsdb.total(&requests, 10).unwrap(),
        tsdb.total(&requests, 3600).unwrap()
    );
    let org = ScopeKey::new(
        TsdbModel::OrganizationTotalReceived,
        summary.organization_id,
    );
    assert!(tsdb.total(&org, 3600).unwrap() > 0);
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_survives_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out").join("tsdb.json");

    let tsdb = journaled();
    let summary = MockLoader::new(&tsdb, small_config(34))
        .unwrap()
        .run(now())
        .unwrap();
    tsdb.save_snapshot(&path).unwrap();

    let snapshot = TsdbSnapshot::load(&path).unwrap();
    assert_eq!(snapshot, tsdb.snapshot());
    assert!(snapshot.counter_points() > 0);

    let restored = MemoryTsdb::from_snapshot(snapshot).unwrap();
    for project in &summary.projects {
        let scope = ScopeKey::new(TsdbModel::Project, project.id);
        assert_eq!(
            restored.total(&scope, 3600).unwrap(),
            tsdb.total(&scope, 3600).unwrap()
        );
        let issues = ScopeKey::new(TsdbModel::FrequentIssuesByProject, project.id);
        assert_eq!(
            restored.frequency_totals(&issues, 3600).unwrap(),
            tsdb.frequency_totals(&issues, 3600).unwrap()
        );
    }
}
