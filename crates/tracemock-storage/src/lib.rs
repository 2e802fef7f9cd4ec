//! Tracemock In-Memory TSDB
//!
//! A small counter/frequency store that accepts the backfill engine's
//! writes and answers the queries a demo UI needs:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        MEMORY TSDB                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  incr_multi ───────────►┌──────────────┐   get_range         │
//! │                         │ rollup 10s   │   get_sums          │
//! │  record_frequency ─────►│ rollup 3600s │   get_most_frequent │
//! │                         └──────────────┘                     │
//! │                                │                             │
//! │                                ▼                             │
//! │                         ┌──────────────┐                     │
//! │                         │   Journal    │ (optional)          │
//! │                         └──────────────┘                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write lands in every rollup, bucketed by `ts - ts mod resolution`.

pub mod snapshot;


use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracemock_core::model::Timestamp;
use tracemock_core::{FrequencyEntry, ScopeKey, StoreError, TelemetryStore};

pub use snapshot::{CounterSeries, FrequencySeries, TsdbSnapshot};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TsdbError {
    #[error("at least one rollup is required")]
    NoRollups,
    #[error("rollup resolution must be positive (got {0}s)")]
    InvalidResolution(i64),
    #[error("duplicate rollup resolution {0}s")]
    DuplicateResolution(i64),
    #[error("no rollup with resolution {0}s")]
    UnknownResolution(i64),
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One bucketing granularity, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollup {
    pub resolution_secs: i64,
}

impl Rollup {
    pub const fn seconds(resolution_secs: i64) -> Self {
        Self { resolution_secs }
    }

    pub fn bucket(&self, ts: Timestamp) -> i64 {
        ts.timestamp().div_euclid(self.resolution_secs) * self.resolution_secs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsdbConfig {
    pub rollups: Vec<Rollup>,
    /// Keep an ordered record of every accepted write.
    pub record_journal: bool,
}

impl Default for TsdbConfig {
    fn default() -> Self {
        Self {
            rollups: vec![Rollup::seconds(10), Rollup::seconds(3600)],
            record_journal: false,
        }
    }
}

impl TsdbConfig {
    pub fn validate(&self) -> Result<(), TsdbError> {
        if self.rollups.is_empty() {
            return Err(TsdbError::NoRollups);
        }
        let mut seen = Vec::with_capacity(self.rollups.len());
        for rollup in &self.rollups {
            if rollup.resolution_secs <= 0 {
                return Err(TsdbError::InvalidResolution(rollup.resolution_secs));
            }
            if seen.contains(&rollup.resolution_secs) {
                return Err(TsdbError::DuplicateResolution(rollup.resolution_secs));
            }
            seen.push(rollup.resolution_secs);
        }
        Ok(())
    }
}

// ============================================================================
// Journal
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalOp {
    Increment { scopes: Vec<ScopeKey>, amount: u64 },
    Frequency { entries: Vec<FrequencyEntry> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub sequence: u64,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub op: JournalOp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TsdbStats {
    pub increment_calls: u64,
    pub frequency_calls: u64,
    pub counter_scopes: usize,
    pub frequency_scopes: usize,
}

// ============================================================================
// Store
// ============================================================================

/// (resolution, bucket start) → value
type Buckets<V> = BTreeMap<(i64, i64), V>;

#[derive(Debug, Default)]
struct TsdbState {
    counters: BTreeMap<ScopeKey, Buckets<u64>>,
    frequencies: BTreeMap<ScopeKey, Buckets<BTreeMap<u64, u64>>>,
    journal: Vec<JournalEntry>,
    stats: TsdbStats,
    sequence: u64,
}

pub struct MemoryTsdb {
    config: TsdbConfig,
    state: RwLock<TsdbState>,
    unavailable: AtomicBool,
}

impl MemoryTsdb {
    pub fn new(config: TsdbConfig) -> Result<Self, TsdbError> {
        config.validate()?;
        Ok(Self {
            config,
            state: RwLock::new(TsdbState::default()),
            unavailable: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &TsdbConfig {
        &self.config
    }

    /// Simulate an outage: every write fails with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory tsdb is marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn rollup(&self, resolution_secs: i64) -> Result<&Rollup, TsdbError> {
        self.config
            .rollups
            .iter()
            .find(|r| r.resolution_secs == resolution_secs)
            .ok_or(TsdbError::UnknownResolution(resolution_secs))
    }

    fn journal(&self, state: &mut TsdbState, timestamp: Timestamp, op: JournalOp) {
        state.sequence += 1;
        if self.config.record_journal {
            state.journal.push(JournalEntry {
                sequence: state.sequence,
                timestamp,
                op,
            });
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Every bucket from `start` to `end` inclusive, zero-filled.
    pub fn get_range(
        &self,
        scope: &ScopeKey,
        start: Timestamp,
        end: Timestamp,
        resolution_secs: i64,
    ) -> Result<Vec<(Timestamp, u64)>, TsdbError> {
        let rollup = self.rollup(resolution_secs)?;
        let (first, last) = (rollup.bucket(start), rollup.bucket(end));
        let state = self.state.read();
        let series = state.counters.get(scope);

        let mut out = Vec::new();
        let mut bucket = first;
        while bucket <= last {
            let value = series
                .and_then(|s| s.get(&(resolution_secs, bucket)))
                .copied()
                .unwrap_or(0);
            out.push((bucket_time(bucket), value));
            bucket += resolution_secs;
        }
        Ok(out)
    }

    pub fn get_sums(
        &self,
        scopes: &[ScopeKey],
        start: Timestamp,
        end: Timestamp,
        resolution_secs: i64,
    ) -> Result<BTreeMap<ScopeKey, u64>, TsdbError> {
        let rollup = self.rollup(resolution_secs)?;
        let range = (resolution_secs, rollup.bucket(start))..=(resolution_secs, rollup.bucket(end));
        let state = self.state.read();
        Ok(scopes
            .iter()
            .map(|scope| {
                let sum: u64 = state
                    .counters
                    .get(scope)
                    .map(|s| saturating_sum(s.range(range.clone()).map(|(_, v)| *v)))
                    .unwrap_or(0);
                (scope.clone(), sum)
            })
            .collect())
    }

    /// Sum of every bucket at `resolution_secs`.
    pub fn total(&self, scope: &ScopeKey, resolution_secs: i64) -> Result<u64, TsdbError> {
        self.rollup(resolution_secs)?;
        let state = self.state.read();
        let total: u64 = state
            .counters
            .get(scope)
            .map(|s| {
                saturating_sum(
                    s.iter()
                        .filter(|((res, _), _)| *res == resolution_secs)
                        .map(|(_, v)| *v),
                )
            })
            .unwrap_or(0);
        Ok(total)
    }

    /// Top `limit` members by accumulated weight, ties broken by member id.
    pub fn get_most_frequent(
        &self,
        scope: &ScopeKey,
        start: Timestamp,
        end: Timestamp,
        resolution_secs: i64,
        limit: usize,
    ) -> Result<Vec<(u64, u64)>, TsdbError> {
        let rollup = self.rollup(resolution_secs)?;
        let range = (resolution_secs, rollup.bucket(start))..=(resolution_secs, rollup.bucket(end));
        let state = self.state.read();

        let mut scores: BTreeMap<u64, u64> = BTreeMap::new();
        if let Some(series) = state.frequencies.get(scope) {
            for (_, members) in series.range(range) {
                for (member, weight) in members {
                    let score = scores.entry(*member).or_default();
                    *score = score.saturating_add(*weight);
                }
            }
        }
        Ok(top_k(scores, limit))
    }

    /// Accumulated weight per member over every bucket at `resolution_secs`.
    pub fn frequency_totals(
        &self,
        scope: &ScopeKey,
        resolution_secs: i64,
    ) -> Result<BTreeMap<u64, u64>, TsdbError> {
        self.rollup(resolution_secs)?;
        let state = self.state.read();
        let mut scores: BTreeMap<u64, u64> = BTreeMap::new();
        if let Some(series) = state.frequencies.get(scope) {
            for (_, members) in series.iter().filter(|((res, _), _)| *res == resolution_secs) {
                for (member, weight) in members {
                    let score = scores.entry(*member).or_default();
                    *score = score.saturating_add(*weight);
                }
            }
        }
        Ok(scores)
    }

    pub fn journal_entries(&self) -> Vec<JournalEntry> {
        self.state.read().journal.clone()
    }

    pub fn stats(&self) -> TsdbStats {
        let state = self.state.read();
        TsdbStats {
            counter_scopes: state.counters.len(),
            frequency_scopes: state.frequencies.len(),
            ..state.stats
        }
    }
}

impl TelemetryStore for MemoryTsdb {
    fn incr_multi(
        &self,
        scopes: &[ScopeKey],
        timestamp: Timestamp,
        amount: u64,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        if let Some(scope) = scopes.iter().find(|s| s.model.is_frequency()) {
            return Err(StoreError::Rejected(format!(
                "{scope} is a frequency table, not a counter"
            )));
        }

        let mut state = self.state.write();
        for scope in scopes {
            let series = state.counters.entry(scope.clone()).or_default();
            for rollup in &self.config.rollups {
                let key = (rollup.resolution_secs, rollup.bucket(timestamp));
                let value = series.entry(key).or_default();
                *value = value.saturating_add(amount);
            }
        }
        state.stats.increment_calls += 1;
        self.journal(
            &mut state,
            timestamp,
            JournalOp::Increment {
                scopes: scopes.to_vec(),
                amount,
            },
        );
        Ok(())
    }

    fn record_frequency_multi(
        &self,
        entries: &[FrequencyEntry],
        timestamp: Timestamp,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        if let Some(entry) = entries.iter().find(|e| !e.scope.model.is_frequency()) {
            return Err(StoreError::Rejected(format!(
                "{} is a counter, not a frequency table",
                entry.scope
            )));
        }

        let mut state = self.state.write();
        for entry in entries {
            let series = state.frequencies.entry(entry.scope.clone()).or_default();
            for rollup in &self.config.rollups {
                let key = (rollup.resolution_secs, rollup.bucket(timestamp));
                let members = series.entry(key).or_default();
                for (member, weight) in &entry.members {
                    let value = members.entry(*member).or_default();
                    *value = value.saturating_add(*weight);
                }
            }
        }
        state.stats.frequency_calls += 1;
        self.journal(
            &mut state,
            timestamp,
            JournalOp::Frequency {
                entries: entries.to_vec(),
            },
        );
        Ok(())
    }
}

fn bucket_time(bucket: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(bucket, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Counters saturate on write, so sums over them must too.
fn saturating_sum(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0, u64::saturating_add)
}

fn top_k(scores: BTreeMap<u64, u64>, limit: usize) -> Vec<(u64, u64)> {
    let mut ranked: Vec<(u64, u64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}
