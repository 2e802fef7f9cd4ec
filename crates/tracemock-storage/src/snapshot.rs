//! JSON snapshots of the store contents.
//!
//! Scope keys are structs, so series are written as flat lists rather than
//! as JSON objects keyed by scope.

use crate::{MemoryTsdb, TsdbConfig, TsdbError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracemock_core::ScopeKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSeries {
    pub scope: ScopeKey,
    pub resolution_secs: i64,
    /// (bucket start, unix seconds) → value, ascending.
    pub points: Vec<(i64, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencySeries {
    pub scope: ScopeKey,
    pub resolution_secs: i64,
    pub buckets: Vec<(i64, BTreeMap<u64, u64>)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsdbSnapshot {
    pub config: TsdbConfig,
    pub counters: Vec<CounterSeries>,
    pub frequencies: Vec<FrequencySeries>,
}

impl TsdbSnapshot {
    pub fn load(path: &Path) -> Result<Self, TsdbError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn counter_points(&self) -> usize {
        self.counters.iter().map(|s| s.points.len()).sum()
    }
}

impl MemoryTsdb {
    pub fn snapshot(&self) -> TsdbSnapshot {
        let state = self.state.read();
        let mut counters = Vec::new();
        for (scope, buckets) in &state.counters {
            for rollup in &self.config.rollups {
                let points: Vec<(i64, u64)> = buckets
                    .iter()
                    .filter(|((res, _), _)| *res == rollup.resolution_secs)
                    .map(|((_, bucket), value)| (*bucket, *value))
                    .collect();
                if !points.is_empty() {
                    counters.push(CounterSeries {
                        scope: scope.clone(),
                        resolution_secs: rollup.resolution_secs,
                        points,
                    });
                }
            }
        }

        let mut frequencies = Vec::new();
        for (scope, buckets) in &state.frequencies {
            for rollup in &self.config.rollups {
                let series: Vec<(i64, BTreeMap<u64, u64>)> = buckets
                    .iter()
                    .filter(|((res, _), _)| *res == rollup.resolution_secs)
                    .map(|((_, bucket), members)| (*bucket, members.clone()))
                    .collect();
                if !series.is_empty() {
                    frequencies.push(FrequencySeries {
                        scope: scope.clone(),
                        resolution_secs: rollup.resolution_secs,
                        buckets: series,
                    });
                }
            }
        }

        TsdbSnapshot {
            config: self.config.clone(),
            counters,
            frequencies,
        }
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<(), TsdbError> {
        let snapshot = self.snapshot();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        tracing::info!(
            path = %path.display(),
            counter_series = snapshot.counters.len(),
            frequency_series = snapshot.frequencies.len(),
            "wrote tsdb snapshot"
        );
        Ok(())
    }

    /// Rebuild a store from a snapshot. The journal starts empty.
    pub fn from_snapshot(snapshot: TsdbSnapshot) -> Result<Self, TsdbError> {
        let store = Self::new(snapshot.config)?;
        {
            let mut state = store.state.write();
            for series in snapshot.counters {
                let buckets = state.counters.entry(series.scope).or_default();
                for (bucket, value) in series.points {
                    buckets.insert((series.resolution_secs, bucket), value);
                }
            }
            for series in snapshot.frequencies {
                let buckets = state.frequencies.entry(series.scope).or_default();
                for (bucket, members) in series.buckets {
                    buckets.insert((series.resolution_secs, bucket), members);
                }
            }
        }
        Ok(store)
    }
}
