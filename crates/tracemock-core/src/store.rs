//! The counter/frequency store collaborator.

use crate::error::StoreError;
use crate::model::{FrequencyEntry, ScopeKey, Timestamp};

/// Write path of an append-only time-series store.
///
/// Summation of repeated deltas is the store's job. Calls are issued in
/// tick order and each is awaited before the next one is made.
pub trait TelemetryStore {
    /// Add `amount` to every scope in `scopes` at `timestamp`.
    fn incr_multi(
        &self,
        scopes: &[ScopeKey],
        timestamp: Timestamp,
        amount: u64,
    ) -> Result<(), StoreError>;

    /// Accumulate member weights into each entry's top-K table at `timestamp`.
    fn record_frequency_multi(
        &self,
        entries: &[FrequencyEntry],
        timestamp: Timestamp,
    ) -> Result<(), StoreError>;
}

impl<T: TelemetryStore + ?Sized> TelemetryStore for &T {
    fn incr_multi(
        &self,
        scopes: &[ScopeKey],
        timestamp: Timestamp,
        amount: u64,
    ) -> Result<(), StoreError> {
        (**self).incr_multi(scopes, timestamp, amount)
    }

    fn record_frequency_multi(
        &self,
        entries: &[FrequencyEntry],
        timestamp: Timestamp,
    ) -> Result<(), StoreError> {
        (**self).record_frequency_multi(entries, timestamp)
    }
}
