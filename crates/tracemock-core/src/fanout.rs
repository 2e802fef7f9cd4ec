//! Top-K frequency contributions for entity ticks.

use crate::error::StoreError;
use crate::model::{EntityScopes, FrequencyEntry, ScopeKey, Timestamp, TsdbModel};
use crate::store::TelemetryStore;

pub struct FrequencyFanout<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: TelemetryStore + ?Sized> FrequencyFanout<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// organization→project, project→group, group→environment, and
    /// group→release when a release is attached. All weighted by `magnitude`.
    pub fn derive(&self, scopes: &EntityScopes, magnitude: u64) -> Vec<FrequencyEntry> {
        let mut entries = vec![
            FrequencyEntry::single(
                ScopeKey::new(TsdbModel::FrequentProjectsByOrganization, scopes.organization_id),
                scopes.project_id,
                magnitude,
            ),
            FrequencyEntry::single(
                ScopeKey::new(TsdbModel::FrequentIssuesByProject, scopes.project_id),
                scopes.group_id,
                magnitude,
            ),
            FrequencyEntry::single(
                ScopeKey::new(TsdbModel::FrequentEnvironmentsByGroup, scopes.group_id),
                scopes.environment_id,
                magnitude,
            ),
        ];
        if let Some(group_release_id) = scopes.group_release_id {
            entries.push(FrequencyEntry::single(
                ScopeKey::new(TsdbModel::FrequentReleasesByGroup, scopes.group_id),
                group_release_id,
                magnitude,
            ));
        }
        entries
    }

    /// One `record_frequency_multi` call carrying every entry. Returns the
    /// number of entries submitted.
    pub fn emit(
        &self,
        scopes: &EntityScopes,
        timestamp: Timestamp,
        magnitude: u64,
    ) -> Result<usize, StoreError> {
        let entries = self.derive(scopes, magnitude);
        self.store.record_frequency_multi(&entries, timestamp)?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    impl TelemetryStore for Unreachable {
        fn incr_multi(&self, _: &[ScopeKey], _: Timestamp, _: u64) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        fn record_frequency_multi(
            &self,
            _: &[FrequencyEntry],
            _: Timestamp,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    fn scopes(release: Option<u64>) -> EntityScopes {
        EntityScopes {
            organization_id: 1,
            project_id: 2,
            group_id: 3,
            environment_id: 4,
            group_release_id: release,
        }
    }

    #[test]
    fn three_entries_without_release() {
        let fanout = FrequencyFanout::new(&Unreachable);
        let entries = fanout.derive(&scopes(None), 7);
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.members.values().all(|&w| w == 7)));
        assert_eq!(entries[1].scope, ScopeKey::new(TsdbModel::FrequentIssuesByProject, 2u64));
        assert_eq!(entries[1].members.get(&3), Some(&7));
    }

    #[test]
    fn release_adds_fourth_entry() {
        let fanout = FrequencyFanout::new(&Unreachable);
        let entries = fanout.derive(&scopes(Some(11)), 7);
        assert_eq!(entries.len(), 4);
        let release = &entries[3];
        assert_eq!(release.scope.model, TsdbModel::FrequentReleasesByGroup);
        assert_eq!(release.members.get(&11), Some(&7));
    }

    #[test]
    fn store_failure_propagates() {
        let fanout = FrequencyFanout::new(&Unreachable);
        let err = fanout
            .emit(&scopes(None), chrono::Utc::now(), 1)
            .unwrap_err();
        assert!(err.is_transient());
    }
}
