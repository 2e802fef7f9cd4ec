//! Ratio-derived counter increments for one tick.

use crate::error::StoreError;
use crate::model::{CounterDelta, EntityScopes, ScopeGroup, ScopeKey, SystemScopes, Timestamp};
use crate::ratios::{MetricRole, RatioTable};
use crate::store::TelemetryStore;

/// One `incr_multi` call: the same amount applied to several scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterIncrement {
    pub role: MetricRole,
    pub scopes: Vec<ScopeKey>,
    pub amount: u64,
}

impl CounterIncrement {
    pub fn deltas(&self, timestamp: Timestamp) -> impl Iterator<Item = CounterDelta> + '_ {
        self.scopes.iter().map(move |scope| CounterDelta {
            scope: scope.clone(),
            timestamp,
            amount: self.amount,
        })
    }
}

pub struct RatioedCounterEmitter<'a, S: ?Sized> {
    store: &'a S,
    ratios: &'a RatioTable,
}

impl<'a, S: TelemetryStore + ?Sized> RatioedCounterEmitter<'a, S> {
    pub fn new(store: &'a S, ratios: &'a RatioTable) -> Self {
        Self { store, ratios }
    }

    /// The increments a tick of `magnitude` produces, in submission order.
    pub fn derive(&self, group: &ScopeGroup, magnitude: u64) -> Vec<CounterIncrement> {
        match group {
            ScopeGroup::System(scopes) => self.derive_system(scopes, magnitude),
            ScopeGroup::Entity(scopes) => self.derive_entity(scopes, magnitude),
        }
    }

    fn derive_system(&self, scopes: &SystemScopes, magnitude: u64) -> Vec<CounterIncrement> {
        vec![
            self.increment(
                MetricRole::Success,
                vec![scopes.success.clone(), scopes.requests.clone()],
                magnitude,
            ),
            self.increment(
                MetricRole::ClientError,
                vec![scopes.client_errors.clone()],
                magnitude,
            ),
            self.increment(
                MetricRole::ServerError,
                vec![scopes.server_errors.clone()],
                magnitude,
            ),
        ]
    }

    fn derive_entity(&self, scopes: &EntityScopes, magnitude: u64) -> Vec<CounterIncrement> {
        vec![
            self.increment(
                MetricRole::Raw,
                vec![scopes.project(), scopes.group()],
                magnitude,
            ),
            self.increment(
                MetricRole::Received,
                vec![scopes.organization_received(), scopes.project_received()],
                magnitude,
            ),
            self.increment(
                MetricRole::Rejected,
                vec![scopes.organization_rejected(), scopes.project_rejected()],
                magnitude,
            ),
        ]
    }

    fn increment(
        &self,
        role: MetricRole,
        scopes: Vec<ScopeKey>,
        magnitude: u64,
    ) -> CounterIncrement {
        CounterIncrement {
            role,
            scopes,
            amount: self.ratios.amount(role, magnitude),
        }
    }

    /// Submit every derived increment at `timestamp`, stopping at the first
    /// failure. Zero amounts are still submitted. Returns the call count.
    pub fn emit(
        &self,
        group: &ScopeGroup,
        timestamp: Timestamp,
        magnitude: u64,
    ) -> Result<usize, StoreError> {
        let increments = self.derive(group, magnitude);
        for increment in &increments {
            self.store
                .incr_multi(&increment.scopes, timestamp, increment.amount)?;
        }
        Ok(increments.len())
    }
}
