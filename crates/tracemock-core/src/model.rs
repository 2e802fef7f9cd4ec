//! Scope keys, deltas and frequency entries.
//!
//! Everything here is ephemeral: built for one tick, handed to the store,
//! then dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type Timestamp = DateTime<Utc>;

/// What a counter or frequency table measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TsdbModel {
    /// Process-wide metrics keyed by a dotted metric name.
    Internal,
    Project,
    Group,
    OrganizationTotalReceived,
    ProjectTotalReceived,
    OrganizationTotalRejected,
    ProjectTotalRejected,
    FrequentProjectsByOrganization,
    FrequentIssuesByProject,
    FrequentEnvironmentsByGroup,
    FrequentReleasesByGroup,
}

impl TsdbModel {
    pub fn as_str(self) -> &'static str {
        match self {
            TsdbModel::Internal => "internal",
            TsdbModel::Project => "project",
            TsdbModel::Group => "group",
            TsdbModel::OrganizationTotalReceived => "organization_total_received",
            TsdbModel::ProjectTotalReceived => "project_total_received",
            TsdbModel::OrganizationTotalRejected => "organization_total_rejected",
            TsdbModel::ProjectTotalRejected => "project_total_rejected",
            TsdbModel::FrequentProjectsByOrganization => "frequent_projects_by_organization",
            TsdbModel::FrequentIssuesByProject => "frequent_issues_by_project",
            TsdbModel::FrequentEnvironmentsByGroup => "frequent_environments_by_group",
            TsdbModel::FrequentReleasesByGroup => "frequent_releases_by_group",
        }
    }

    /// Top-K tables take frequency records; everything else takes increments.
    pub fn is_frequency(self) -> bool {
        matches!(
            self,
            TsdbModel::FrequentProjectsByOrganization
                | TsdbModel::FrequentIssuesByProject
                | TsdbModel::FrequentEnvironmentsByGroup
                | TsdbModel::FrequentReleasesByGroup
        )
    }
}

impl fmt::Display for TsdbModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeId {
    Id(u64),
    Key(String),
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Id(id) => write!(f, "{id}"),
            ScopeId::Key(key) => f.write_str(key),
        }
    }
}

impl From<u64> for ScopeId {
    fn from(value: u64) -> Self {
        ScopeId::Id(value)
    }
}

impl From<&str> for ScopeId {
    fn from(value: &str) -> Self {
        ScopeId::Key(value.to_string())
    }
}

impl From<String> for ScopeId {
    fn from(value: String) -> Self {
        ScopeId::Key(value)
    }
}

/// A (metric-kind, entity-id) pair. Opaque beyond equality and ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub model: TsdbModel,
    pub id: ScopeId,
}

impl ScopeKey {
    pub fn new(model: TsdbModel, id: impl Into<ScopeId>) -> Self {
        Self {
            model,
            id: id.into(),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.model, self.id)
    }
}

/// One counter increment for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDelta {
    pub scope: ScopeKey,
    pub timestamp: Timestamp,
    pub amount: u64,
}

/// "member contributed weight to the ranking of scope at timestamp".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyContribution {
    pub scope: ScopeKey,
    pub member: u64,
    pub weight: u64,
    pub timestamp: Timestamp,
}

/// A scope together with its member → weight contributions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub scope: ScopeKey,
    pub members: BTreeMap<u64, u64>,
}

impl FrequencyEntry {
    pub fn single(scope: ScopeKey, member: u64, weight: u64) -> Self {
        let mut members = BTreeMap::new();
        members.insert(member, weight);
        Self { scope, members }
    }

    pub fn contributions(
        &self,
        timestamp: Timestamp,
    ) -> impl Iterator<Item = FrequencyContribution> + '_ {
        self.members
            .iter()
            .map(move |(&member, &weight)| FrequencyContribution {
                scope: self.scope.clone(),
                member,
                weight,
                timestamp,
            })
    }
}

// ============================================================================
// Scope groups
// ============================================================================

pub const REQUESTS_METRIC: &str = "client-api.all-versions.requests";
pub const RESPONSES_2XX_METRIC: &str = "client-api.all-versions.responses.2xx";
pub const RESPONSES_4XX_METRIC: &str = "client-api.all-versions.responses.4xx";
pub const RESPONSES_5XX_METRIC: &str = "client-api.all-versions.responses.5xx";

/// Process-wide request/response counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemScopes {
    pub requests: ScopeKey,
    pub success: ScopeKey,
    pub client_errors: ScopeKey,
    pub server_errors: ScopeKey,
}

impl Default for SystemScopes {
    fn default() -> Self {
        Self {
            requests: ScopeKey::new(TsdbModel::Internal, REQUESTS_METRIC),
            success: ScopeKey::new(TsdbModel::Internal, RESPONSES_2XX_METRIC),
            client_errors: ScopeKey::new(TsdbModel::Internal, RESPONSES_4XX_METRIC),
            server_errors: ScopeKey::new(TsdbModel::Internal, RESPONSES_5XX_METRIC),
        }
    }
}

/// Ids resolved for one sample event before its backfill starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityScopes {
    pub organization_id: u64,
    pub project_id: u64,
    pub group_id: u64,
    pub environment_id: u64,
    /// Group-release link; present only when the event carries a release.
    pub group_release_id: Option<u64>,
}

impl EntityScopes {
    pub fn project(&self) -> ScopeKey {
        ScopeKey::new(TsdbModel::Project, self.project_id)
    }

    pub fn group(&self) -> ScopeKey {
        ScopeKey::new(TsdbModel::Group, self.group_id)
    }

    pub fn organization_received(&self) -> ScopeKey {
        ScopeKey::new(TsdbModel::OrganizationTotalReceived, self.organization_id)
    }

    pub fn project_received(&self) -> ScopeKey {
        ScopeKey::new(TsdbModel::ProjectTotalReceived, self.project_id)
    }

    pub fn organization_rejected(&self) -> ScopeKey {
        ScopeKey::new(TsdbModel::OrganizationTotalRejected, self.organization_id)
    }

    pub fn project_rejected(&self) -> ScopeKey {
        ScopeKey::new(TsdbModel::ProjectTotalRejected, self.project_id)
    }

    pub fn has_release(&self) -> bool {
        self.group_release_id.is_some()
    }
}

/// The two fixed shapes a tick can fan out into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeGroup {
    System(SystemScopes),
    Entity(EntityScopes),
}
