use std::path::PathBuf;
use tracemock_core::{BackfillError, ConfigError};

use crate::graph::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixtureError {
    #[error("{kind} natural key must not be empty")]
    EmptyKey { kind: EntityKind },
    #[error("{kind} #{id} does not exist")]
    Missing { kind: EntityKind, id: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("commits_per_release range is empty ({min}..={max})")]
    InvalidCommitRange { min: u32, max: u32 },
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: String, value: String },
    #[error("failed to read config {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("fixture setup failed: {0}")]
    Fixture(#[from] FixtureError),
    /// Earlier subjects' telemetry is left in the store.
    #[error("backfill for {subject} failed: {source}")]
    Backfill {
        subject: String,
        #[source]
        source: BackfillError,
    },
}
