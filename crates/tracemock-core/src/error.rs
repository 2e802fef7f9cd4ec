//! Error taxonomy for the backfill engine.

use crate::cursor::Resolution;

/// Invalid window or ratio configuration. Raised before any tick runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{resolution} window must have at least one tick")]
    EmptyWindow { resolution: Resolution },
    #[error("{resolution} window step must be positive (got {step_secs}s)")]
    NonPositiveStep {
        resolution: Resolution,
        step_secs: i64,
    },
    #[error("{resolution} window magnitude range is empty ({min}..={max})")]
    EmptyMagnitudeRange {
        resolution: Resolution,
        min: u64,
        max: u64,
    },
    #[error("{resolution} window reaches outside the representable time range")]
    WindowOutOfRange { resolution: Resolution },
    #[error("ratio `{role}` must be finite and non-negative (got {value})")]
    InvalidRatio { role: String, value: f64 },
    #[error("selector domain `{domain}` must not be empty")]
    EmptySelectorDomain { domain: String },
}

/// Failure reported by the counter/frequency store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not accept the write right now. Not retried here.
    #[error("telemetry store unavailable: {0}")]
    Unavailable(String),
    #[error("telemetry store rejected write: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackfillError {
    #[error("invalid backfill configuration: {0}")]
    Config(#[from] ConfigError),
    /// `tick` is 1-based within the window that was running.
    #[error("store write failed at {resolution} tick {tick}: {source}")]
    Store {
        resolution: Resolution,
        tick: u32,
        #[source]
        source: StoreError,
    },
}

impl BackfillError {
    /// Tick at which the subject stopped, if it failed mid-window.
    pub fn failed_tick(&self) -> Option<(Resolution, u32)> {
        match self {
            BackfillError::Store {
                resolution, tick, ..
            } => Some((*resolution, *tick)),
            BackfillError::Config(_) => None,
        }
    }
}
