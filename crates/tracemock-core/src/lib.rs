//! Tracemock Backfill Engine
//!
//! Produces the synthetic time-series half of a demo dataset: correlated
//! counter increments and top-K frequency updates, written backwards in time
//! from "now" across two resolutions.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        BACKFILL RUNNER                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   ┌────────────┐  (timestamp, magnitude)  ┌──────────────────┐   │
//! │   │ TimeCursor │─────────────────────────►│ RatioedCounter   │──┐│
//! │   │ fine: 60×1s│                          │ Emitter          │  ││
//! │   │ coarse:    │                          └──────────────────┘  ││
//! │   │  720×1h    │─────────────────────────►┌──────────────────┐  ││
//! │   └────────────┘                          │ FrequencyFanout  │──┤│
//! │         ▲                                 └──────────────────┘  ││
//! │         │ seeded draws                                          ││
//! │   ┌─────────────────┐                    ┌──────────────────┐   ││
//! │   │ MagnitudeSource │                    │  TelemetryStore  │◄──┘│
//! │   └─────────────────┘                    │  (collaborator)  │    │
//! │                                          └──────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Properties
//!
//! - **Deterministic**: magnitudes come from an injectable, seedable source
//! - **Ordered**: submissions follow tick order (non-increasing timestamps)
//! - **Fail-fast**: a store failure aborts the subject; nothing is retried
//! - **Non-normalized**: ratio-derived counters intentionally do not sum to
//!   the base magnitude

pub mod cursor;
pub mod emitter;
pub mod error;
pub mod fanout;
pub mod model;
pub mod ratios;
pub mod runner;
pub mod selectors;
pub mod store;

pub use cursor::{
    BackfillWindow, MagnitudeRange, MagnitudeSource, Resolution, ScriptedMagnitudes,
    SeededMagnitudes, Tick, Ticks, TimeCursor,
};
pub use emitter::{CounterIncrement, RatioedCounterEmitter};
pub use error::{BackfillError, ConfigError, StoreError};
pub use fanout::FrequencyFanout;
pub use model::{
    CounterDelta, EntityScopes, FrequencyContribution, FrequencyEntry, ScopeGroup, ScopeId,
    ScopeKey, SystemScopes, TsdbModel,
};
pub use ratios::{MetricRole, Ratio, RatioSettings, RatioTable};
pub use runner::{
    BackfillPlan, BackfillReport, BackfillRunner, BackfillSettings, RunnerState, Subject,
    WindowReport,
};
pub use selectors::{CyclicSelector, Level, SelectorPool};
pub use store::TelemetryStore;
