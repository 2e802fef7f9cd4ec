//! Fixture side of the demo dataset.
//!
//! - [`graph`]: the get-or-create collaborator and an in-memory implementation
//! - [`catalog`]: the fixed organizations, teams, authors and files
//! - [`releases`], [`events`]: seeded generators for releases and sample events
//! - [`subject`]: turns a sample event into backfill scope ids
//! - [`loader`]: runs the whole thing against a telemetry store

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod loader;
pub mod releases;
pub mod subject;

pub use config::{CountRange, LoadConfig};
pub use error::{FixtureError, LoadError};
pub use events::SampleEvent;
pub use graph::{
    Attributes, Entity, EntityKind, FixtureGraph, FixtureGraphExt, MemoryGraph, NaturalKey,
};
pub use loader::{LoadSummary, MockLoader, ProjectSummary};
pub use subject::resolve_subject;
