//! Sample error events.
//!
//! Platform, level and environment come from the run's shared
//! [`SelectorPool`], so back-to-back events differ.

use crate::catalog::culprit_for;
use crate::error::FixtureError;
use crate::graph::{Attributes, Entity, EntityKind, FixtureGraph, FixtureGraphExt, NaturalKey};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracemock_core::model::Timestamp;
use tracemock_core::{Level, SelectorPool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleEvent {
    pub event_id: Uuid,
    pub organization_id: u64,
    pub project_id: u64,
    pub group_id: u64,
    pub platform: String,
    pub level: Level,
    /// Empty when the event carries no environment.
    pub environment: String,
    pub message: String,
    pub culprit: String,
    pub checksum: String,
    pub release: Option<String>,
    pub timestamp: Timestamp,
}

pub fn sample_message(platform: &str) -> String {
    format!("This is a mostly useless example {platform} exception")
}

/// Grouping checksum for the `index`-th event of a platform.
pub fn checksum(platform: &str, index: usize) -> String {
    let digest = Sha256::digest(format!("{platform}{index}").as_bytes());
    digest[..16].iter().map(|b| format!("{b:02x}")).collect()
}

/// Build one event for `project` and register it (and its group) in the graph.
#[allow(clippy::too_many_arguments)]
pub fn create_sample_event<G, R>(
    graph: &mut G,
    pool: &mut SelectorPool,
    rng: &mut R,
    organization_id: u64,
    project: &Entity,
    release: Option<&Entity>,
    index: usize,
    timestamp: Timestamp,
) -> Result<SampleEvent, FixtureError>
where
    G: FixtureGraph + ?Sized,
    R: Rng + ?Sized,
{
    let platform = pool.next_platform();
    let level = pool.next_level();
    let environment = pool.next_environment();

    let message = sample_message(platform);
    let culprit = culprit_for(platform).to_string();
    let checksum = checksum(platform, index);

    let group_defaults: Attributes = [
        ("message", message.clone()),
        ("culprit", culprit.clone()),
        ("level", level.to_string()),
        ("platform", platform.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let group = graph.group(project.id, &checksum, group_defaults)?;

    let event_id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
    let release_version = release.and_then(|r| r.attr("version")).map(str::to_string);

    let mut event_attrs: Attributes = [
        ("group_id", group.id.to_string()),
        ("platform", platform.to_string()),
        ("level", level.to_string()),
        ("environment", environment.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    if let Some(version) = &release_version {
        event_attrs.insert("release".to_string(), version.clone());
    }
    graph.get_or_create(
        EntityKind::Event,
        NaturalKey::new([project.id.to_string(), event_id.simple().to_string()]),
        event_attrs,
    )?;

    Ok(SampleEvent {
        event_id,
        organization_id,
        project_id: project.id,
        group_id: group.id,
        platform: platform.to_string(),
        level,
        environment: environment.to_string(),
        message,
        culprit,
        checksum,
        release: release_version,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn events_cycle_platforms_and_group_by_checksum() {
        let mut graph = MemoryGraph::new();
        let org = graph.organization("sentry", "Sentry").unwrap();
        let team = graph.team(&org, "t", "T").unwrap();
        let project = graph.project(&org, &team, "earth", "Earth").unwrap();
        let mut pool = SelectorPool::default();
        let mut rng = StdRng::seed_from_u64(3);
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let events: Vec<_> = (0..6)
            .map(|i| {
                create_sample_event(&mut graph, &mut pool, &mut rng, org.id, &project, None, i, now)
                    .unwrap()
            })
            .collect();

        let platforms: Vec<_> = events.iter().map(|e| e.platform.as_str()).collect();
        assert_eq!(platforms, ["ruby", "php", "python", "java", "javascript", "ruby"]);
        assert_eq!(events[0].level, Level::Info);
        assert_eq!(events[5].environment, "");
        assert_eq!(events[2].message, "This is a mostly useless example python exception");
        assert_eq!(graph.count(EntityKind::Event), 6);
        assert_eq!(graph.count(EntityKind::Group), 6);
        assert!(events.iter().all(|e| e.release.is_none()));
    }

    #[test]
    fn checksum_is_stable() {
        assert_eq!(checksum("ruby", 0), checksum("ruby", 0));
        assert_ne!(checksum("ruby", 0), checksum("ruby", 1));
        assert_eq!(checksum("php", 4).len(), 32);
    }
}
