//! Resolve the scope ids an event's backfill writes to.

use crate::error::FixtureError;
use crate::events::SampleEvent;
use crate::graph::{Entity, EntityKind, FixtureGraph, FixtureGraphExt};
use tracemock_core::EntityScopes;

/// Get-or-create the event's environment and, when a release is attached,
/// its release-environment and group-release links. Called once per
/// subject, before any tick.
pub fn resolve_subject<G>(
    graph: &mut G,
    event: &SampleEvent,
    release: Option<&Entity>,
) -> Result<EntityScopes, FixtureError>
where
    G: FixtureGraph + ?Sized,
{
    if graph.get(EntityKind::Group, event.group_id).is_none() {
        return Err(FixtureError::Missing {
            kind: EntityKind::Group,
            id: event.group_id,
        });
    }

    let environment = graph.environment(event.organization_id, &event.environment)?;
    graph.environment_project(&environment, event.project_id)?;
    let group_release_id = match release {
        Some(release) => {
            graph.release_environment(release, &environment, event.project_id)?;
            Some(graph.group_release(event.group_id, release, &environment)?.id)
        }
        None => None,
    };

    Ok(EntityScopes {
        organization_id: event.organization_id,
        project_id: event.project_id,
        group_id: event.group_id,
        environment_id: environment.id,
        group_release_id,
    })
}
