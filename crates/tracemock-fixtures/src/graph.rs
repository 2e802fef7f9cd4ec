//! Get-or-create fixture graph.
//!
//! Entities are identified by a natural key per kind; asking for the same
//! key twice returns the first entity. Ids are assigned per kind, from 1.

use crate::error::FixtureError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organization,
    Team,
    Project,
    ProjectKey,
    Release,
    ReleaseProject,
    CommitAuthor,
    Commit,
    CommitFileChange,
    ReleaseCommit,
    Environment,
    EnvironmentProject,
    ReleaseEnvironment,
    Group,
    GroupRelease,
    Event,
}

impl EntityKind {
    pub const ALL: [EntityKind; 16] = [
        EntityKind::Organization,
        EntityKind::Team,
        EntityKind::Project,
        EntityKind::ProjectKey,
        EntityKind::Release,
        EntityKind::ReleaseProject,
        EntityKind::CommitAuthor,
        EntityKind::Commit,
        EntityKind::CommitFileChange,
        EntityKind::ReleaseCommit,
        EntityKind::Environment,
        EntityKind::EnvironmentProject,
        EntityKind::ReleaseEnvironment,
        EntityKind::Group,
        EntityKind::GroupRelease,
        EntityKind::Event,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::Team => "team",
            EntityKind::Project => "project",
            EntityKind::ProjectKey => "project_key",
            EntityKind::Release => "release",
            EntityKind::ReleaseProject => "release_project",
            EntityKind::CommitAuthor => "commit_author",
            EntityKind::Commit => "commit",
            EntityKind::CommitFileChange => "commit_file_change",
            EntityKind::ReleaseCommit => "release_commit",
            EntityKind::Environment => "environment",
            EntityKind::EnvironmentProject => "environment_project",
            EntityKind::ReleaseEnvironment => "release_environment",
            EntityKind::Group => "group",
            EntityKind::GroupRelease => "group_release",
            EntityKind::Event => "event",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Attributes = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NaturalKey(Vec<String>);

impl NaturalKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u64,
    pub kind: EntityKind,
    pub key: NaturalKey,
    pub attributes: Attributes,
}

impl Entity {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// The fixture-graph collaborator.
pub trait FixtureGraph {
    /// Returns the entity and whether this call created it. `defaults` only
    /// apply on creation.
    fn get_or_create(
        &mut self,
        kind: EntityKind,
        key: NaturalKey,
        defaults: Attributes,
    ) -> Result<(Entity, bool), FixtureError>;

    fn get(&self, kind: EntityKind, id: u64) -> Option<&Entity>;

    fn count(&self, kind: EntityKind) -> usize;
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    entities: BTreeMap<EntityKind, Vec<Entity>>,
    index: HashMap<(EntityKind, NaturalKey), u64>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, kind: EntityKind, key: &NaturalKey) -> Option<&Entity> {
        let id = *self.index.get(&(kind, key.clone()))?;
        self.get(kind, id)
    }

    pub fn entities(&self, kind: EntityKind) -> &[Entity] {
        self.entities.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl FixtureGraph for MemoryGraph {
    fn get_or_create(
        &mut self,
        kind: EntityKind,
        key: NaturalKey,
        defaults: Attributes,
    ) -> Result<(Entity, bool), FixtureError> {
        if key.parts().is_empty() {
            return Err(FixtureError::EmptyKey { kind });
        }

        if let Some(existing) = self.find(kind, &key) {
            let differs = defaults
                .iter()
                .any(|(k, v)| existing.attributes.get(k).is_some_and(|cur| cur != v));
            if differs {
                tracing::warn!(
                    kind = %kind,
                    key = %key,
                    "natural key already exists with different defaults"
                );
            }
            return Ok((existing.clone(), false));
        }

        let list = self.entities.entry(kind).or_default();
        let entity = Entity {
            id: list.len() as u64 + 1,
            kind,
            key: key.clone(),
            attributes: defaults,
        };
        list.push(entity.clone());
        self.index.insert((kind, key), entity.id);
        Ok((entity, true))
    }

    fn get(&self, kind: EntityKind, id: u64) -> Option<&Entity> {
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        self.entities.get(&kind)?.get(index)
    }

    fn count(&self, kind: EntityKind) -> usize {
        self.entities(kind).len()
    }
}

fn attrs<const N: usize>(pairs: [(&str, String); N]) -> Attributes {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

// ============================================================================
// Typed helpers
// ============================================================================

/// Typed get-or-create calls for each fixture kind.
pub trait FixtureGraphExt: FixtureGraph {
    fn organization(&mut self, slug: &str, name: &str) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([slug]);
        Ok(self
            .get_or_create(EntityKind::Organization, key, attrs([("name", name.to_string())]))?
            .0)
    }

    fn team(
        &mut self,
        organization: &Entity,
        slug: &str,
        name: &str,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([organization.id.to_string(), slug.to_string()]);
        Ok(self
            .get_or_create(EntityKind::Team, key, attrs([("name", name.to_string())]))?
            .0)
    }

    fn project(
        &mut self,
        organization: &Entity,
        team: &Entity,
        slug: &str,
        name: &str,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([organization.id.to_string(), slug.to_string()]);
        let defaults = attrs([
            ("name", name.to_string()),
            ("team_id", team.id.to_string()),
            ("organization_id", organization.id.to_string()),
        ]);
        Ok(self.get_or_create(EntityKind::Project, key, defaults)?.0)
    }

    fn project_key(&mut self, project: &Entity, public_key: &str) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([project.id.to_string()]);
        Ok(self
            .get_or_create(
                EntityKind::ProjectKey,
                key,
                attrs([("public_key", public_key.to_string())]),
            )?
            .0)
    }

    fn release(&mut self, organization: &Entity, version: &str) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([organization.id.to_string(), version.to_string()]);
        Ok(self
            .get_or_create(EntityKind::Release, key, attrs([("version", version.to_string())]))?
            .0)
    }

    fn release_project(
        &mut self,
        release: &Entity,
        project: &Entity,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([release.id.to_string(), project.id.to_string()]);
        Ok(self
            .get_or_create(EntityKind::ReleaseProject, key, Attributes::new())?
            .0)
    }

    fn commit_author(
        &mut self,
        organization: &Entity,
        name: &str,
        email: &str,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([organization.id.to_string(), email.to_string()]);
        Ok(self
            .get_or_create(EntityKind::CommitAuthor, key, attrs([("name", name.to_string())]))?
            .0)
    }

    fn commit(
        &mut self,
        organization: &Entity,
        repository: &str,
        sha: &str,
        author: &Entity,
        message: &str,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([
            organization.id.to_string(),
            repository.to_string(),
            sha.to_string(),
        ]);
        let defaults = attrs([
            ("author_id", author.id.to_string()),
            ("message", message.to_string()),
        ]);
        Ok(self.get_or_create(EntityKind::Commit, key, defaults)?.0)
    }

    fn commit_file_change(
        &mut self,
        commit: &Entity,
        filename: &str,
        change_type: char,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([commit.id.to_string(), filename.to_string()]);
        Ok(self
            .get_or_create(
                EntityKind::CommitFileChange,
                key,
                attrs([("type", change_type.to_string())]),
            )?
            .0)
    }

    fn release_commit(
        &mut self,
        release: &Entity,
        commit: &Entity,
        order: usize,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([release.id.to_string(), commit.id.to_string()]);
        Ok(self
            .get_or_create(EntityKind::ReleaseCommit, key, attrs([("order", order.to_string())]))?
            .0)
    }

    /// Environments are organization-wide; `name` may be empty.
    fn environment(&mut self, organization_id: u64, name: &str) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([organization_id.to_string(), name.to_string()]);
        Ok(self
            .get_or_create(EntityKind::Environment, key, attrs([("name", name.to_string())]))?
            .0)
    }

    /// Environments are shared across an organization; this records that
    /// `project_id` has seen one.
    fn environment_project(
        &mut self,
        environment: &Entity,
        project_id: u64,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([environment.id.to_string(), project_id.to_string()]);
        Ok(self
            .get_or_create(EntityKind::EnvironmentProject, key, Attributes::new())?
            .0)
    }

    fn release_environment(
        &mut self,
        release: &Entity,
        environment: &Entity,
        project_id: u64,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([
            project_id.to_string(),
            release.id.to_string(),
            environment.id.to_string(),
        ]);
        Ok(self
            .get_or_create(EntityKind::ReleaseEnvironment, key, Attributes::new())?
            .0)
    }

    fn group(
        &mut self,
        project_id: u64,
        checksum: &str,
        defaults: Attributes,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([project_id.to_string(), checksum.to_string()]);
        Ok(self.get_or_create(EntityKind::Group, key, defaults)?.0)
    }

    fn group_release(
        &mut self,
        group_id: u64,
        release: &Entity,
        environment: &Entity,
    ) -> Result<Entity, FixtureError> {
        let key = NaturalKey::new([
            group_id.to_string(),
            release.id.to_string(),
            environment.id.to_string(),
        ]);
        Ok(self
            .get_or_create(EntityKind::GroupRelease, key, Attributes::new())?
            .0)
    }
}

impl<G: FixtureGraph + ?Sized> FixtureGraphExt for G {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent_by_natural_key() {
        let mut graph = MemoryGraph::new();
        let org = graph.organization("sentry", "Sentry").unwrap();
        let again = graph.organization("sentry", "Renamed").unwrap();
        assert_eq!(org, again);
        assert_eq!(again.attr("name"), Some("Sentry"));
        assert_eq!(graph.count(EntityKind::Organization), 1);
    }

    #[test]
    fn ids_are_assigned_per_kind() {
        let mut graph = MemoryGraph::new();
        let org = graph.organization("a", "A").unwrap();
        let team = graph.team(&org, "t", "T").unwrap();
        let other = graph.organization("b", "B").unwrap();
        assert_eq!((org.id, team.id, other.id), (1, 1, 2));
        assert_eq!(graph.get(EntityKind::Organization, 2), Some(&other));
        assert_eq!(graph.get(EntityKind::Organization, 0), None);
        assert_eq!(graph.get(EntityKind::Team, 7), None);
    }

    #[test]
    fn created_flag_reports_first_call_only() {
        let mut graph = MemoryGraph::new();
        let key = NaturalKey::new(["x"]);
        let (_, created) = graph
            .get_or_create(EntityKind::Commit, key.clone(), Attributes::new())
            .unwrap();
        assert!(created);
        let (_, created) = graph
            .get_or_create(EntityKind::Commit, key, Attributes::new())
            .unwrap();
        assert!(!created);
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut graph = MemoryGraph::new();
        let empty = NaturalKey::new(Vec::<String>::new());
        let err = graph
            .get_or_create(EntityKind::Event, empty, Attributes::new())
            .unwrap_err();
        assert_eq!(err, FixtureError::EmptyKey { kind: EntityKind::Event });
    }

    #[test]
    fn empty_environment_name_is_a_valid_key_part() {
        let mut graph = MemoryGraph::new();
        let a = graph.environment(1, "").unwrap();
        let b = graph.environment(1, "").unwrap();
        let prod = graph.environment(1, "production").unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, prod.id);
    }
}
