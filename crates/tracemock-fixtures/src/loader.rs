//! Builds the whole mock dataset and drives the backfill for it.
//!
//! Order of work:
//! 1. system subject backfill
//! 2. organization, teams, projects (default team unless skipped)
//! 3. per project: key, release + commits, then per sample event:
//!    event → subject resolution → backfill
//!
//! One seeded RNG stream and one [`SelectorPool`] serve the whole run.

use crate::catalog::{
    slugify, TeamFixture, DEFAULT_ORGANIZATION_NAME, DEFAULT_ORGANIZATION_SLUG, DEFAULT_TEAM,
    MOCK_TEAMS,
};
use crate::config::LoadConfig;
use crate::error::LoadError;
use crate::events::create_sample_event;
use crate::graph::{Entity, EntityKind, FixtureGraph, FixtureGraphExt, MemoryGraph};
use crate::releases::generate_release;
use crate::subject::resolve_subject;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use tracemock_core::model::Timestamp;
use tracemock_core::{
    BackfillPlan, BackfillReport, BackfillRunner, SeededMagnitudes, SelectorPool, Subject,
    TelemetryStore,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub id: u64,
    pub slug: String,
    pub name: String,
    pub team: String,
    pub release: Option<String>,
    pub commits: usize,
    pub group_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub now: Timestamp,
    pub seed: u64,
    pub organization_id: u64,
    pub projects: Vec<ProjectSummary>,
    pub entity_counts: BTreeMap<EntityKind, usize>,
    pub reports: Vec<BackfillReport>,
    pub counter_calls: usize,
    pub frequency_calls: usize,
}

impl LoadSummary {
    pub fn subjects(&self) -> usize {
        self.reports.len()
    }
}

pub struct MockLoader<'s, S: ?Sized, G = MemoryGraph> {
    store: &'s S,
    graph: G,
    config: LoadConfig,
    plan: BackfillPlan,
    pool: SelectorPool,
    magnitudes: SeededMagnitudes,
    seed: u64,
}

impl<'s, S: TelemetryStore + ?Sized> MockLoader<'s, S, MemoryGraph> {
    pub fn new(store: &'s S, config: LoadConfig) -> Result<Self, LoadError> {
        Self::with_graph(store, MemoryGraph::new(), config)
    }
}

impl<'s, S, G> MockLoader<'s, S, G>
where
    S: TelemetryStore + ?Sized,
    G: FixtureGraph,
{
    /// Validates the configuration; nothing is written yet.
    pub fn with_graph(store: &'s S, graph: G, config: LoadConfig) -> Result<Self, LoadError> {
        let plan = config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        Ok(Self {
            store,
            graph,
            config,
            plan,
            pool: SelectorPool::default(),
            magnitudes: SeededMagnitudes::new(seed),
            seed,
        })
    }

    pub fn with_selector_pool(mut self, pool: SelectorPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn run(&mut self, now: Timestamp) -> Result<LoadSummary, LoadError> {
        tracing::info!(
            seed = self.seed,
            num_events = self.config.num_events,
            with_releases = self.config.with_releases,
            "loading mock data"
        );
        let mut reports = Vec::new();

        self.backfill(&Subject::system(), now, &mut reports)?;

        let organization = self
            .graph
            .organization(DEFAULT_ORGANIZATION_SLUG, DEFAULT_ORGANIZATION_NAME)?;

        let mut teams = Vec::with_capacity(MOCK_TEAMS.len() + 1);
        if !self.config.skip_default_setup {
            teams.push(DEFAULT_TEAM);
        }
        teams.extend_from_slice(MOCK_TEAMS);

        let mut projects = Vec::new();
        for fixture in &teams {
            let team = self
                .graph
                .team(&organization, &slugify(fixture.name), fixture.name)?;
            tracing::info!(team = fixture.name, projects = fixture.projects.len(), "creating team");
            for name in fixture.projects {
                let project = self
                    .graph
                    .project(&organization, &team, &slugify(name), name)?;
                let summary =
                    self.load_project(&organization, fixture, &project, now, &mut reports)?;
                projects.push(summary);
            }
        }

        let entity_counts = EntityKind::ALL
            .iter()
            .map(|kind| (*kind, self.graph.count(*kind)))
            .filter(|(_, count)| *count > 0)
            .collect();

        let summary = LoadSummary {
            now,
            seed: self.seed,
            organization_id: organization.id,
            projects,
            entity_counts,
            counter_calls: reports.iter().map(|r| r.counter_calls).sum(),
            frequency_calls: reports.iter().map(|r| r.frequency_calls).sum(),
            reports,
        };
        tracing::info!(
            subjects = summary.subjects(),
            counter_calls = summary.counter_calls,
            frequency_calls = summary.frequency_calls,
            "mock data loaded"
        );
        Ok(summary)
    }

    fn load_project(
        &mut self,
        organization: &Entity,
        fixture: &TeamFixture,
        project: &Entity,
        now: Timestamp,
        reports: &mut Vec<BackfillReport>,
    ) -> Result<ProjectSummary, LoadError> {
        let public_key = uuid::Builder::from_random_bytes(self.magnitudes.rng().gen())
            .into_uuid()
            .simple()
            .to_string();
        self.graph.project_key(project, &public_key)?;

        let release = if self.config.with_releases {
            Some(generate_release(
                &mut self.graph,
                self.magnitudes.rng(),
                organization,
                project,
                self.config.commits_per_release,
            )?)
        } else {
            None
        };
        let release_entity = release.as_ref().map(|r| &r.release);

        let mut group_ids = Vec::with_capacity(self.config.num_events);
        for index in 0..self.config.num_events {
            let event = create_sample_event(
                &mut self.graph,
                &mut self.pool,
                self.magnitudes.rng(),
                organization.id,
                project,
                release_entity,
                index,
                now,
            )?;
            let scopes = resolve_subject(&mut self.graph, &event, release_entity)?;
            self.backfill(&Subject::Entity(scopes), now, reports)?;
            group_ids.push(event.group_id);
        }

        Ok(ProjectSummary {
            id: project.id,
            slug: project.key.parts().last().cloned().unwrap_or_default(),
            name: project.attr("name").unwrap_or_default().to_string(),
            team: fixture.name.to_string(),
            release: release_entity
                .and_then(|r| r.attr("version"))
                .map(str::to_string),
            commits: release.as_ref().map_or(0, |r| r.commits.len()),
            group_ids,
        })
    }

    fn backfill(
        &mut self,
        subject: &Subject,
        now: Timestamp,
        reports: &mut Vec<BackfillReport>,
    ) -> Result<(), LoadError> {
        let report = BackfillRunner::new(self.store, &self.plan)
            .run(subject, now, &mut self.magnitudes)
            .map_err(|source| LoadError::Backfill {
                subject: subject.label(),
                source,
            })?;
        reports.push(report);
        Ok(())
    }
}
