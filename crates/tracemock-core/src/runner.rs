//! Drives the fine and coarse windows for one subject.

use crate::cursor::{BackfillWindow, MagnitudeSource, Resolution, TimeCursor};
use crate::emitter::RatioedCounterEmitter;
use crate::error::{BackfillError, ConfigError};
use crate::fanout::FrequencyFanout;
use crate::model::{EntityScopes, ScopeGroup, SystemScopes, Timestamp};
use crate::ratios::{RatioSettings, RatioTable};
use crate::store::TelemetryStore;
use serde::{Deserialize, Serialize};

/// What a backfill run writes telemetry for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// Process-wide request/response metrics.
    System(SystemScopes),
    /// Metrics tied to one generated sample event.
    Entity(EntityScopes),
}

impl Subject {
    pub fn system() -> Self {
        Subject::System(SystemScopes::default())
    }

    pub fn scope_group(&self) -> ScopeGroup {
        match self {
            Subject::System(scopes) => ScopeGroup::System(scopes.clone()),
            Subject::Entity(scopes) => ScopeGroup::Entity(*scopes),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Subject::System(_) => "system".to_string(),
            Subject::Entity(scopes) => {
                format!("project:{}/group:{}", scopes.project_id, scopes.group_id)
            }
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Serializable form of a [`BackfillPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillSettings {
    pub fine: BackfillWindow,
    pub coarse: BackfillWindow,
    pub ratios: RatioSettings,
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            fine: BackfillWindow::fine(),
            coarse: BackfillWindow::coarse(),
            ratios: RatioSettings::default(),
        }
    }
}

/// The two windows plus the ratio table, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillPlan {
    fine: BackfillWindow,
    coarse: BackfillWindow,
    ratios: RatioTable,
}

impl BackfillPlan {
    pub fn new(
        fine: BackfillWindow,
        coarse: BackfillWindow,
        ratios: RatioTable,
    ) -> Result<Self, ConfigError> {
        fine.validate()?;
        coarse.validate()?;
        Ok(Self {
            fine,
            coarse,
            ratios,
        })
    }

    pub fn from_settings(settings: &BackfillSettings) -> Result<Self, ConfigError> {
        Self::new(
            settings.fine,
            settings.coarse,
            RatioTable::from_settings(&settings.ratios)?,
        )
    }

    /// Fine window first, then coarse.
    pub fn windows(&self) -> [&BackfillWindow; 2] {
        [&self.fine, &self.coarse]
    }

    pub fn ratios(&self) -> &RatioTable {
        &self.ratios
    }

    /// Ticks per subject across both windows.
    pub fn ticks_per_subject(&self) -> u64 {
        u64::from(self.fine.ticks) + u64::from(self.coarse.ticks)
    }

    /// Both windows must fit between `now` and the earliest representable time.
    pub fn validate_at(&self, now: Timestamp) -> Result<(), ConfigError> {
        for window in self.windows() {
            window.validate()?;
            now.checked_sub_signed(window.span()?)
                .ok_or(ConfigError::WindowOutOfRange {
                    resolution: window.resolution,
                })?;
        }
        Ok(())
    }
}

impl Default for BackfillPlan {
    fn default() -> Self {
        Self {
            fine: BackfillWindow::fine(),
            coarse: BackfillWindow::coarse(),
            ratios: RatioTable::default(),
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    NotStarted,
    Running(Resolution),
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowReport {
    pub resolution: Resolution,
    pub ticks: u32,
    pub first_timestamp: Option<Timestamp>,
    pub last_timestamp: Option<Timestamp>,
    pub magnitude_total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub subject: String,
    pub windows: Vec<WindowReport>,
    pub counter_calls: usize,
    pub frequency_calls: usize,
    pub frequency_entries: usize,
}

/// Runs one subject's backfill. Not resumable: every `run` starts over
/// from the fine window, and anything already written stays written.
pub struct BackfillRunner<'a, S: ?Sized> {
    store: &'a S,
    plan: &'a BackfillPlan,
    state: RunnerState,
}

impl<'a, S: TelemetryStore + ?Sized> BackfillRunner<'a, S> {
    pub fn new(store: &'a S, plan: &'a BackfillPlan) -> Self {
        Self {
            store,
            plan,
            state: RunnerState::NotStarted,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn run(
        &mut self,
        subject: &Subject,
        now: Timestamp,
        magnitudes: &mut dyn MagnitudeSource,
    ) -> Result<BackfillReport, BackfillError> {
        self.state = RunnerState::NotStarted;
        let result = self
            .plan
            .validate_at(now)
            .map_err(BackfillError::from)
            .and_then(|()| self.run_windows(subject, now, magnitudes));
        self.state = match result {
            Ok(_) => RunnerState::Done,
            Err(_) => RunnerState::Failed,
        };
        result
    }

    fn run_windows(
        &mut self,
        subject: &Subject,
        now: Timestamp,
        magnitudes: &mut dyn MagnitudeSource,
    ) -> Result<BackfillReport, BackfillError> {
        let (store, plan) = (self.store, self.plan);
        let label = subject.label();
        let group = subject.scope_group();
        let counters = RatioedCounterEmitter::new(store, plan.ratios());
        let fanout = FrequencyFanout::new(store);

        let mut report = BackfillReport {
            subject: label.clone(),
            windows: Vec::with_capacity(2),
            counter_calls: 0,
            frequency_calls: 0,
            frequency_entries: 0,
        };

        for window in plan.windows() {
            self.state = RunnerState::Running(window.resolution);
            tracing::debug!(
                subject = %label,
                resolution = %window.resolution,
                ticks = window.ticks,
                step_secs = window.step_secs,
                "backfilling window"
            );

            let mut window_report = WindowReport {
                resolution: window.resolution,
                ticks: 0,
                first_timestamp: None,
                last_timestamp: None,
                magnitude_total: 0,
            };

            let cursor = TimeCursor::new(now);
            for tick in cursor.advance(window, &mut *magnitudes)? {
                let store_err = |source| BackfillError::Store {
                    resolution: window.resolution,
                    tick: tick.index + 1,
                    source,
                };

                report.counter_calls += counters
                    .emit(&group, tick.timestamp, tick.magnitude)
                    .map_err(store_err)?;
                if let Subject::Entity(scopes) = subject {
                    report.frequency_entries += fanout
                        .emit(scopes, tick.timestamp, tick.magnitude)
                        .map_err(store_err)?;
                    report.frequency_calls += 1;
                }

                window_report.ticks += 1;
                window_report.first_timestamp.get_or_insert(tick.timestamp);
                window_report.last_timestamp = Some(tick.timestamp);
                window_report.magnitude_total =
                    window_report.magnitude_total.saturating_add(tick.magnitude);
            }

            report.windows.push(window_report);
        }

        tracing::info!(
            subject = %label,
            counter_calls = report.counter_calls,
            frequency_calls = report.frequency_calls,
            "subject backfilled"
        );
        Ok(report)
    }
}
