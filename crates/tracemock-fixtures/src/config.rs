//! Loader configuration.
//!
//! Precedence, lowest first: defaults, JSON file, environment, explicit
//! overrides applied by the caller.

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracemock_core::runner::BackfillSettings;
use tracemock_core::BackfillPlan;

pub const SEED_ENV: &str = "TRACEMOCK_SEED";
pub const NUM_EVENTS_ENV: &str = "TRACEMOCK_NUM_EVENTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Fixed seed for reproducible runs; drawn at random when unset.
    pub seed: Option<u64>,
    /// Sample events per project.
    pub num_events: usize,
    pub skip_default_setup: bool,
    pub with_releases: bool,
    pub commits_per_release: CountRange,
    pub backfill: BackfillSettings,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            seed: None,
            num_events: 1,
            skip_default_setup: false,
            with_releases: true,
            commits_per_release: CountRange { min: 1, max: 5 },
            backfill: BackfillSettings::default(),
        }
    }
}

impl LoadConfig {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| LoadError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `TRACEMOCK_*` overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(SEED_ENV) {
            self.seed = Some(parse_env(SEED_ENV, &value)?);
        }
        if let Some(value) = lookup(NUM_EVENTS_ENV) {
            self.num_events = parse_env(NUM_EVENTS_ENV, &value)?;
        }
        Ok(())
    }

    /// Check everything and build the backfill plan.
    pub fn validate(&self) -> Result<BackfillPlan, LoadError> {
        let CountRange { min, max } = self.commits_per_release;
        if min > max {
            return Err(LoadError::InvalidCommitRange { min, max });
        }
        Ok(BackfillPlan::from_settings(&self.backfill)?)
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, LoadError> {
    value.trim().parse().map_err(|_| LoadError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tracemock_core::ConfigError;

    #[test]
    fn defaults_validate() {
        let plan = LoadConfig::default().validate().unwrap();
        assert_eq!(plan.ticks_per_subject(), 780);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: LoadConfig =
            serde_json::from_str(r#"{"num_events": 3, "backfill": {"ratios": {"rejected": 0.2}}}"#)
                .unwrap();
        assert_eq!(config.num_events, 3);
        assert!(config.with_releases);
        assert_eq!(config.backfill.ratios.rejected, 0.2);
        assert_eq!(config.backfill.ratios.received, 1.1);
        assert_eq!(config.backfill.fine.ticks, 60);
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [(SEED_ENV, "42"), (NUM_EVENTS_ENV, " 7 ")].into();
        let mut config = LoadConfig::default();
        config
            .apply_env_from(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.num_events, 7);
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = LoadConfig::default();
        let err = config
            .apply_env_from(|var| (var == SEED_ENV).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidEnv { ref var, .. } if var == SEED_ENV));
    }

    #[test]
    fn invalid_windows_and_ranges_fail_validation() {
        let mut config = LoadConfig::default();
        config.backfill.coarse.ticks = 0;
        assert!(matches!(
            config.validate(),
            Err(LoadError::Config(ConfigError::EmptyWindow { .. }))
        ));

        let mut config = LoadConfig::default();
        config.commits_per_release = CountRange { min: 3, max: 1 };
        assert!(matches!(
            config.validate(),
            Err(LoadError::InvalidCommitRange { min: 3, max: 1 })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = LoadConfig::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, LoadError::ReadConfig { .. }));
    }
}
