//! Round-robin selectors over fixed categorical domains.
//!
//! A [`SelectorPool`] is created once per run and handed to whatever
//! generates sample events, so consecutive events cycle through platforms,
//! levels and environments instead of repeating one value. The pool is an
//! ordinary value: tests build their own and can `reset()` it.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PLATFORMS: &[&str] = &["ruby", "php", "python", "java", "javascript"];

/// Empty string means "no environment".
pub const ENVIRONMENTS: &[&str] = &["production", "production", "staging", "alpha", "beta", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub const CYCLE: [Level; 5] = [
        Level::Info,
        Level::Error,
        Level::Warning,
        Level::Debug,
        Level::Fatal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cycles through `values` in order, wrapping after the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicSelector<T> {
    values: Vec<T>,
    position: usize,
}

impl<T: Clone> CyclicSelector<T> {
    pub fn new(domain: &str, values: Vec<T>) -> Result<Self, ConfigError> {
        if values.is_empty() {
            return Err(ConfigError::EmptySelectorDomain {
                domain: domain.to_string(),
            });
        }
        Ok(Self {
            values,
            position: 0,
        })
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> T {
        let value = self.values[self.position].clone();
        self.position = (self.position + 1) % self.values.len();
        value
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}

/// The per-run set of categorical selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPool {
    platform: CyclicSelector<&'static str>,
    level: CyclicSelector<Level>,
    environment: CyclicSelector<&'static str>,
}

impl SelectorPool {
    pub fn new(
        platforms: Vec<&'static str>,
        levels: Vec<Level>,
        environments: Vec<&'static str>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            platform: CyclicSelector::new("platform", platforms)?,
            level: CyclicSelector::new("level", levels)?,
            environment: CyclicSelector::new("environment", environments)?,
        })
    }

    pub fn next_platform(&mut self) -> &'static str {
        self.platform.next()
    }

    pub fn next_level(&mut self) -> Level {
        self.level.next()
    }

    pub fn next_environment(&mut self) -> &'static str {
        self.environment.next()
    }

    pub fn reset(&mut self) {
        self.platform.reset();
        self.level.reset();
        self.environment.reset();
    }
}

impl Default for SelectorPool {
    fn default() -> Self {
        Self {
            platform: CyclicSelector {
                values: PLATFORMS.to_vec(),
                position: 0,
            },
            level: CyclicSelector {
                values: Level::CYCLE.to_vec(),
                position: 0,
            },
            environment: CyclicSelector {
                values: ENVIRONMENTS.to_vec(),
                position: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_wraps_after_last_value() {
        let mut sel = CyclicSelector::new("t", vec![1, 2, 3]).unwrap();
        let seen: Vec<_> = (0..7).map(|_| sel.next()).collect();
        assert_eq!(seen, vec![1, 2, 3, 1, 2, 3, 1]);
        assert_eq!(sel.position(), 1);
    }

    #[test]
    fn empty_domain_is_rejected() {
        let err = CyclicSelector::<u8>::new("platform", Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySelectorDomain { .. }));
    }

    #[test]
    fn consecutive_platforms_never_repeat() {
        let mut pool = SelectorPool::default();
        let mut prev = pool.next_platform();
        for _ in 0..20 {
            let next = pool.next_platform();
            assert_ne!(prev, next);
            prev = next;
        }
    }

    #[test]
    fn position_persists_across_calls_until_reset() {
        let mut pool = SelectorPool::default();
        assert_eq!(pool.next_level(), Level::Info);
        assert_eq!(pool.next_level(), Level::Error);
        assert_eq!(pool.next_environment(), "production");
        pool.reset();
        assert_eq!(pool.next_level(), Level::Info);
        assert_eq!(pool.next_platform(), "ruby");
    }

    #[test]
    fn single_value_domain_repeats() {
        let mut pool = SelectorPool::new(vec!["go"], vec![Level::Error], vec![""]).unwrap();
        assert_eq!(pool.next_platform(), "go");
        assert_eq!(pool.next_platform(), "go");
        assert_eq!(pool.next_environment(), "");
    }
}
