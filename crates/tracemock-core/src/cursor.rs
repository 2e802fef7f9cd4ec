//! Backward-stepping time cursor and the magnitude sources it draws from.

use crate::error::ConfigError;
use crate::model::Timestamp;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::FusedIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Second-granularity recent history.
    Fine,
    /// Hour-granularity long history.
    Coarse,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Fine => f.write_str("fine"),
            Resolution::Coarse => f.write_str("coarse"),
        }
    }
}

/// Inclusive range magnitudes are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagnitudeRange {
    pub min: u64,
    pub max: u64,
}

impl MagnitudeRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// `ticks` steps of `step_secs`, walking back from "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillWindow {
    pub resolution: Resolution,
    pub ticks: u32,
    pub step_secs: i64,
    pub magnitude: MagnitudeRange,
}

impl BackfillWindow {
    /// 60 ticks at 1 second, magnitudes in [1, 10].
    pub const fn fine() -> Self {
        Self {
            resolution: Resolution::Fine,
            ticks: 60,
            step_secs: 1,
            magnitude: MagnitudeRange::new(1, 10),
        }
    }

    /// 720 ticks (30 days) at 1 hour, magnitudes in [100, 1000].
    pub const fn coarse() -> Self {
        Self {
            resolution: Resolution::Coarse,
            ticks: 24 * 30,
            step_secs: 3600,
            magnitude: MagnitudeRange::new(100, 1000),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks == 0 {
            return Err(ConfigError::EmptyWindow {
                resolution: self.resolution,
            });
        }
        if self.step_secs <= 0 {
            return Err(ConfigError::NonPositiveStep {
                resolution: self.resolution,
                step_secs: self.step_secs,
            });
        }
        if self.magnitude.min > self.magnitude.max {
            return Err(ConfigError::EmptyMagnitudeRange {
                resolution: self.resolution,
                min: self.magnitude.min,
                max: self.magnitude.max,
            });
        }
        self.span()?;
        Ok(())
    }

    pub fn step(&self) -> Result<Duration, ConfigError> {
        Duration::try_seconds(self.step_secs).ok_or(ConfigError::WindowOutOfRange {
            resolution: self.resolution,
        })
    }

    /// Total distance the cursor travels over the window.
    pub fn span(&self) -> Result<Duration, ConfigError> {
        let out_of_range = ConfigError::WindowOutOfRange {
            resolution: self.resolution,
        };
        let ticks = i32::try_from(self.ticks).map_err(|_| out_of_range.clone())?;
        self.step()?.checked_mul(ticks).ok_or(out_of_range)
    }
}

// ============================================================================
// Magnitude sources
// ============================================================================

/// Supplies the base magnitude of each tick.
pub trait MagnitudeSource {
    fn draw(&mut self, range: MagnitudeRange) -> u64;
}

/// Uniform draws from a seedable RNG.
#[derive(Debug, Clone)]
pub struct SeededMagnitudes {
    rng: StdRng,
}

impl SeededMagnitudes {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The underlying RNG, for callers that need other draws from the same stream.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl MagnitudeSource for SeededMagnitudes {
    fn draw(&mut self, range: MagnitudeRange) -> u64 {
        self.rng.gen_range(range.min..=range.max)
    }
}

/// Replays a fixed list of magnitudes, cycling when exhausted.
///
/// Values are returned as-is, even outside the requested range.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMagnitudes {
    values: Vec<u64>,
    position: usize,
}

impl ScriptedMagnitudes {
    pub fn new(values: Vec<u64>) -> Self {
        Self {
            values,
            position: 0,
        }
    }
}

impl MagnitudeSource for ScriptedMagnitudes {
    fn draw(&mut self, range: MagnitudeRange) -> u64 {
        if self.values.is_empty() {
            return range.min;
        }
        let value = self.values[self.position];
        self.position = (self.position + 1) % self.values.len();
        value
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// One step of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 0-based position within the window.
    pub index: u32,
    pub timestamp: Timestamp,
    pub magnitude: u64,
}

/// Anchors every window at the same "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCursor {
    now: Timestamp,
}

impl TimeCursor {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Lazily yields exactly `window.ticks` ticks, `now` first, each one
    /// `window.step_secs` earlier than the last.
    pub fn advance<'s>(
        &self,
        window: &BackfillWindow,
        magnitudes: &'s mut dyn MagnitudeSource,
    ) -> Result<Ticks<'s>, ConfigError> {
        window.validate()?;
        let step = window.step()?;
        self.now
            .checked_sub_signed(window.span()?)
            .ok_or(ConfigError::WindowOutOfRange {
                resolution: window.resolution,
            })?;

        Ok(Ticks {
            next_timestamp: self.now,
            step,
            index: 0,
            ticks: window.ticks,
            range: window.magnitude,
            magnitudes,
        })
    }
}

/// Iterator returned by [`TimeCursor::advance`].
pub struct Ticks<'s> {
    next_timestamp: Timestamp,
    step: Duration,
    index: u32,
    ticks: u32,
    range: MagnitudeRange,
    magnitudes: &'s mut dyn MagnitudeSource,
}

impl Iterator for Ticks<'_> {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        if self.index >= self.ticks {
            return None;
        }
        let tick = Tick {
            index: self.index,
            timestamp: self.next_timestamp,
            magnitude: self.magnitudes.draw(self.range),
        };
        self.index += 1;
        // The whole span was checked in `advance`.
        self.next_timestamp = self
            .next_timestamp
            .checked_sub_signed(self.step)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Some(tick)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.ticks - self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Ticks<'_> {}
impl FusedIterator for Ticks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn fine_window_steps_back_one_second() {
        let mut mags = SeededMagnitudes::new(7);
        let ticks: Vec<_> = TimeCursor::new(now())
            .advance(&BackfillWindow::fine(), &mut mags)
            .unwrap()
            .collect();

        assert_eq!(ticks.len(), 60);
        for (i, tick) in ticks.iter().enumerate() {
            assert_eq!(tick.timestamp, now() - Duration::seconds(i as i64));
            assert!((1..=10).contains(&tick.magnitude));
        }
    }

    #[test]
    fn coarse_window_restarts_at_now() {
        let cursor = TimeCursor::new(now());
        let mut mags = SeededMagnitudes::new(7);
        let fine_last = cursor
            .advance(&BackfillWindow::fine(), &mut mags)
            .unwrap()
            .last()
            .unwrap();
        let mut coarse = cursor.advance(&BackfillWindow::coarse(), &mut mags).unwrap();
        assert_eq!(coarse.len(), 720);

        let first = coarse.next().unwrap();
        assert_eq!(first.timestamp, now());
        assert!(first.timestamp > fine_last.timestamp);
        assert!((100..=1000).contains(&first.magnitude));

        let last = coarse.last().unwrap();
        assert_eq!(last.index, 719);
        assert_eq!(last.timestamp, now() - Duration::hours(719));
    }

    #[test]
    fn iterator_is_fused() {
        let mut mags = ScriptedMagnitudes::new(vec![3]);
        let window = BackfillWindow {
            ticks: 2,
            ..BackfillWindow::fine()
        };
        let mut ticks = TimeCursor::new(now()).advance(&window, &mut mags).unwrap();
        assert!(ticks.next().is_some());
        assert!(ticks.next().is_some());
        assert!(ticks.next().is_none());
        assert!(ticks.next().is_none());
    }

    #[test]
    fn invalid_windows_fail_before_any_tick() {
        let mut mags = ScriptedMagnitudes::default();
        let cursor = TimeCursor::new(now());

        let zero = BackfillWindow {
            ticks: 0,
            ..BackfillWindow::fine()
        };
        assert!(matches!(
            cursor.advance(&zero, &mut mags),
            Err(ConfigError::EmptyWindow { .. })
        ));

        let backwards = BackfillWindow {
            step_secs: -1,
            ..BackfillWindow::coarse()
        };
        assert!(matches!(
            cursor.advance(&backwards, &mut mags),
            Err(ConfigError::NonPositiveStep { .. })
        ));

        let inverted = BackfillWindow {
            magnitude: MagnitudeRange::new(10, 1),
            ..BackfillWindow::fine()
        };
        assert!(matches!(
            cursor.advance(&inverted, &mut mags),
            Err(ConfigError::EmptyMagnitudeRange { .. })
        ));

        let huge = BackfillWindow {
            ticks: u32::MAX,
            step_secs: i64::MAX / 2_000,
            ..BackfillWindow::coarse()
        };
        assert!(matches!(
            cursor.advance(&huge, &mut mags),
            Err(ConfigError::WindowOutOfRange { .. })
        ));
    }

    #[test]
    fn scripted_magnitudes_cycle() {
        let mut mags = ScriptedMagnitudes::new(vec![5, 6]);
        let range = MagnitudeRange::new(1, 10);
        assert_eq!(mags.draw(range), 5);
        assert_eq!(mags.draw(range), 6);
        assert_eq!(mags.draw(range), 5);
        assert_eq!(ScriptedMagnitudes::default().draw(range), 1);
    }
}
