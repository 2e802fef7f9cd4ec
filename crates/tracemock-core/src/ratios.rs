//! Fixed ratio rules applied to a tick's magnitude.
//!
//! The derived counts are intentionally not a partition of the magnitude:
//! success (0.9) + client errors (0.05) + server errors (0.1) overshoot,
//! and truncation can undershoot. They are reproduced exactly as
//! `floor(magnitude * ratio)`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

const BASIS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricRole {
    /// 2xx responses; also counted as requests.
    Success,
    ClientError,
    ServerError,
    /// Raw event count for project and group.
    Raw,
    Received,
    Rejected,
}

impl MetricRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricRole::Success => "success",
            MetricRole::ClientError => "client_error",
            MetricRole::ServerError => "server_error",
            MetricRole::Raw => "raw",
            MetricRole::Received => "received",
            MetricRole::Rejected => "rejected",
        }
    }
}

impl fmt::Display for MetricRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-negative ratio stored as integer basis points (1/10000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ratio {
    basis_points: u64,
}

impl Ratio {
    pub const ONE: Ratio = Ratio {
        basis_points: BASIS,
    };

    pub const fn from_basis_points(basis_points: u64) -> Self {
        Self { basis_points }
    }

    pub fn from_fraction(role: MetricRole, value: f64) -> Result<Self, ConfigError> {
        let scaled = value * BASIS as f64;
        if !value.is_finite() || value < 0.0 || !scaled.is_finite() || scaled > u64::MAX as f64 {
            return Err(ConfigError::InvalidRatio {
                role: role.to_string(),
                value,
            });
        }
        Ok(Self {
            basis_points: scaled.round() as u64,
        })
    }

    pub fn as_f64(self) -> f64 {
        self.basis_points as f64 / BASIS as f64
    }

    /// `floor(magnitude * ratio)`, saturating at `u64::MAX`.
    pub fn apply(self, magnitude: u64) -> u64 {
        let scaled = u128::from(magnitude) * u128::from(self.basis_points) / u128::from(BASIS);
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

/// Ratios as they appear in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioSettings {
    pub success: f64,
    pub client_error: f64,
    pub server_error: f64,
    pub received: f64,
    pub rejected: f64,
}

impl Default for RatioSettings {
    fn default() -> Self {
        Self {
            success: 0.9,
            client_error: 0.05,
            server_error: 0.1,
            received: 1.1,
            rejected: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioTable {
    success: Ratio,
    client_error: Ratio,
    server_error: Ratio,
    received: Ratio,
    rejected: Ratio,
}

impl RatioTable {
    pub fn from_settings(settings: &RatioSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            success: Ratio::from_fraction(MetricRole::Success, settings.success)?,
            client_error: Ratio::from_fraction(MetricRole::ClientError, settings.client_error)?,
            server_error: Ratio::from_fraction(MetricRole::ServerError, settings.server_error)?,
            received: Ratio::from_fraction(MetricRole::Received, settings.received)?,
            rejected: Ratio::from_fraction(MetricRole::Rejected, settings.rejected)?,
        })
    }

    pub fn ratio(&self, role: MetricRole) -> Ratio {
        match role {
            MetricRole::Success => self.success,
            MetricRole::ClientError => self.client_error,
            MetricRole::ServerError => self.server_error,
            MetricRole::Raw => Ratio::ONE,
            MetricRole::Received => self.received,
            MetricRole::Rejected => self.rejected,
        }
    }

    pub fn amount(&self, role: MetricRole, magnitude: u64) -> u64 {
        self.ratio(role).apply(magnitude)
    }

    pub fn settings(&self) -> RatioSettings {
        RatioSettings {
            success: self.success.as_f64(),
            client_error: self.client_error.as_f64(),
            server_error: self.server_error.as_f64(),
            received: self.received.as_f64(),
            rejected: self.rejected.as_f64(),
        }
    }
}

impl Default for RatioTable {
    fn default() -> Self {
        Self {
            success: Ratio::from_basis_points(9_000),
            client_error: Ratio::from_basis_points(500),
            server_error: Ratio::from_basis_points(1_000),
            received: Ratio::from_basis_points(11_000),
            rejected: Ratio::from_basis_points(1_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_ratios_truncate() {
        let table = RatioTable::default();
        let triple = |m| {
            (
                table.amount(MetricRole::Success, m),
                table.amount(MetricRole::ClientError, m),
                table.amount(MetricRole::ServerError, m),
            )
        };
        assert_eq!(triple(10), (9, 0, 1));
        assert_eq!(triple(100), (90, 5, 10));
        assert_eq!(triple(1), (0, 0, 0));
    }

    #[test]
    fn derived_counts_are_not_normalized() {
        let table = RatioTable::default();
        let m = 1000;
        let sum = table.amount(MetricRole::Success, m)
            + table.amount(MetricRole::ClientError, m)
            + table.amount(MetricRole::ServerError, m);
        assert_eq!(sum, 1050);
    }

    #[test]
    fn entity_ratios() {
        let table = RatioTable::default();
        assert_eq!(table.amount(MetricRole::Raw, 100), 100);
        assert_eq!(table.amount(MetricRole::Received, 100), 110);
        assert_eq!(table.amount(MetricRole::Rejected, 100), 10);
        assert_eq!(table.amount(MetricRole::Received, 7), 7);
    }

    #[test]
    fn default_settings_match_default_table() {
        let table = RatioTable::from_settings(&RatioSettings::default()).unwrap();
        assert_eq!(table, RatioTable::default());
        assert_eq!(table.settings(), RatioSettings::default());
    }

    #[test]
    fn invalid_ratios_are_config_errors() {
        for bad in [f64::NAN, f64::INFINITY, -0.1] {
            let settings = RatioSettings {
                rejected: bad,
                ..RatioSettings::default()
            };
            let err = RatioTable::from_settings(&settings).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidRatio { ref role, .. } if role == "rejected")
            );
        }
    }

    #[test]
    fn apply_saturates() {
        assert_eq!(Ratio::from_basis_points(20_000).apply(u64::MAX), u64::MAX);
    }
}
