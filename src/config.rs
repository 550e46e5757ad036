//! Process-wide, non-domain configuration (spec §6 "Process-wide state",
//! SPEC_FULL.md §A.3): the decimal arithmetic context, staleness
//! thresholds, and calibration iteration caps, loadable from TOML (as
//! `cooprefr-bettersys/rust-backend` loads its own configuration), with
//! defaults matching the literal constants spec.md names.

use std::path::Path;

use chrono::Duration;
use serde::Deserialize;

use crate::error::Error;
use crate::market::credit_curve::{BRENT_TOLERANCE, REPRICING_TOLERANCE};
use crate::value::decimal::PRECISION;

/// Top-level process configuration. Every field has a default matching a
/// literal constant named in spec.md, so `CoreConfig::default()` is
/// already a faithful runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub decimal: DecimalConfig,
    pub oracle: OracleConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            decimal: DecimalConfig::default(),
            oracle: OracleConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::persistence("config", format!("reading {}: {e}", path.as_ref().display())))?;
        toml::from_str(&contents).map_err(|e| Error::persistence("config", format!("parsing TOML: {e}")))
    }
}

/// The process-wide decimal arithmetic context's parameters (spec §6).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DecimalConfig {
    pub precision: u32,
}

impl Default for DecimalConfig {
    fn default() -> Self {
        Self { precision: PRECISION }
    }
}

/// Oracle-side tunables: staleness thresholds (spec §4.4.5, §7) and
/// calibration iteration/tolerance caps (spec §4.4.3, §4.4.4, §5
/// "Cancellation & timeout").
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub staleness_threshold_hours: i64,
    pub credit_curve_brent_tolerance: f64,
    pub credit_curve_repricing_tolerance: f64,
    pub svi_grid_step: f64,
    pub svi_max_refinement_iterations: u32,
}

impl OracleConfig {
    pub fn staleness_threshold(&self) -> Duration {
        Duration::hours(self.staleness_threshold_hours)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_hours: 24,
            credit_curve_brent_tolerance: BRENT_TOLERANCE,
            credit_curve_repricing_tolerance: REPRICING_TOLERANCE,
            svi_grid_step: 0.01,
            svi_max_refinement_iterations: 40,
        }
    }
}
