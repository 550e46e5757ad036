//! Arbitrage-freedom gates (spec §4.4.5): pure functions of a candidate
//! surface or curve producing `Pass` or a witnessed `Fail`, each carrying
//! a severity that drives publish/reject/warn routing.

use chrono::{DateTime, Duration, Utc};

use crate::market::credit_curve::CreditCurve;
use crate::market::svi::SviSlice;

/// Gate severity (spec §4.4.5): Critical gates reject, High gates publish
/// with a warning, Medium gates publish with a diagnostic log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GateSeverity {
    Medium,
    High,
    Critical,
}

/// A single gate failure, carrying the witness (the grid point or tenor
/// where the condition failed) for audit and diagnosis.
#[derive(Debug, Clone, PartialEq)]
pub struct GateFailure {
    pub gate_name: &'static str,
    pub severity: GateSeverity,
    pub witness: String,
}

/// The aggregate verdict across a taxonomy run, with the severity-routing
/// decision already applied (spec §4.4.5 "Severity routing").
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationVerdict {
    Pass,
    Warn(Vec<GateFailure>),
    Reject(Vec<GateFailure>),
}

impl CalibrationVerdict {
    pub fn from_failures(failures: Vec<GateFailure>) -> Self {
        if failures.iter().any(|f| f.severity == GateSeverity::Critical) {
            CalibrationVerdict::Reject(failures)
        } else if failures.is_empty() {
            CalibrationVerdict::Pass
        } else {
            CalibrationVerdict::Warn(failures)
        }
    }
}

const LOG_MONEYNESS_GRID_MIN: f64 = -5.0;
const LOG_MONEYNESS_GRID_MAX: f64 = 5.0;

/// Default log-moneyness grid resolution (spec §4.4.5), overridable via
/// [`crate::config::OracleConfig::svi_grid_step`].
pub const DEFAULT_LOG_MONEYNESS_GRID_STEP: f64 = 0.01;

fn log_moneyness_grid(grid_step: f64) -> impl Iterator<Item = f64> {
    let steps = ((LOG_MONEYNESS_GRID_MAX - LOG_MONEYNESS_GRID_MIN) / grid_step).round() as i64;
    (0..=steps).map(move |i| LOG_MONEYNESS_GRID_MIN + i as f64 * grid_step)
}

/// Calendar spread gate (Critical): for every consecutive expiry pair,
/// total variance must not decrease on the common log-moneyness grid
/// (spec §4.4.5).
pub fn calendar_spread_gate(slices: &[SviSlice], grid_step: f64) -> Vec<GateFailure> {
    let mut failures = Vec::new();
    for window in slices.windows(2) {
        let (earlier, later) = (&window[0], &window[1]);
        for k in log_moneyness_grid(grid_step) {
            let w_earlier = earlier.total_variance(k);
            let w_later = later.total_variance(k);
            if w_later < w_earlier - 1e-10 {
                failures.push(GateFailure {
                    gate_name: "calendar_spread",
                    severity: GateSeverity::Critical,
                    witness: format!(
                        "k={k:.2}, T1={} w={w_earlier:.8}, T2={} w={w_later:.8}",
                        earlier.expiry_years, later.expiry_years
                    ),
                });
                break;
            }
        }
    }
    failures
}

/// Durrleman butterfly gate (Critical): `g(k) >= -1e-10` on the grid,
/// using analytic SVI derivatives (spec §4.4.5: "no finite differences").
pub fn durrleman_butterfly_gate(slices: &[SviSlice], grid_step: f64) -> Vec<GateFailure> {
    let mut failures = Vec::new();
    for slice in slices {
        for k in log_moneyness_grid(grid_step) {
            let w = slice.total_variance(k);
            if w <= 0.0 {
                continue; // caught by the positive-variance gate
            }
            let w1 = slice.first_derivative(k);
            let w2 = slice.second_derivative(k);
            let g = (1.0 - k * w1 / (2.0 * w)).powi(2) - (w1 * w1 / 4.0) * (1.0 / w + 0.25) + w2 / 2.0;
            if g < -1e-10 {
                failures.push(GateFailure {
                    gate_name: "durrleman_butterfly",
                    severity: GateSeverity::Critical,
                    witness: format!("expiry={}, k={k:.2}, g={g:.8}", slice.expiry_years),
                });
                break;
            }
        }
    }
    failures
}

/// Roger Lee wing bound gate (Critical), both wings: asymptotic slope of
/// total variance is bounded by 2 on each side (spec §4.4.5).
pub fn roger_lee_wings_gate(slices: &[SviSlice]) -> Vec<GateFailure> {
    let mut failures = Vec::new();
    for slice in slices {
        let rho_f = crate::market::numerics::decimal_to_f64(slice.rho);
        let b_f = crate::market::numerics::decimal_to_f64(slice.b);
        let right_slope = b_f * (1.0 + rho_f);
        let left_slope = b_f * (1.0 - rho_f);
        if right_slope > 2.0 + 1e-9 {
            failures.push(GateFailure {
                gate_name: "roger_lee_right_wing",
                severity: GateSeverity::Critical,
                witness: format!("expiry={}, slope={right_slope:.6}", slice.expiry_years),
            });
        }
        if left_slope > 2.0 + 1e-9 {
            failures.push(GateFailure {
                gate_name: "roger_lee_left_wing",
                severity: GateSeverity::Critical,
                witness: format!("expiry={}, slope={left_slope:.6}", slice.expiry_years),
            });
        }
    }
    failures
}

/// Positive variance gate (Critical): `w(k,T) > 0` on the grid.
pub fn positive_variance_gate(slices: &[SviSlice], grid_step: f64) -> Vec<GateFailure> {
    let mut failures = Vec::new();
    for slice in slices {
        for k in log_moneyness_grid(grid_step) {
            let w = slice.total_variance(k);
            if w <= 0.0 {
                failures.push(GateFailure {
                    gate_name: "positive_variance",
                    severity: GateSeverity::Critical,
                    witness: format!("expiry={}, k={k:.2}, w={w:.8}", slice.expiry_years),
                });
                break;
            }
        }
    }
    failures
}

/// ATM variance monotonicity gate (Critical): ATM total variance must be
/// non-decreasing across increasing expiries.
pub fn atm_variance_monotonicity_gate(slices: &[SviSlice]) -> Vec<GateFailure> {
    let mut failures = Vec::new();
    for window in slices.windows(2) {
        let atm_earlier = window[0].total_variance(0.0);
        let atm_later = window[1].total_variance(0.0);
        if atm_later < atm_earlier - 1e-10 {
            failures.push(GateFailure {
                gate_name: "atm_variance_monotonicity",
                severity: GateSeverity::Critical,
                witness: format!(
                    "T1={} atm={atm_earlier:.8}, T2={} atm={atm_later:.8}",
                    window[0].expiry_years, window[1].expiry_years
                ),
            });
        }
    }
    failures
}

/// ATM skew term structure gate (High, not Critical): the ATM skew
/// `dw/dk` at `k=0` must be finite and within an empirical envelope.
pub fn atm_skew_term_structure_gate(slices: &[SviSlice], envelope: f64) -> Vec<GateFailure> {
    let mut failures = Vec::new();
    for slice in slices {
        let skew = slice.first_derivative(0.0);
        if !skew.is_finite() || skew.abs() > envelope {
            failures.push(GateFailure {
                gate_name: "atm_skew_term_structure",
                severity: GateSeverity::High,
                witness: format!("expiry={}, skew={skew:.6}", slice.expiry_years),
            });
        }
    }
    failures
}

/// Run the full volatility-surface gate taxonomy (spec §4.4.5) against a
/// per-expiry SVI slice sequence and produce the routed verdict.
pub fn run_surface_gates(slices: &[SviSlice], grid_step: f64) -> CalibrationVerdict {
    let mut failures = Vec::new();
    failures.extend(calendar_spread_gate(slices, grid_step));
    failures.extend(durrleman_butterfly_gate(slices, grid_step));
    failures.extend(roger_lee_wings_gate(slices));
    failures.extend(positive_variance_gate(slices, grid_step));
    failures.extend(atm_variance_monotonicity_gate(slices));
    failures.extend(atm_skew_term_structure_gate(slices, 10.0));
    CalibrationVerdict::from_failures(failures)
}

/// Credit curve gates (spec §4.4.5), all Critical except the ISDA
/// re-pricing consistency gate (High). Most are defense-in-depth on a
/// [`CreditCurve`] whose constructor already enforces them (mirroring the
/// ledger engine's construction-plus-postcheck pattern).
pub fn run_credit_curve_gates(curve: &CreditCurve, repricing_error_bps: f64) -> CalibrationVerdict {
    let mut failures = Vec::new();

    for (tenor, q) in curve.tenors().iter().zip(curve.survival_probabilities()) {
        if *q <= rust_decimal::Decimal::ZERO || *q > rust_decimal::Decimal::ONE {
            failures.push(GateFailure {
                gate_name: "survival_probability_range",
                severity: GateSeverity::Critical,
                witness: format!("tenor={tenor}, Q={q}"),
            });
        }
    }
    for window in curve.survival_probabilities().windows(2) {
        if window[1] > window[0] {
            failures.push(GateFailure {
                gate_name: "survival_non_increasing",
                severity: GateSeverity::Critical,
                witness: format!("Q jumps up from {} to {}", window[0], window[1]),
            });
        }
    }
    for (tenor, hazard) in curve.tenors().iter().zip(curve.hazard_rates()) {
        if *hazard < rust_decimal::Decimal::ZERO {
            failures.push(GateFailure {
                gate_name: "hazard_non_negative",
                severity: GateSeverity::Critical,
                witness: format!("tenor={tenor}, hazard={hazard}"),
            });
        }
    }
    if repricing_error_bps.abs() >= 0.5 {
        failures.push(GateFailure {
            gate_name: "isda_repricing_consistency",
            severity: GateSeverity::High,
            witness: format!("repricing error {repricing_error_bps:.4}bps"),
        });
    }

    CalibrationVerdict::from_failures(failures)
}

/// Publish/reject/warn routing outcome for a candidate market object
/// (spec §4.4.5 "Severity routing", §7 "MissingObservable").
#[derive(Debug, Clone, PartialEq)]
pub enum PublicationOutcome<T> {
    Published(T),
    PublishedWithWarning(T, Vec<GateFailure>),
    RejectedFellBackToStale(T, Vec<GateFailure>),
    RejectedNoFallback(Vec<GateFailure>),
}

/// Apply the verdict from [`run_surface_gates`]/[`run_credit_curve_gates`]
/// to a candidate, falling back to the last known-good object if its age
/// is under `staleness_threshold` on Critical rejection.
pub fn route_publication<T: Clone>(
    candidate: T,
    verdict: CalibrationVerdict,
    fallback: Option<(T, DateTime<Utc>)>,
    now: DateTime<Utc>,
    staleness_threshold: Duration,
) -> PublicationOutcome<T> {
    match verdict {
        CalibrationVerdict::Pass => PublicationOutcome::Published(candidate),
        CalibrationVerdict::Warn(failures) => {
            tracing::warn!(failures = failures.len(), "calibration published with warnings");
            PublicationOutcome::PublishedWithWarning(candidate, failures)
        }
        CalibrationVerdict::Reject(failures) => {
            tracing::error!(failures = failures.len(), "calibration rejected by gate taxonomy");
            match fallback {
                Some((fallback_value, fallback_ts)) if now - fallback_ts <= staleness_threshold => {
                    tracing::warn!(age_seconds = (now - fallback_ts).num_seconds(), "falling back to last known-good calibration");
                    PublicationOutcome::RejectedFellBackToStale(fallback_value, failures)
                }
                _ => PublicationOutcome::RejectedNoFallback(failures),
            }
        }
    }
}
