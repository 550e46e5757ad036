//! Credit curve bootstrap (spec §4.4.3): piecewise-constant hazard rates
//! solved sequentially, tenor by tenor, from par CDS spreads, using
//! Brent's method against the par condition `PremiumLeg == ProtectionLeg`
//! (premium leg with accrual-on-default, protection leg assuming
//! mid-period default). Re-priced after bootstrap; rejected if any
//! tenor's re-pricing error exceeds 0.5bps (spec §8).

use rust_decimal::Decimal;

use crate::error::Error;
use crate::market::numerics::{brent, decimal_to_f64, f64_to_decimal};
use crate::market::yield_curve::YieldCurve;
use crate::value::canonical::ContentHash;
use crate::value::decimal::DecimalContext;

/// Brent tolerance on the hazard-rate root (spec §4.4.3: "tolerance
/// 10^-12").
pub const BRENT_TOLERANCE: f64 = 1e-12;
/// Maximum acceptable absolute re-pricing error, in spread units (0.5bps
/// = 5e-5).
pub const REPRICING_TOLERANCE: f64 = 5e-5;
/// Survival floor used to bound the per-tenor hazard search interval.
const SURVIVAL_FLOOR: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct CreditCurve {
    tenors: Vec<Decimal>,
    hazard_rates: Vec<Decimal>,
    survival_probabilities: Vec<Decimal>,
    recovery_rate: Decimal,
    discount_curve_reference: ContentHash,
}

impl CreditCurve {
    #[allow(clippy::too_many_arguments)]
    fn new(
        tenors: Vec<Decimal>,
        hazard_rates: Vec<Decimal>,
        survival_probabilities: Vec<Decimal>,
        recovery_rate: Decimal,
        discount_curve_reference: ContentHash,
    ) -> Result<Self, Error> {
        if tenors.is_empty() || tenors.len() != hazard_rates.len() || tenors.len() != survival_probabilities.len() {
            return Err(Error::single_violation("credit_curve", "tenors, hazard_rates, survival_probabilities must be equal non-empty length"));
        }
        for window in tenors.windows(2) {
            if window[1] <= window[0] {
                return Err(Error::single_violation("credit_curve.tenors", "must be strictly increasing"));
            }
        }
        for hazard in &hazard_rates {
            if *hazard < Decimal::ZERO {
                return Err(Error::single_violation("credit_curve.hazard_rates", format!("must be non-negative, got {hazard}")));
            }
        }
        for window in survival_probabilities.windows(2) {
            if window[1] > window[0] {
                return Err(Error::single_violation("credit_curve.survival_probabilities", "must be non-increasing"));
            }
        }
        for q in &survival_probabilities {
            if *q <= Decimal::ZERO || *q > Decimal::ONE {
                return Err(Error::single_violation("credit_curve.survival_probabilities", format!("must lie in (0, 1], got {q}")));
            }
        }
        if !(Decimal::ZERO..Decimal::ONE).contains(&recovery_rate) {
            return Err(Error::single_violation("credit_curve.recovery_rate", format!("must lie in [0, 1), got {recovery_rate}")));
        }
        Ok(Self {
            tenors,
            hazard_rates,
            survival_probabilities,
            recovery_rate,
            discount_curve_reference,
        })
    }

    pub fn tenors(&self) -> &[Decimal] {
        &self.tenors
    }

    pub fn hazard_rates(&self) -> &[Decimal] {
        &self.hazard_rates
    }

    pub fn survival_probabilities(&self) -> &[Decimal] {
        &self.survival_probabilities
    }

    pub fn recovery_rate(&self) -> Decimal {
        self.recovery_rate
    }

    pub fn discount_curve_reference(&self) -> &ContentHash {
        &self.discount_curve_reference
    }

    /// Survival probability at an arbitrary `t`, piecewise-constant-hazard
    /// interpolated between bootstrapped tenors.
    pub fn survival(&self, t: f64) -> f64 {
        survival_piecewise(&self.tenor_floats(), &self.hazard_floats(), t)
    }

    fn tenor_floats(&self) -> Vec<f64> {
        self.tenors.iter().map(|t| decimal_to_f64(*t)).collect()
    }

    fn hazard_floats(&self) -> Vec<f64> {
        self.hazard_rates.iter().map(|h| decimal_to_f64(*h)).collect()
    }
}

/// Piecewise-constant-hazard survival probability at `t`, given tenor
/// boundaries `tenors` (strictly increasing, `tenors[i]` is the end of
/// period `i` with constant hazard `hazards[i]`) and period starts
/// implicitly `0, tenors[0], tenors[1], ...`.
fn survival_piecewise(tenors: &[f64], hazards: &[f64], t: f64) -> f64 {
    let mut cumulative = 0.0;
    let mut prev = 0.0;
    for (tenor, hazard) in tenors.iter().zip(hazards) {
        if t <= *tenor {
            cumulative += hazard * (t - prev);
            return (-cumulative).exp();
        }
        cumulative += hazard * (tenor - prev);
        prev = *tenor;
    }
    // Beyond the last tenor: hold the last hazard rate flat.
    let last_hazard = *hazards.last().unwrap_or(&0.0);
    cumulative += last_hazard * (t - prev);
    (-cumulative).exp()
}

/// A single par CDS spread observation at a tenor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParSpread {
    pub tenor_years: Decimal,
    pub spread: Decimal,
}

/// Premium-leg and protection-leg PV for the period ending at `tenor`
/// given the hazard-rate path so far plus a trial hazard `lambda_n` for
/// the final period, and the implied par spread for that tenor.
struct LegResult {
    premium_pv_per_spread_unit: f64,
    protection_pv: f64,
}

fn price_legs(
    period_bounds: &[f64],
    hazards_so_far: &[f64],
    lambda_n: f64,
    discount: &YieldCurve,
    recovery: f64,
) -> LegResult {
    let mut hazards = hazards_so_far.to_vec();
    hazards.push(lambda_n);

    let mut premium_pv_per_spread_unit = 0.0;
    let mut protection_pv = 0.0;
    let mut prev_t = 0.0;
    for tenor in period_bounds {
        let delta = tenor - prev_t;
        let mid = (prev_t + tenor) / 2.0;
        let q_start = survival_piecewise(period_bounds, &hazards, prev_t);
        let q_end = survival_piecewise(period_bounds, &hazards, *tenor);
        let q_mid_default = q_start - q_end;
        let df_end = decimal_to_f64(discount.discount_factor(f64_to_decimal(*tenor)));
        let df_mid = decimal_to_f64(discount.discount_factor(f64_to_decimal(mid)));

        premium_pv_per_spread_unit += delta * df_end * q_end + 0.5 * delta * df_mid * q_mid_default;
        protection_pv += (1.0 - recovery) * df_mid * q_mid_default;

        prev_t = *tenor;
    }

    LegResult {
        premium_pv_per_spread_unit,
        protection_pv,
    }
}

/// Bootstrap a piecewise-constant hazard credit curve from par CDS
/// spreads at strictly increasing tenors `T_1 < ... < T_N` (spec §4.4.3).
/// Sequential: each tenor's hazard rate is solved by Brent's method
/// holding all earlier hazards fixed, then every input spread is
/// re-priced from the final curve; the bootstrap is rejected if any
/// tenor's re-pricing error exceeds 0.5bps.
pub fn bootstrap_credit_curve(
    spreads: &[ParSpread],
    recovery_rate: Decimal,
    discount_curve: &YieldCurve,
    brent_tolerance: f64,
    repricing_tolerance: f64,
) -> Result<CreditCurve, Error> {
    if spreads.is_empty() {
        return Err(Error::single_violation("credit_curve", "requires at least one par spread"));
    }
    if !(Decimal::ZERO..Decimal::ONE).contains(&recovery_rate) {
        return Err(Error::single_violation("credit_curve.recovery_rate", format!("must lie in [0, 1), got {recovery_rate}")));
    }

    let mut sorted = spreads.to_vec();
    sorted.sort_by(|a, b| a.tenor_years.cmp(&b.tenor_years));
    for window in sorted.windows(2) {
        if window[1].tenor_years <= window[0].tenor_years {
            return Err(Error::single_violation("credit_curve.tenors", "par spread tenors must be strictly increasing"));
        }
    }

    let recovery = decimal_to_f64(recovery_rate);
    let mut period_bounds: Vec<f64> = Vec::with_capacity(sorted.len());
    let mut hazards: Vec<f64> = Vec::with_capacity(sorted.len());

    for spread in &sorted {
        let tenor = decimal_to_f64(spread.tenor_years);
        let par_spread = decimal_to_f64(spread.spread);
        period_bounds.push(tenor);

        let prior_q = survival_piecewise(&period_bounds[..period_bounds.len() - 1], &hazards, *period_bounds.last().unwrap_or(&0.0));
        let last_bound = if period_bounds.len() >= 2 {
            period_bounds[period_bounds.len() - 2]
        } else {
            0.0
        };
        let delta = tenor - last_bound;
        let lambda_max = if delta > 0.0 && prior_q > SURVIVAL_FLOOR {
            (-(SURVIVAL_FLOOR / prior_q).ln() / delta).max(1e-8)
        } else {
            10.0
        };

        let objective = |lambda: f64| {
            let legs = price_legs(&period_bounds, &hazards, lambda, discount_curve, recovery);
            par_spread * legs.premium_pv_per_spread_unit - legs.protection_pv
        };

        let lambda_n = brent(objective, 0.0, lambda_max, brent_tolerance, 200)?;
        hazards.push(lambda_n);
    }

    // Re-pricing verification (spec §4.4.3, §8): recompute the implied
    // par spread for every input tenor from the final hazard path and
    // compare to the original input.
    for (idx, spread) in sorted.iter().enumerate() {
        let bounds = &period_bounds[..=idx];
        let legs = price_legs(bounds, &hazards[..idx], hazards[idx], discount_curve, recovery);
        if legs.premium_pv_per_spread_unit.abs() < f64::EPSILON {
            return Err(Error::Calibration {
                model: "credit_curve_bootstrap".to_string(),
                cause: "degenerate premium leg during re-pricing verification".to_string(),
                fit_quality: vec![],
            });
        }
        let implied_spread = legs.protection_pv / legs.premium_pv_per_spread_unit;
        let input_spread = decimal_to_f64(spread.spread);
        let error = (implied_spread - input_spread).abs();
        if error > repricing_tolerance {
            return Err(Error::Calibration {
                model: "credit_curve_bootstrap".to_string(),
                cause: format!(
                    "re-pricing error {error:.8} at tenor {} exceeds 0.5bps tolerance",
                    spread.tenor_years
                ),
                fit_quality: vec![("repricing_error".to_string(), f64_to_decimal(error))],
            });
        }
    }

    let ctx = DecimalContext::current();
    let tenors: Vec<Decimal> = sorted.iter().map(|s| s.tenor_years).collect();
    let hazard_rates: Vec<Decimal> = hazards.iter().map(|h| ctx.round(f64_to_decimal(*h))).collect();
    let survival_probabilities: Vec<Decimal> = period_bounds
        .iter()
        .map(|t| ctx.round(f64_to_decimal(survival_piecewise(&period_bounds, &hazards, *t))))
        .collect();

    let discount_reference = crate::value::canonical::content_hash(
        discount_curve
            .tenors()
            .iter()
            .zip(discount_curve.discount_factors())
            .fold(Vec::new(), |mut acc, (t, df)| {
                acc.extend_from_slice(t.to_string().as_bytes());
                acc.extend_from_slice(df.to_string().as_bytes());
                acc
            })
            .as_slice(),
    );

    CreditCurve::new(tenors, hazard_rates, survival_probabilities, recovery_rate, discount_reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::yield_curve::{bootstrap_yield_curve, RateInstrument};
    use rust_decimal_macros::dec;

    fn flat_discount_curve() -> YieldCurve {
        bootstrap_yield_curve(&[
            RateInstrument {
                tenor_years: dec!(1),
                rate: dec!(0.02),
            },
            RateInstrument {
                tenor_years: dec!(5),
                rate: dec!(0.02),
            },
            RateInstrument {
                tenor_years: dec!(10),
                rate: dec!(0.02),
            },
        ])
        .unwrap()
    }

    #[test]
    fn bootstrap_produces_non_increasing_survival() {
        let curve = bootstrap_credit_curve(
            &[
                ParSpread {
                    tenor_years: dec!(1),
                    spread: dec!(0.01),
                },
                ParSpread {
                    tenor_years: dec!(3),
                    spread: dec!(0.015),
                },
                ParSpread {
                    tenor_years: dec!(5),
                    spread: dec!(0.02),
                },
            ],
            dec!(0.40),
            &flat_discount_curve(),
            BRENT_TOLERANCE,
            REPRICING_TOLERANCE,
        )
        .unwrap();

        for window in curve.survival_probabilities().windows(2) {
            assert!(window[1] <= window[0]);
        }
        for q in curve.survival_probabilities() {
            assert!(*q > Decimal::ZERO && *q <= Decimal::ONE);
        }
        for h in curve.hazard_rates() {
            assert!(*h >= Decimal::ZERO);
        }
    }

    #[test]
    fn rejects_recovery_rate_of_one() {
        let result = bootstrap_credit_curve(
            &[ParSpread {
                tenor_years: dec!(5),
                spread: dec!(0.01),
            }],
            dec!(1.0),
            &flat_discount_curve(),
            BRENT_TOLERANCE,
            REPRICING_TOLERANCE,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_increasing_tenors() {
        let result = bootstrap_credit_curve(
            &[
                ParSpread {
                    tenor_years: dec!(5),
                    spread: dec!(0.01),
                },
                ParSpread {
                    tenor_years: dec!(5),
                    spread: dec!(0.02),
                },
            ],
            dec!(0.4),
            &flat_discount_curve(),
            BRENT_TOLERANCE,
            REPRICING_TOLERANCE,
        );
        assert!(result.is_err());
    }
}
