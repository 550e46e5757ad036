//! Yield curve bootstrap (spec §4.4.2): a set of attested rate
//! instruments at increasing tenors becomes a sequence of discount
//! factors, interpolated log-linearly between tenors and extrapolated
//! flat-forward beyond the last. Bootstrap is deterministic: a pure
//! function of the inputs' canonical bytes.

use rust_decimal::Decimal;

use crate::error::Error;
use crate::market::numerics::{decimal_to_f64, f64_to_decimal};
use crate::value::canonical::{Canonical, CanonicalWriter};
use crate::value::decimal::DecimalContext;

/// A single zero-rate observation: a tenor in years and its continuously
/// compounded rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateInstrument {
    pub tenor_years: Decimal,
    pub rate: Decimal,
}

impl Canonical for RateInstrument {
    fn to_canonical_bytes(&self) -> Vec<u8> {
        CanonicalWriter::new().decimal(self.tenor_years).decimal(self.rate).finish()
    }
}

/// Discount factors at a strictly increasing sequence of tenors, plus the
/// interpolation convention used between and beyond them (spec §3
/// "Market structures").
#[derive(Debug, Clone, PartialEq)]
pub struct YieldCurve {
    tenors: Vec<Decimal>,
    discount_factors: Vec<Decimal>,
}

impl YieldCurve {
    /// Construct a yield curve, validating strictly increasing tenors and
    /// strictly positive discount factors (spec §4.4.2 contract).
    pub fn new(tenors: Vec<Decimal>, discount_factors: Vec<Decimal>) -> Result<Self, Error> {
        if tenors.len() != discount_factors.len() || tenors.is_empty() {
            return Err(Error::single_violation(
                "yield_curve",
                "tenors and discount_factors must be non-empty and equal length",
            ));
        }
        for window in tenors.windows(2) {
            if window[1] <= window[0] {
                return Err(Error::single_violation(
                    "yield_curve.tenors",
                    "must be strictly increasing",
                ));
            }
        }
        for df in &discount_factors {
            if *df <= Decimal::ZERO {
                return Err(Error::single_violation(
                    "yield_curve.discount_factors",
                    format!("must be strictly positive, got {df}"),
                ));
            }
        }
        Ok(Self {
            tenors,
            discount_factors,
        })
    }

    pub fn tenors(&self) -> &[Decimal] {
        &self.tenors
    }

    pub fn discount_factors(&self) -> &[Decimal] {
        &self.discount_factors
    }

    /// Discount factor at an arbitrary tenor `t >= 0`: log-linear
    /// interpolation between bracketing input tenors (anchored at
    /// `(0, 1)`), flat-forward extrapolation beyond the last tenor (spec
    /// §4.4.2 contract, §3 "yield curve").
    pub fn discount_factor(&self, t: Decimal) -> Decimal {
        let ctx = DecimalContext::current();
        if t <= Decimal::ZERO {
            return Decimal::ONE;
        }

        let t_f = decimal_to_f64(t);
        let last_idx = self.tenors.len() - 1;

        if t <= self.tenors[0] {
            let df = log_linear(0.0, 1.0, decimal_to_f64(self.tenors[0]), decimal_to_f64(self.discount_factors[0]), t_f);
            return ctx.round(f64_to_decimal(df));
        }

        if t > self.tenors[last_idx] {
            let t0 = decimal_to_f64(self.tenors[last_idx - 1]);
            let t1 = decimal_to_f64(self.tenors[last_idx]);
            let df0 = decimal_to_f64(self.discount_factors[last_idx - 1]);
            let df1 = decimal_to_f64(self.discount_factors[last_idx]);
            let forward = -(df1.ln() - df0.ln()) / (t1 - t0);
            let df = df1 * (-forward * (t_f - t1)).exp();
            return ctx.round(f64_to_decimal(df));
        }

        for window in 0..last_idx {
            let t0 = self.tenors[window];
            let t1 = self.tenors[window + 1];
            if t >= t0 && t <= t1 {
                let df = log_linear(
                    decimal_to_f64(t0),
                    decimal_to_f64(self.discount_factors[window]),
                    decimal_to_f64(t1),
                    decimal_to_f64(self.discount_factors[window + 1]),
                    t_f,
                );
                return ctx.round(f64_to_decimal(df));
            }
        }
        unreachable!("t is bracketed by construction")
    }
}

fn log_linear(t0: f64, df0: f64, t1: f64, df1: f64, t: f64) -> f64 {
    let ln0 = df0.ln();
    let ln1 = df1.ln();
    let interpolated = ln0 + (ln1 - ln0) * (t - t0) / (t1 - t0);
    interpolated.exp()
}

/// Bootstrap a yield curve from a set of attested rate instruments (spec
/// §4.4.2). The inputs are sorted by tenor before discount factors are
/// derived, so the result is a pure function of the input *set*, not its
/// submission order (spec §4.4.6 Noether).
pub fn bootstrap_yield_curve(instruments: &[RateInstrument]) -> Result<YieldCurve, Error> {
    if instruments.is_empty() {
        return Err(Error::single_violation("yield_curve", "requires at least one rate instrument"));
    }
    let mut sorted = instruments.to_vec();
    sorted.sort_by(|a, b| a.tenor_years.cmp(&b.tenor_years));

    let ctx = DecimalContext::current();
    let mut tenors = Vec::with_capacity(sorted.len());
    let mut discount_factors = Vec::with_capacity(sorted.len());
    for instrument in &sorted {
        let t = decimal_to_f64(instrument.tenor_years);
        let r = decimal_to_f64(instrument.rate);
        let df = (-r * t).exp();
        tenors.push(instrument.tenor_years);
        discount_factors.push(ctx.round(f64_to_decimal(df)));
    }
    YieldCurve::new(tenors, discount_factors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn instrument(tenor: Decimal, rate: Decimal) -> RateInstrument {
        RateInstrument {
            tenor_years: tenor,
            rate,
        }
    }

    #[test]
    fn discount_factor_at_zero_is_one() {
        let curve = bootstrap_yield_curve(&[instrument(dec!(1), dec!(0.02)), instrument(dec!(2), dec!(0.025))]).unwrap();
        assert_eq!(curve.discount_factor(Decimal::ZERO), Decimal::ONE);
    }

    #[test]
    fn non_negative_rates_give_non_increasing_discount_factors() {
        let curve = bootstrap_yield_curve(&[
            instrument(dec!(1), dec!(0.01)),
            instrument(dec!(2), dec!(0.015)),
            instrument(dec!(5), dec!(0.02)),
        ])
        .unwrap();
        let dfs = curve.discount_factors();
        for window in dfs.windows(2) {
            assert!(window[1] <= window[0]);
        }
    }

    #[test]
    fn bootstrap_is_order_independent() {
        let forward = bootstrap_yield_curve(&[instrument(dec!(1), dec!(0.02)), instrument(dec!(2), dec!(0.03))]).unwrap();
        let reversed = bootstrap_yield_curve(&[instrument(dec!(2), dec!(0.03)), instrument(dec!(1), dec!(0.02))]).unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn rejects_duplicate_tenors() {
        let err = bootstrap_yield_curve(&[instrument(dec!(1), dec!(0.02)), instrument(dec!(1), dec!(0.03))]);
        assert!(err.is_err());
    }
}
