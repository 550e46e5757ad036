//! Volatility surfaces (spec §3 "Market structures"): either an ordered
//! sequence of per-expiry SVI slices, or an SSVI parameterization
//! referencing an ATM-variance curve.

use rust_decimal::Decimal;

use crate::error::Error;
use crate::market::numerics::decimal_to_f64;
use crate::market::svi::SviSlice;
use crate::value::canonical::{Canonical, CanonicalWriter};

/// The SSVI (surface SVI) parameterization: a single `(rho, eta, gamma)`
/// triple applied across all expiries via the power-law `phi` function,
/// referencing an ATM total-variance curve `theta(T)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ssvi {
    pub rho: Decimal,
    pub eta: Decimal,
    pub gamma: Decimal,
    /// ATM total variance at each expiry, ordered by increasing expiry.
    pub atm_variance_curve: Vec<(Decimal, Decimal)>,
}

impl Ssvi {
    pub fn new(rho: Decimal, eta: Decimal, gamma: Decimal, atm_variance_curve: Vec<(Decimal, Decimal)>) -> Result<Self, Error> {
        if rho <= Decimal::NEGATIVE_ONE || rho >= Decimal::ONE {
            return Err(Error::single_violation("ssvi.rho", format!("must lie strictly in (-1, 1), got {rho}")));
        }
        if eta <= Decimal::ZERO {
            return Err(Error::single_violation("ssvi.eta", format!("must be strictly positive, got {eta}")));
        }
        if gamma <= Decimal::ZERO || gamma >= Decimal::ONE {
            return Err(Error::single_violation("ssvi.gamma", format!("must lie strictly in (0, 1), got {gamma}")));
        }
        for window in atm_variance_curve.windows(2) {
            if window[1].0 <= window[0].0 {
                return Err(Error::single_violation("ssvi.atm_variance_curve", "expiries must be strictly increasing"));
            }
        }
        for (_, theta) in &atm_variance_curve {
            if *theta <= Decimal::ZERO {
                return Err(Error::single_violation("ssvi.atm_variance_curve", "ATM total variance must be strictly positive"));
            }
        }
        Ok(Self {
            rho,
            eta,
            gamma,
            atm_variance_curve,
        })
    }

    fn phi(&self, theta: f64) -> f64 {
        let eta = decimal_to_f64(self.eta);
        let gamma = decimal_to_f64(self.gamma);
        eta / (theta.powf(gamma) * (1.0 + theta).powf(1.0 - gamma))
    }

    fn theta_at(&self, expiry: Decimal) -> f64 {
        // Piecewise-linear interpolation of ATM total variance; flat
        // extrapolation beyond the curve's ends.
        let expiry_f = decimal_to_f64(expiry);
        let points = &self.atm_variance_curve;
        if points.is_empty() {
            return 0.0;
        }
        if expiry <= points[0].0 {
            return decimal_to_f64(points[0].1);
        }
        if expiry >= points[points.len() - 1].0 {
            return decimal_to_f64(points[points.len() - 1].1);
        }
        for window in points.windows(2) {
            let (t0, v0) = window[0];
            let (t1, v1) = window[1];
            if expiry >= t0 && expiry <= t1 {
                let t0f = decimal_to_f64(t0);
                let t1f = decimal_to_f64(t1);
                let v0f = decimal_to_f64(v0);
                let v1f = decimal_to_f64(v1);
                return v0f + (v1f - v0f) * (expiry_f - t0f) / (t1f - t0f);
            }
        }
        unreachable!("expiry is bracketed by construction")
    }

    /// Total variance at `(log_moneyness, expiry)` under the SSVI
    /// functional form `w(k,T) = theta/2 * (1 + rho*phi(theta)*k + sqrt((phi(theta)*k+rho)^2 + (1-rho^2)))`.
    pub fn total_variance(&self, k: f64, expiry: Decimal) -> f64 {
        let theta = self.theta_at(expiry);
        let rho = decimal_to_f64(self.rho);
        let phi = self.phi(theta);
        theta / 2.0 * (1.0 + rho * phi * k + ((phi * k + rho).powi(2) + (1.0 - rho * rho)).sqrt())
    }
}

/// A volatility surface: a per-expiry SVI term structure, or a single
/// SSVI parameterization spanning all expiries (spec §3 "A volatility
/// surface").
#[derive(Debug, Clone, PartialEq)]
pub enum VolatilitySurface {
    SviSlices(Vec<SviSlice>),
    Ssvi(Ssvi),
}

impl VolatilitySurface {
    /// Construct a per-expiry SVI surface, sorting slices by expiry (spec
    /// §3: "ordered sequence of SVI slices (by expiry)").
    pub fn from_slices(mut slices: Vec<SviSlice>) -> Result<Self, Error> {
        if slices.is_empty() {
            return Err(Error::single_violation("volatility_surface", "requires at least one SVI slice"));
        }
        slices.sort_by(|a, b| a.expiry_years.cmp(&b.expiry_years));
        for window in slices.windows(2) {
            if window[1].expiry_years <= window[0].expiry_years {
                return Err(Error::single_violation("volatility_surface", "duplicate expiry in SVI slice sequence"));
            }
        }
        Ok(VolatilitySurface::SviSlices(slices))
    }

    /// Total variance at `(log_moneyness, expiry)`. For the per-slice
    /// form, `expiry` must match one of the calibrated slices exactly —
    /// the surface does not interpolate across expiries itself (that is
    /// the SSVI form's job).
    pub fn total_variance_at(&self, k: f64, expiry: Decimal) -> Option<f64> {
        match self {
            VolatilitySurface::SviSlices(slices) => slices
                .iter()
                .find(|slice| slice.expiry_years == expiry)
                .map(|slice| slice.total_variance(k)),
            VolatilitySurface::Ssvi(ssvi) => Some(ssvi.total_variance(k, expiry)),
        }
    }

    pub fn expiries(&self) -> Vec<Decimal> {
        match self {
            VolatilitySurface::SviSlices(slices) => slices.iter().map(|s| s.expiry_years).collect(),
            VolatilitySurface::Ssvi(ssvi) => ssvi.atm_variance_curve.iter().map(|(t, _)| *t).collect(),
        }
    }
}

impl Canonical for VolatilitySurface {
    fn to_canonical_bytes(&self) -> Vec<u8> {
        match self {
            VolatilitySurface::SviSlices(slices) => {
                let slice_bytes: Vec<Vec<u8>> = slices.iter().map(|s| s.to_canonical_bytes()).collect();
                CanonicalWriter::new()
                    .tag("svi_slices")
                    .sequence(slice_bytes.iter().map(|v| v.as_slice()))
                    .finish()
            }
            VolatilitySurface::Ssvi(ssvi) => {
                let curve_bytes: Vec<Vec<u8>> = ssvi
                    .atm_variance_curve
                    .iter()
                    .map(|(t, v)| CanonicalWriter::new().decimal(*t).decimal(*v).finish())
                    .collect();
                CanonicalWriter::new()
                    .tag("ssvi")
                    .decimal(ssvi.rho)
                    .decimal(ssvi.eta)
                    .decimal(ssvi.gamma)
                    .sequence(curve_bytes.iter().map(|v| v.as_slice()))
                    .finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn slice(expiry: Decimal) -> SviSlice {
        SviSlice::new(expiry, dec!(0.04), dec!(0.2), dec!(-0.3), dec!(0.0), dec!(0.15)).unwrap()
    }

    #[test]
    fn from_slices_sorts_by_expiry() {
        let surface = VolatilitySurface::from_slices(vec![slice(dec!(1.0)), slice(dec!(0.25))]).unwrap();
        assert_eq!(surface.expiries(), vec![dec!(0.25), dec!(1.0)]);
    }

    #[test]
    fn from_slices_rejects_duplicate_expiry() {
        let result = VolatilitySurface::from_slices(vec![slice(dec!(0.5)), slice(dec!(0.5))]);
        assert!(result.is_err());
    }

    #[test]
    fn ssvi_rejects_rho_out_of_range() {
        assert!(Ssvi::new(dec!(1.0), dec!(1.0), dec!(0.5), vec![(dec!(0.5), dec!(0.04))]).is_err());
    }
}
