//! Shared machine-float numerics for calibration (spec §4.4.3, §4.4.4
//! permit binary floating point at this stage; only the final feasibility
//! checks move back into the decimal path). Brent's method here backs the
//! credit curve hazard-rate bootstrap; grid search backs SVI calibration.

use rust_decimal::Decimal;

use crate::error::Error;

/// Convert a domain decimal to a machine float for the numerics stages
/// spec.md explicitly permits floats in (grid search, Brent, L-BFGS-B).
pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_string().parse().unwrap_or(0.0)
}

/// Convert a machine float back to a domain decimal, e.g. to publish a
/// calibrated result through the decimal-precision feasibility check.
pub fn f64_to_decimal(value: f64) -> Decimal {
    Decimal::from_str_exact(&format!("{value:.15}")).unwrap_or(Decimal::ZERO)
}

/// Brent's root-finding method on `[lo, hi]`, assuming `f(lo)` and `f(hi)`
/// bracket a root (opposite signs). Used by the credit curve bootstrap to
/// solve for each tenor's hazard rate against the par-spread condition
/// (spec §4.4.3).
pub fn brent<F: Fn(f64) -> f64>(f: F, lo: f64, hi: f64, tolerance: f64, max_iterations: u32) -> Result<f64, Error> {
    let mut a = lo;
    let mut b = hi;
    let mut fa = f(a);
    let mut fb = f(b);

    if fa.signum() == fb.signum() {
        return Err(Error::Calibration {
            model: "brent".to_string(),
            cause: format!("root is not bracketed on [{lo}, {hi}]: f(lo)={fa}, f(hi)={fb}"),
            fit_quality: vec![],
        });
    }

    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = a;
    let mut fc = fa;
    let mut mflag = true;
    let mut d = a;

    for _ in 0..max_iterations {
        if fb.abs() < tolerance || (b - a).abs() < tolerance {
            return Ok(b);
        }

        let mut s = if fa != fc && fb != fc {
            // Inverse quadratic interpolation.
            a * fb * fc / ((fa - fb) * (fa - fc))
                + b * fa * fc / ((fb - fa) * (fb - fc))
                + c * fa * fb / ((fc - fa) * (fc - fb))
        } else {
            // Secant method.
            b - fb * (b - a) / (fb - fa)
        };

        let bounds_ok = s > (3.0 * a + b) / 4.0 && s < b || s < (3.0 * a + b) / 4.0 && s > b;
        let cond = !bounds_ok
            || (mflag && (s - b).abs() >= (b - c).abs() / 2.0)
            || (!mflag && (s - b).abs() >= (c - d).abs() / 2.0)
            || (mflag && (b - c).abs() < tolerance)
            || (!mflag && (c - d).abs() < tolerance);

        if cond {
            s = (a + b) / 2.0; // bisection fallback
            mflag = true;
        } else {
            mflag = false;
        }

        let fs = f(s);
        d = c;
        c = b;
        fc = fb;

        if fa.signum() != fs.signum() {
            b = s;
            fb = fs;
        } else {
            a = s;
            fa = fs;
        }

        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }
    }

    let _ = d;
    Err(Error::Calibration {
        model: "brent".to_string(),
        cause: format!("did not converge within {max_iterations} iterations"),
        fit_quality: vec![],
    })
}
