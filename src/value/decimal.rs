//! Fixed-precision decimal arithmetic: precision 28, banker's rounding
//! (half-to-even), trapping on invalid operation / division-by-zero /
//! overflow. Binary floating point never appears on a domain path; it is
//! reserved for non-financial telemetry (see `spec.md` §3).
//!
//! `rust_decimal::Decimal` already stores values as a 96-bit mantissa with
//! scale <= 28, so precision-28 is its native ceiling. "Trapping" is
//! realized as `Result::Err` returned from checked operations rather than a
//! hardware/FPU signal — the idiomatic Rust equivalent of the source's
//! global arithmetic context (see `DESIGN.md`, Open Question 2).

use std::sync::OnceLock;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::Error;

/// Maximum significant-digit precision enforced by the domain context.
pub const PRECISION: u32 = 28;

static CONTEXT: OnceLock<DecimalContext> = OnceLock::new();

/// Process-wide arithmetic context (spec §6 "Process-wide state"). Stamped
/// once at process startup; every domain arithmetic helper consults it
/// rather than a freshly constructed default, so the rounding/precision
/// policy cannot silently drift between call sites.
#[derive(Debug, Clone, Copy)]
pub struct DecimalContext {
    pub precision: u32,
    pub rounding: RoundingStrategy,
}

impl Default for DecimalContext {
    fn default() -> Self {
        Self {
            precision: PRECISION,
            rounding: RoundingStrategy::MidpointNearestEven,
        }
    }
}

impl DecimalContext {
    /// Install this context as the process-wide context. Idempotent: a
    /// second call is a no-op and returns `false` so callers can detect a
    /// double-initialization attempt without panicking.
    pub fn install(self) -> bool {
        CONTEXT.set(self).is_ok()
    }

    /// The currently-installed context, or the spec default (precision 28,
    /// half-to-even) if none has been installed yet.
    pub fn current() -> DecimalContext {
        *CONTEXT.get_or_init(DecimalContext::default)
    }

    /// Round `value` to this context's precision using its rounding
    /// strategy. Banker's rounding means `2.5 -> 2`, `3.5 -> 4`.
    pub fn round(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.precision, self.rounding)
    }

    pub fn checked_add(&self, a: Decimal, b: Decimal) -> Result<Decimal, Error> {
        a.checked_add(b)
            .map(|v| self.round(v))
            .ok_or_else(|| overflow_error("add"))
    }

    pub fn checked_sub(&self, a: Decimal, b: Decimal) -> Result<Decimal, Error> {
        a.checked_sub(b)
            .map(|v| self.round(v))
            .ok_or_else(|| overflow_error("sub"))
    }

    pub fn checked_mul(&self, a: Decimal, b: Decimal) -> Result<Decimal, Error> {
        a.checked_mul(b)
            .map(|v| self.round(v))
            .ok_or_else(|| overflow_error("mul"))
    }

    pub fn checked_div(&self, a: Decimal, b: Decimal) -> Result<Decimal, Error> {
        if b.is_zero() {
            return Err(Error::single_violation("decimal", "division by zero"));
        }
        a.checked_div(b)
            .map(|v| self.round(v))
            .ok_or_else(|| overflow_error("div"))
    }
}

fn overflow_error(op: &str) -> Error {
    Error::single_violation("decimal", format!("overflow in {op}"))
}

/// A decimal strictly greater than zero, finite by construction
/// (`rust_decimal::Decimal` has no NaN/Inf representation so "finite" is
/// automatic once a value parses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PositiveDecimal(Decimal);

impl PositiveDecimal {
    pub fn new(value: Decimal) -> Result<Self, Error> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(Error::single_violation(
                "value",
                format!("expected a strictly positive decimal, got {value}"),
            ))
        }
    }

    pub fn get(&self) -> Decimal {
        self.0
    }
}

/// A decimal greater than or equal to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NonNegativeDecimal(Decimal);

impl NonNegativeDecimal {
    pub fn new(value: Decimal) -> Result<Self, Error> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(Error::single_violation(
                "value",
                format!("expected a non-negative decimal, got {value}"),
            ))
        }
    }

    pub fn get(&self) -> Decimal {
        self.0
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }
}

impl From<PositiveDecimal> for NonNegativeDecimal {
    fn from(value: PositiveDecimal) -> Self {
        NonNegativeDecimal(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn positive_decimal_rejects_zero_and_negative() {
        assert!(PositiveDecimal::new(Decimal::ZERO).is_err());
        assert!(PositiveDecimal::new(dec!(-1)).is_err());
        assert!(PositiveDecimal::new(dec!(0.01)).is_ok());
    }

    #[test]
    fn non_negative_decimal_accepts_zero_rejects_negative() {
        assert!(NonNegativeDecimal::new(Decimal::ZERO).is_ok());
        assert!(NonNegativeDecimal::new(dec!(-0.01)).is_err());
    }

    #[test]
    fn division_by_zero_traps_as_error() {
        let ctx = DecimalContext::default();
        let err = ctx.checked_div(dec!(1), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn half_to_even_rounding() {
        let ctx = DecimalContext {
            precision: 0,
            rounding: RoundingStrategy::MidpointNearestEven,
        };
        assert_eq!(ctx.round(dec!(2.5)), dec!(2));
        assert_eq!(ctx.round(dec!(3.5)), dec!(4));
    }
}
