//! Collateral/margin call sizing (spec §8 "Testable Properties"): a
//! single total function over non-negative finite decimals, kept apart
//! from [`crate::account::AccountType::Margin`]/`Collateral`'s bookkeeping
//! role since it computes a number, not a balance.

use rust_decimal::Decimal;

/// The collateral call amount owed against `exposure`, given a bilateral
/// `threshold` (the exposure level below which no collateral is posted)
/// and a minimum transfer amount `mta` (a call smaller than `mta` is not
/// worth transferring). Total on its domain: always returns a value,
/// never an error.
///
/// `max(0, exposure - threshold)` if that amount is at or above `mta`,
/// else zero.
pub fn compute_margin_call(exposure: Decimal, threshold: Decimal, mta: Decimal) -> Decimal {
    let uncollateralized = (exposure - threshold).max(Decimal::ZERO);
    if uncollateralized >= mta {
        uncollateralized
    } else {
        Decimal::ZERO
    }
}
