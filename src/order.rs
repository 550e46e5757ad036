//! The canonical order (spec §3 "Canonical order"): the normalized
//! representation of a trade that everything downstream — booking,
//! projection — is built from. Construction collects *all* field
//! violations before failing (spec §3), following the approval
//! prototype's pattern of checking every required field in
//! `TradeDetails::validate_and_finalise` before returning, generalized
//! from "return the first error" to "return every error".

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{Error, FieldViolation};
use crate::value::canonical::{Canonical, CanonicalWriter};
use crate::value::{Isin, Lei, NonEmptyString};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    fn tag(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    fn tag(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

/// The instrument family an order belongs to. Only equities carry the
/// stricter "price must be positive" invariant (see DESIGN.md Open
/// Question 1) — FX forwards/NDFs, swaps, and CDS par spreads can
/// legitimately be negative or carry signed economics, so the positivity
/// invariant is scoped to the family that actually needs it rather than
/// applied blanket-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentFamily {
    Equity,
    ListedOption,
    ListedFuture,
    FxSpot,
    FxForward,
    FxNdf,
    InterestRateSwap,
    CreditDefaultSwap,
    Swaption,
    Collateral,
}

impl InstrumentFamily {
    fn tag(&self) -> &'static str {
        match self {
            InstrumentFamily::Equity => "equity",
            InstrumentFamily::ListedOption => "listed_option",
            InstrumentFamily::ListedFuture => "listed_future",
            InstrumentFamily::FxSpot => "fx_spot",
            InstrumentFamily::FxForward => "fx_forward",
            InstrumentFamily::FxNdf => "fx_ndf",
            InstrumentFamily::InterestRateSwap => "interest_rate_swap",
            InstrumentFamily::CreditDefaultSwap => "credit_default_swap",
            InstrumentFamily::Swaption => "swaption",
            InstrumentFamily::Collateral => "collateral",
        }
    }

    /// Equity price must be strictly positive at construction (DESIGN.md
    /// Open Question 1); every other family only requires a finite price,
    /// which `rust_decimal::Decimal` guarantees by having no NaN/Inf.
    pub fn requires_positive_price(&self) -> bool {
        matches!(self, InstrumentFamily::Equity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalOrder {
    pub order_id: NonEmptyString,
    pub instrument_id: NonEmptyString,
    pub instrument_family: InstrumentFamily,
    pub isin: Option<Isin>,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub currency: NonEmptyString,
    pub order_type: OrderType,
    pub counterparty_lei: Lei,
    pub executing_party_lei: Lei,
    pub trade_date: DateTime<Utc>,
    pub settlement_date: DateTime<Utc>,
    pub venue: NonEmptyString,
    pub timestamp: DateTime<Utc>,
}

/// Raw, unvalidated fields for building a [`CanonicalOrder`]. Every field
/// is a plain primitive; [`CanonicalOrderBuilder::build`] is the only way
/// to obtain a validated order.
#[derive(Debug, Clone, Default)]
pub struct CanonicalOrderBuilder {
    pub order_id: Option<String>,
    pub instrument_id: Option<String>,
    pub instrument_family: Option<InstrumentFamily>,
    pub isin: Option<String>,
    pub side: Option<Side>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub order_type: Option<OrderType>,
    pub counterparty_lei: Option<String>,
    pub executing_party_lei: Option<String>,
    pub trade_date: Option<DateTime<Utc>>,
    pub settlement_date: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl CanonicalOrderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate every field, collecting *all* violations, then construct
    /// the order. Mirrors `TradeDetails::validate_and_finalise`'s
    /// check-everything style but never short-circuits on the first
    /// failure.
    pub fn build(self) -> Result<CanonicalOrder, Error> {
        let mut violations = Vec::new();

        let order_id = required_string(&self.order_id, "order_id", &mut violations);
        let instrument_id = required_string(&self.instrument_id, "instrument_id", &mut violations);
        let currency = required_string(&self.currency, "currency", &mut violations);
        let venue = required_string(&self.venue, "venue", &mut violations);

        let instrument_family = self.instrument_family.or_else(|| {
            violations.push(FieldViolation::new("instrument_family", "is required"));
            None
        });

        let isin = match &self.isin {
            Some(raw) => match Isin::new(raw.clone()) {
                Ok(isin) => Some(isin),
                Err(Error::Validation(mut v)) => {
                    violations.append(&mut v);
                    None
                }
                Err(_) => None,
            },
            None => None,
        };

        let side = self.side.or_else(|| {
            violations.push(FieldViolation::new("side", "is required"));
            None
        });

        let quantity = match self.quantity {
            Some(q) if q > Decimal::ZERO => Some(q),
            Some(q) => {
                violations.push(FieldViolation::new(
                    "quantity",
                    format!("must be strictly positive, got {q}"),
                ));
                None
            }
            None => {
                violations.push(FieldViolation::new("quantity", "is required"));
                None
            }
        };

        let price = match (self.price, instrument_family) {
            (Some(p), Some(family)) if family.requires_positive_price() && p <= Decimal::ZERO => {
                violations.push(FieldViolation::new(
                    "price",
                    format!("equity price must be strictly positive, got {p}"),
                ));
                None
            }
            (Some(p), _) => Some(p),
            (None, _) => {
                violations.push(FieldViolation::new("price", "is required"));
                None
            }
        };

        let order_type = self.order_type.or_else(|| {
            violations.push(FieldViolation::new("order_type", "is required"));
            None
        });

        let counterparty_lei = required_lei(&self.counterparty_lei, "counterparty_lei", &mut violations);
        let executing_party_lei =
            required_lei(&self.executing_party_lei, "executing_party_lei", &mut violations);

        let trade_date = self.trade_date.or_else(|| {
            violations.push(FieldViolation::new("trade_date", "is required"));
            None
        });

        let settlement_date = match (self.settlement_date, trade_date) {
            (Some(s), Some(t)) if s < t => {
                violations.push(FieldViolation::new(
                    "settlement_date",
                    "must be on or after trade_date",
                ));
                None
            }
            (Some(s), _) => Some(s),
            (None, _) => {
                violations.push(FieldViolation::new("settlement_date", "is required"));
                None
            }
        };

        let timestamp = self.timestamp.or_else(|| {
            violations.push(FieldViolation::new("timestamp", "is required"));
            None
        });

        if !violations.is_empty() {
            return Err(Error::validation(violations));
        }

        Ok(CanonicalOrder {
            order_id: order_id.unwrap(),
            instrument_id: instrument_id.unwrap(),
            instrument_family: instrument_family.unwrap(),
            isin,
            side: side.unwrap(),
            quantity: quantity.unwrap(),
            price: price.unwrap(),
            currency: currency.unwrap(),
            order_type: order_type.unwrap(),
            counterparty_lei: counterparty_lei.unwrap(),
            executing_party_lei: executing_party_lei.unwrap(),
            trade_date: trade_date.unwrap(),
            settlement_date: settlement_date.unwrap(),
            venue: venue.unwrap(),
            timestamp: timestamp.unwrap(),
        })
    }
}

fn required_string(
    value: &Option<String>,
    field: &'static str,
    violations: &mut Vec<FieldViolation>,
) -> Option<NonEmptyString> {
    match value {
        Some(v) => match NonEmptyString::new(v.clone()) {
            Ok(v) => Some(v),
            Err(_) => {
                violations.push(FieldViolation::new(field, "must not be empty"));
                None
            }
        },
        None => {
            violations.push(FieldViolation::new(field, "is required"));
            None
        }
    }
}

fn required_lei(
    value: &Option<String>,
    field: &'static str,
    violations: &mut Vec<FieldViolation>,
) -> Option<Lei> {
    match value {
        Some(v) => match Lei::new(v.clone()) {
            Ok(lei) => Some(lei),
            Err(Error::Validation(mut v)) => {
                violations.append(&mut v);
                None
            }
            Err(_) => None,
        },
        None => {
            violations.push(FieldViolation::new(field, "is required"));
            None
        }
    }
}

impl Canonical for CanonicalOrder {
    fn to_canonical_bytes(&self) -> Vec<u8> {
        CanonicalWriter::new()
            .str(self.order_id.as_str())
            .str(self.instrument_id.as_str())
            .tag(self.instrument_family.tag())
            .str(self.isin.as_ref().map(Isin::as_str).unwrap_or(""))
            .tag(self.side.tag())
            .decimal(self.quantity)
            .decimal(self.price)
            .str(self.currency.as_str())
            .tag(self.order_type.tag())
            .str(self.counterparty_lei.as_str())
            .str(self.executing_party_lei.as_str())
            .str(&self.trade_date.to_rfc3339())
            .str(&self.settlement_date.to_rfc3339())
            .str(self.venue.as_str())
            .str(&self.timestamp.to_rfc3339())
            .finish()
    }
}

/// The T+2 settlement convention used by the equity settlement scenario
/// (spec §8, scenario 1): add business days, skipping Saturday/Sunday.
pub fn add_business_days(start: DateTime<Utc>, business_days: u32) -> DateTime<Utc> {
    use chrono::Datelike;
    let mut date = start;
    let mut remaining = business_days;
    while remaining > 0 {
        date += chrono::Duration::days(1);
        let is_weekend = matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun);
        if !is_weekend {
            remaining -= 1;
        }
    }
    date
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn valid_builder() -> CanonicalOrderBuilder {
        let ts = Utc.with_ymd_and_hms(2025, 6, 19, 9, 30, 0).unwrap();
        CanonicalOrderBuilder {
            order_id: Some("ORD-001".into()),
            instrument_id: Some("AAPL".into()),
            instrument_family: Some(InstrumentFamily::Equity),
            isin: None,
            side: Some(Side::Buy),
            quantity: Some(dec!(100)),
            price: Some(dec!(175.50)),
            currency: Some("USD".into()),
            order_type: Some(OrderType::Market),
            counterparty_lei: Some("5299001234567890ABCD".into()),
            executing_party_lei: Some("5299001234567890ABCD".into()),
            trade_date: Some(ts),
            settlement_date: Some(add_business_days(ts, 2)),
            venue: Some("XNYS".into()),
            timestamp: Some(ts),
        }
    }

    #[test]
    fn equity_settlement_scenario_dates() {
        // Thursday 2025-06-19 + T+2 business days -> Monday 2025-06-23.
        let trade_date = Utc.with_ymd_and_hms(2025, 6, 19, 0, 0, 0).unwrap();
        let settlement = add_business_days(trade_date, 2);
        assert_eq!(settlement.date_naive(), Utc.with_ymd_and_hms(2025, 6, 23, 0, 0, 0).unwrap().date_naive());
    }

    #[test]
    fn equity_zero_price_is_rejected() {
        let mut builder = valid_builder();
        builder.price = Some(Decimal::ZERO);
        let err = builder.build().unwrap_err();
        match err {
            Error::Validation(v) => assert!(v.iter().any(|f| f.field == "price")),
            _ => panic!("expected validation error"),
        }
    }

    #[test]
    fn negative_price_allowed_for_fx_forward() {
        let mut builder = valid_builder();
        builder.instrument_family = Some(InstrumentFamily::FxForward);
        builder.price = Some(dec!(-0.0012));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn settlement_before_trade_date_is_rejected() {
        let mut builder = valid_builder();
        builder.settlement_date = Some(builder.trade_date.unwrap() - chrono::Duration::days(1));
        assert!(builder.build().is_err());
    }

    #[test]
    fn missing_fields_collect_every_violation() {
        let builder = CanonicalOrderBuilder::new();
        let err = builder.build().unwrap_err();
        match err {
            Error::Validation(v) => assert!(v.len() > 5, "expected many violations, got {v:?}"),
            _ => panic!("expected validation error"),
        }
    }
}
