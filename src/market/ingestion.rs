//! Raw observation ingestion (spec §4.4.1): the two paths — exchange
//! fills and two-sided quotes — that yield `Firm` and `Quoted`
//! attestations respectively. Grounded on the approval prototype's
//! `Witness`/`WitnessType::Submit` shape (source, actor, timestamp,
//! payload hash), applied here to market data instead of trade state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::attestation::{Attestation, Confidence, QuoteCondition};
use crate::error::Error;
use crate::value::canonical::{Canonical, CanonicalWriter};
use crate::value::NonEmptyString;

/// The payload every ingested observable carries downstream: an
/// instrument, a single representative value, and its currency. Fills
/// carry their trade price as `value`; quotes carry the mid.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataPoint {
    pub instrument: String,
    pub value: Decimal,
    pub currency: String,
}

impl Canonical for MarketDataPoint {
    fn to_canonical_bytes(&self) -> Vec<u8> {
        CanonicalWriter::new()
            .str(&self.instrument)
            .decimal(self.value)
            .str(&self.currency)
            .finish()
    }
}

/// Ingest an exchange fill as a `Firm` attestation (spec §4.4.1).
#[allow(clippy::too_many_arguments)]
pub fn ingest_fill(
    instrument: impl Into<String>,
    price: Decimal,
    currency: impl Into<String>,
    venue: impl Into<String>,
    exchange_reference: impl Into<String>,
    timestamp: DateTime<Utc>,
) -> Result<Attestation<MarketDataPoint>, Error> {
    if price <= Decimal::ZERO {
        return Err(Error::single_violation(
            "fill.price",
            format!("must be strictly positive, got {price}"),
        ));
    }
    let venue = venue.into();
    let payload = MarketDataPoint {
        instrument: instrument.into(),
        value: price,
        currency: currency.into(),
    };
    let source = NonEmptyString::new(venue)?;
    Ok(Attestation::new(
        payload,
        source,
        timestamp,
        Confidence::Firm {
            exchange_reference: exchange_reference.into(),
        },
        vec![],
    ))
}

/// Ingest a two-sided quote as a `Quoted` attestation (spec §4.4.1). The
/// payload value is the mid price; `bid <= ask` is enforced by
/// [`Confidence::quoted`].
#[allow(clippy::too_many_arguments)]
pub fn ingest_quote(
    instrument: impl Into<String>,
    bid: Decimal,
    ask: Decimal,
    currency: impl Into<String>,
    venue: impl Into<String>,
    condition: QuoteCondition,
    timestamp: DateTime<Utc>,
) -> Result<Attestation<MarketDataPoint>, Error> {
    let venue = venue.into();
    let confidence = Confidence::quoted(bid, ask, venue.clone(), condition)?;
    let mid = (bid + ask) / Decimal::TWO;
    let payload = MarketDataPoint {
        instrument: instrument.into(),
        value: mid,
        currency: currency.into(),
    };
    let source = NonEmptyString::new(venue)?;
    Ok(Attestation::new(payload, source, timestamp, confidence, vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fill_rejects_non_positive_price() {
        assert!(ingest_fill("AAPL", Decimal::ZERO, "USD", "XNYS", "FILL-1", Utc::now()).is_err());
    }

    #[test]
    fn quote_mid_is_average_of_bid_ask() {
        let attestation = ingest_quote(
            "AAPL",
            dec!(174.0),
            dec!(176.0),
            "USD",
            "XNYS",
            QuoteCondition::Normal,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(attestation.payload().value, dec!(175.0));
    }

    #[test]
    fn quote_rejects_crossed_market() {
        assert!(ingest_quote(
            "AAPL",
            dec!(176.0),
            dec!(174.0),
            "USD",
            "XNYS",
            QuoteCondition::Normal,
            Utc::now()
        )
        .is_err());
    }
}
