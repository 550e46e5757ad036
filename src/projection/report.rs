//! Regulatory report projection (spec §4.5): `project(order)` is a pure
//! reformatting of order fields into a target regime's schema, wrapped as
//! a Derived attestation. Nothing is computed that was not already
//! present in the order (or an attached attestation reference).

use chrono::{DateTime, Utc};

use crate::attestation::{Attestation, Confidence};
use crate::error::Error;
use crate::order::{CanonicalOrder, Side};
use crate::projection::uti::derive_uti;
use crate::value::canonical::Canonical;
use crate::value::{NonEmptyString, Uti};

/// The regulatory regime a report is projected for (spec §1 "EMIR /
/// MiFID II / Dodd-Frank").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Emir,
    MiFidII,
    DoddFrank,
}

impl Regime {
    fn tag(&self) -> &'static str {
        match self {
            Regime::Emir => "emir",
            Regime::MiFidII => "mifid_ii",
            Regime::DoddFrank => "dodd_frank",
        }
    }
}

/// A projected regulatory report: every field is copied verbatim from the
/// order it projects (or derived deterministically, as with `uti`) — the
/// projection layer computes nothing that was not already attested.
#[derive(Debug, Clone, PartialEq)]
pub struct RegulatoryReport {
    pub regime: Regime,
    pub uti: Uti,
    pub order_id: String,
    pub instrument_id: String,
    pub side: Side,
    pub quantity: rust_decimal::Decimal,
    pub price: rust_decimal::Decimal,
    pub currency: String,
    pub counterparty_lei: String,
    pub executing_party_lei: String,
    pub trade_date: DateTime<Utc>,
    pub venue: String,
}

impl crate::value::canonical::Canonical for RegulatoryReport {
    fn to_canonical_bytes(&self) -> Vec<u8> {
        crate::value::canonical::CanonicalWriter::new()
            .tag(self.regime.tag())
            .str(self.uti.as_str())
            .str(&self.order_id)
            .str(&self.instrument_id)
            .tag(match self.side {
                Side::Buy => "buy",
                Side::Sell => "sell",
            })
            .decimal(self.quantity)
            .decimal(self.price)
            .str(&self.currency)
            .str(&self.counterparty_lei)
            .str(&self.executing_party_lei)
            .str(&self.trade_date.to_rfc3339())
            .str(&self.venue)
            .finish()
    }
}

/// Project `order` into a [`RegulatoryReport`] for `regime`, wrapped as a
/// Derived attestation (spec §4.5 "Contract"). Fails only on structural
/// input errors that should have been caught at ingestion (here: LEI
/// derivation failure); never re-validates business rules already
/// enforced by [`CanonicalOrder`]'s constructor.
pub fn project(order: &CanonicalOrder, regime: Regime, timestamp: DateTime<Utc>) -> Result<Attestation<RegulatoryReport>, Error> {
    let order_hash = order.content_hash();
    let uti = derive_uti(&order.executing_party_lei, &order_hash)?;

    let report = RegulatoryReport {
        regime,
        uti,
        order_id: order.order_id.as_str().to_string(),
        instrument_id: order.instrument_id.as_str().to_string(),
        side: order.side,
        quantity: order.quantity,
        price: order.price,
        currency: order.currency.as_str().to_string(),
        counterparty_lei: order.counterparty_lei.as_str().to_string(),
        executing_party_lei: order.executing_party_lei.as_str().to_string(),
        trade_date: order.trade_date,
        venue: order.venue.as_str().to_string(),
    };

    let source = NonEmptyString::new(format!("projection::{}", regime.tag()))?;
    Ok(Attestation::new(
        report,
        source,
        timestamp,
        Confidence::Derived {
            model: format!("project_{}", regime.tag()),
            inputs: vec![order_hash.as_hex().to_string()],
            fit_quality: vec![],
        },
        vec![order_hash],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{CanonicalOrderBuilder, InstrumentFamily, OrderType};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn emir_order() -> CanonicalOrder {
        let ts = Utc.with_ymd_and_hms(2025, 6, 19, 9, 30, 0).unwrap();
        CanonicalOrderBuilder {
            order_id: Some("ORD-EMIR-1".into()),
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
            settlement_date: Some(crate::order::add_business_days(ts, 2)),
            venue: Some("XNYS".into()),
            timestamp: Some(ts),
        }
        .build()
        .unwrap()
    }

    #[test]
    fn project_is_deterministic() {
        let order = emir_order();
        let ts = Utc::now();
        let a = project(&order, Regime::Emir, ts).unwrap();
        let b = project(&order, Regime::Emir, ts).unwrap();
        assert_eq!(a.payload(), b.payload());
        assert_eq!(a.attestation_id(), b.attestation_id());
    }

    #[test]
    fn projected_uti_is_52_characters_and_lei_prefixed() {
        let order = emir_order();
        let report = project(&order, Regime::Emir, Utc::now()).unwrap();
        assert_eq!(report.payload().uti.as_str().len(), 52);
        assert!(report.payload().uti.as_str().starts_with("5299001234567890ABCD"));
    }

    #[test]
    fn projection_never_alters_order_fields() {
        let order = emir_order();
        let report = project(&order, Regime::Emir, Utc::now()).unwrap();
        assert_eq!(report.payload().quantity, order.quantity);
        assert_eq!(report.payload().price, order.price);
        assert_eq!(report.payload().venue, order.venue.as_str());
    }
}
