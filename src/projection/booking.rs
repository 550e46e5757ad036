//! Instrument-specific booking helpers (spec §1: "uses of the engine, not
//! independent subsystems"). Each turns a [`CanonicalOrder`] into the
//! [`Transaction`] the ledger engine executes; none of them mutate the
//! order fields a regulatory report projects, which is what makes the
//! commutativity law (spec §4.5 "Master Square") hold — see
//! [`canonical_form`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::account::AccountId;
use crate::error::Error;
use crate::ledger::transaction::{Move, Transaction, TransactionId};
use crate::order::{CanonicalOrder, Side};
use crate::value::canonical::Canonical;

/// Book an equity trade as a T+N cash/securities exchange (spec §8
/// scenario 1): `price * quantity` of cash moves from buyer to seller,
/// `quantity` of the instrument moves from seller to buyer.
pub fn book_equity_settlement(
    order: &CanonicalOrder,
    buyer_cash_account: AccountId,
    seller_cash_account: AccountId,
    buyer_securities_account: AccountId,
    seller_securities_account: AccountId,
    timestamp: DateTime<Utc>,
) -> Result<Transaction, Error> {
    let notional = order.price.abs() * order.quantity;
    let (cash_source, cash_destination, securities_source, securities_destination) = match order.side {
        Side::Buy => (buyer_cash_account, seller_cash_account, seller_securities_account, buyer_securities_account),
        Side::Sell => (seller_cash_account, buyer_cash_account, buyer_securities_account, seller_securities_account),
    };

    let moves = vec![
        Move::new(cash_source, cash_destination, order.currency.as_str(), notional)?,
        Move::new(securities_source, securities_destination, order.instrument_id.as_str(), order.quantity)?,
    ];

    Transaction::new(
        TransactionId::new(format!("BOOK-{}", order.order_id))?,
        moves,
        timestamp,
        Some(order.content_hash()),
    )
}

/// The normalized order recoverable after booking, for the commutativity
/// law `project(order) == project(canonical_form(book(order)))` (spec
/// §4.5 "Commutativity Law"). Booking helpers above only ever move
/// balances between ledger accounts — they never rewrite order_id,
/// instrument_id, side, quantity, price, currency, counterparty/executing
/// LEIs, trade_date, or venue, which are exactly the fields every report
/// regime projects. So the normalized order recovered after booking is
/// the same order, by construction, and this function is the identity.
pub fn canonical_form(order: &CanonicalOrder, _booked: &Transaction) -> CanonicalOrder {
    order.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{CanonicalOrderBuilder, InstrumentFamily, OrderType};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn equity_order() -> CanonicalOrder {
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
            settlement_date: Some(crate::order::add_business_days(ts, 2)),
            venue: Some("XNYS".into()),
            timestamp: Some(ts),
        }
        .build()
        .unwrap()
    }

    fn acc(id: &str) -> AccountId {
        AccountId::new(id).unwrap()
    }

    #[test]
    fn equity_settlement_scenario_produces_balanced_moves() {
        let order = equity_order();
        let tx = book_equity_settlement(
            &order,
            acc("BUYER-CASH"),
            acc("SELLER-CASH"),
            acc("BUYER-SEC"),
            acc("SELLER-SEC"),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(tx.moves.len(), 2);
        let cash_move = tx.moves.iter().find(|m| m.unit == "USD").unwrap();
        assert_eq!(cash_move.quantity, dec!(17550.00));
        let securities_move = tx.moves.iter().find(|m| m.unit == "AAPL").unwrap();
        assert_eq!(securities_move.quantity, dec!(100));
    }

    #[test]
    fn canonical_form_recovers_the_same_order() {
        let order = equity_order();
        let tx = book_equity_settlement(
            &order,
            acc("BUYER-CASH"),
            acc("SELLER-CASH"),
            acc("BUYER-SEC"),
            acc("SELLER-SEC"),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(canonical_form(&order, &tx), order);
    }
}
