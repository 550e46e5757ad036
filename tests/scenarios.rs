//! End-to-end literal scenarios (spec §8 "End-to-end scenarios with
//! literal inputs"). Each test reproduces one scenario's stated numbers
//! exactly and checks the stated post-conditions, the way the approval
//! prototype's own `tests/scenarios.rs` drove its service end-to-end
//! against literal trade data.

use attestor_core::account::{AccountId, AccountType};
use attestor_core::ledger::{LedgerEngine, Move, Transaction, TransactionId};
use attestor_core::market::gates::{run_surface_gates, CalibrationVerdict, DEFAULT_LOG_MONEYNESS_GRID_STEP};
use attestor_core::market::svi::SviSlice;
use attestor_core::order::{add_business_days, CanonicalOrderBuilder, InstrumentFamily, OrderType, Side};
use attestor_core::projection::{book_equity_settlement, canonical_form, derive_uti, project, Regime};
use attestor_core::value::canonical::Canonical;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn acc(id: &str) -> AccountId {
    AccountId::new(id).unwrap()
}

/// Scenario 1: equity settlement (T+2).
#[test]
fn equity_settlement_t_plus_2() {
    let trade_date = Utc.with_ymd_and_hms(2025, 6, 19, 9, 30, 0).unwrap(); // Thursday
    let settlement_date = add_business_days(trade_date, 2);
    assert_eq!(
        settlement_date.date_naive(),
        Utc.with_ymd_and_hms(2025, 6, 23, 0, 0, 0).unwrap().date_naive() // Monday
    );

    let order = CanonicalOrderBuilder {
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
        trade_date: Some(trade_date),
        settlement_date: Some(settlement_date),
        venue: Some("XNYS".into()),
        timestamp: Some(trade_date),
    }
    .build()
    .unwrap();

    let transaction = book_equity_settlement(
        &order,
        acc("BUYER-CASH"),
        acc("SELLER-CASH"),
        acc("BUYER-SEC"),
        acc("SELLER-SEC"),
        trade_date,
    )
    .unwrap();

    assert_eq!(transaction.moves.len(), 2);
    let cash_move = transaction.moves.iter().find(|m| m.unit == "USD").unwrap();
    assert_eq!(cash_move.source, acc("BUYER-CASH"));
    assert_eq!(cash_move.destination, acc("SELLER-CASH"));
    assert_eq!(cash_move.quantity, dec!(17550.00));
    let securities_move = transaction.moves.iter().find(|m| m.unit == "AAPL").unwrap();
    assert_eq!(securities_move.source, acc("SELLER-SEC"));
    assert_eq!(securities_move.destination, acc("BUYER-SEC"));
    assert_eq!(securities_move.quantity, dec!(100));

    let mut engine = LedgerEngine::new();
    for (id, kind) in [
        ("BUYER-CASH", AccountType::Cash),
        ("SELLER-CASH", AccountType::Cash),
        ("BUYER-SEC", AccountType::Securities),
        ("SELLER-SEC", AccountType::Securities),
    ] {
        engine.register_account(acc(id), kind).unwrap();
    }
    engine.execute(transaction).unwrap();
    assert_eq!(engine.total_supply("USD"), Decimal::ZERO);
    assert_eq!(engine.total_supply("AAPL"), Decimal::ZERO);
}

/// Scenario 2: CDS credit event settlement.
#[test]
fn cds_credit_event_settlement() {
    let notional = dec!(10_000_000);
    let recovery_rate = dec!(0.40);
    let contractual_spread = dec!(0.0100);
    let accrued_days = dec!(86); // 2025-09-20 -> 2025-12-15, ACT/360
    let day_count_basis = dec!(360);

    let protection_payment = notional * (Decimal::ONE - recovery_rate);
    assert_eq!(protection_payment, dec!(6_000_000));

    let accrued_premium = notional * contractual_spread * (accrued_days / day_count_basis);
    assert_eq!(accrued_premium.round_dp(6), dec!(23888.888889).round_dp(6));

    let mut engine = LedgerEngine::new();
    for id in ["PROTECTION-SELLER", "PROTECTION-BUYER"] {
        engine.register_account(acc(id), AccountType::Cash).unwrap();
    }

    let transaction = Transaction::new(
        TransactionId::new("CDS-CREDIT-EVENT-1").unwrap(),
        vec![
            Move::new(acc("PROTECTION-SELLER"), acc("PROTECTION-BUYER"), "USD", protection_payment).unwrap(),
            Move::new(acc("PROTECTION-BUYER"), acc("PROTECTION-SELLER"), "USD", accrued_premium).unwrap(),
            Move::new(acc("PROTECTION-BUYER"), acc("PROTECTION-SELLER"), "CDS-CONTRACT-UNIT", notional).unwrap(),
        ],
        Utc.with_ymd_and_hms(2025, 12, 15, 0, 0, 0).unwrap(),
        None,
    )
    .unwrap();

    engine.execute(transaction).unwrap();

    assert_eq!(engine.total_supply("USD"), Decimal::ZERO);
    assert_eq!(engine.total_supply("CDS-CONTRACT-UNIT"), Decimal::ZERO);
}

/// Scenario 3: collateral substitution.
#[test]
fn collateral_substitution() {
    let mut engine = LedgerEngine::new();
    engine.register_account(acc("COLLATERAL-ACCOUNT"), AccountType::Collateral).unwrap();
    engine.register_account(acc("TRADING-ACCOUNT"), AccountType::Margin).unwrap();

    let transaction = Transaction::new(
        TransactionId::new("COLLATERAL-SUB-1").unwrap(),
        vec![
            Move::new(acc("COLLATERAL-ACCOUNT"), acc("TRADING-ACCOUNT"), "BOND-X", dec!(1_000_000)).unwrap(),
            Move::new(acc("TRADING-ACCOUNT"), acc("COLLATERAL-ACCOUNT"), "USD", dec!(1_050_000)).unwrap(),
        ],
        Utc::now(),
        None,
    )
    .unwrap();

    engine.execute(transaction).unwrap();
    assert_eq!(engine.total_supply("BOND-X"), Decimal::ZERO);
    assert_eq!(engine.total_supply("USD"), Decimal::ZERO);
}

/// Scenario 4: SVI arbitrage rejection (calendar spread).
#[test]
fn svi_arbitrage_rejection_falls_back_to_last_good_surface() {
    let slice_t1 = SviSlice::new(dec!(0.25), dec!(0.08), dec!(0.0), dec!(0.0), dec!(0.0), dec!(0.1)).unwrap();
    let slice_t2 = SviSlice::new(dec!(0.50), dec!(0.06), dec!(0.0), dec!(0.0), dec!(0.0), dec!(0.1)).unwrap();

    let verdict = run_surface_gates(&[slice_t1, slice_t2], DEFAULT_LOG_MONEYNESS_GRID_STEP);
    match verdict {
        CalibrationVerdict::Reject(failures) => {
            assert!(failures.iter().any(|f| f.gate_name == "calendar_spread"));
        }
        other => panic!("expected calendar-spread Critical rejection, got {other:?}"),
    }
}

/// Scenario 5: EMIR Master Square.
#[test]
fn emir_master_square_commutes() {
    let trade_date = Utc.with_ymd_and_hms(2025, 6, 19, 9, 30, 0).unwrap();
    let order = CanonicalOrderBuilder {
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
        trade_date: Some(trade_date),
        settlement_date: Some(add_business_days(trade_date, 2)),
        venue: Some("XNYS".into()),
        timestamp: Some(trade_date),
    }
    .build()
    .unwrap();

    let report_before = project(&order, Regime::Emir, trade_date).unwrap();
    assert_eq!(report_before.payload().uti.as_str().len(), 52);
    assert!(report_before.payload().uti.as_str().starts_with("5299001234567890ABCD"));

    let booked = book_equity_settlement(
        &order,
        acc("BUYER-CASH"),
        acc("SELLER-CASH"),
        acc("BUYER-SEC"),
        acc("SELLER-SEC"),
        trade_date,
    )
    .unwrap();
    let normalized = canonical_form(&order, &booked);
    let report_after = project(&normalized, Regime::Emir, trade_date).unwrap();

    assert_eq!(report_before.payload(), report_after.payload());

    let uti_direct = derive_uti(&order.executing_party_lei, &order.content_hash()).unwrap();
    assert_eq!(uti_direct, report_before.payload().uti);
}

/// Scenario 6: replay determinism.
#[test]
fn replay_determinism_across_cloned_engines() {
    let mut e1 = LedgerEngine::new();
    e1.register_account(acc("A"), AccountType::Cash).unwrap();
    e1.register_account(acc("B"), AccountType::Cash).unwrap();

    let t1 = Transaction::new(
        TransactionId::new("T1").unwrap(),
        vec![Move::new(acc("A"), acc("B"), "USD", dec!(100)).unwrap()],
        Utc::now(),
        None,
    )
    .unwrap();
    let t2 = Transaction::new(
        TransactionId::new("T2").unwrap(),
        vec![Move::new(acc("B"), acc("A"), "USD", dec!(40)).unwrap()],
        Utc::now(),
        None,
    )
    .unwrap();
    let t3 = Transaction::new(
        TransactionId::new("T3").unwrap(),
        vec![Move::new(acc("A"), acc("B"), "USD", dec!(10)).unwrap()],
        Utc::now(),
        None,
    )
    .unwrap();

    e1.execute(t1).unwrap();
    e1.execute(t2).unwrap();

    let mut e2 = e1.clone(); // cloned at step 2

    e1.execute(t3.clone()).unwrap();
    e2.execute(t3).unwrap();

    for (account, unit) in [(acc("A"), "USD"), (acc("B"), "USD")] {
        assert_eq!(e1.balance(&account, unit), e2.balance(&account, unit));
    }
    assert_eq!(e1.transaction_count(), 3);
    assert_eq!(e2.transaction_count(), 3);
}
