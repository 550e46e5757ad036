//! Append-only persistence over `sled` (SPEC_FULL.md §B "Persistence
//! shape"): the transaction log and the attestation store, each keyed by
//! an identifier that must never be silently overwritten. Grounded on the
//! approval prototype's `TradeContext::{save_to_db, load_from_db}`
//! (`src/context.rs`), generalized from a single keyed blob to a
//! reject-on-conflicting-overwrite store.
//!
//! The wire envelope below is `minicbor`, the same crate the prototype
//! uses throughout `src/context.rs`/`src/trade.rs`/`src/builder.rs` — kept
//! strictly apart from [`crate::value::canonical`], which exists only for
//! content hashing (spec §4.1).

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use minicbor::{Decode, Encode};
use rust_decimal::Decimal;

use crate::account::AccountId;
use crate::attestation::Attestation;
use crate::error::Error;
use crate::ledger::transaction::{Move, Transaction, TransactionId};
use crate::value::canonical::{Canonical, ContentHash};

/// Nanosecond-since-epoch timestamp codec, the same representation the
/// prototype's `TimeStamp<Utc>` uses (`src/trade.rs`).
struct WireTimestamp(DateTime<Utc>);

impl<C> Encode<C> for WireTimestamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let nsec = self
            .0
            .timestamp_nanos_opt()
            .ok_or_else(|| minicbor::encode::Error::message("timestamp out of nanosecond range"))?;
        e.i64(nsec)?.ok()
    }
}

impl<'b, C> Decode<'b, C> for WireTimestamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        Ok(WireTimestamp(DateTime::from_timestamp_nanos(d.i64()?)))
    }
}

#[derive(Encode, Decode)]
struct WireMove {
    #[n(0)]
    source: String,
    #[n(1)]
    destination: String,
    #[n(2)]
    unit: String,
    /// Decimals cross the wire as their canonical text form, never as
    /// floats, so no precision is lost in transit.
    #[n(3)]
    quantity: String,
}

impl From<&Move> for WireMove {
    fn from(mv: &Move) -> Self {
        Self {
            source: mv.source.as_str().to_string(),
            destination: mv.destination.as_str().to_string(),
            unit: mv.unit.clone(),
            quantity: mv.quantity.to_string(),
        }
    }
}

impl TryFrom<WireMove> for Move {
    type Error = Error;

    fn try_from(wire: WireMove) -> Result<Self, Error> {
        let quantity = Decimal::from_str(&wire.quantity)
            .map_err(|e| Error::single_violation("wire.move.quantity", e.to_string()))?;
        Move::new(
            AccountId::new(wire.source)?,
            AccountId::new(wire.destination)?,
            wire.unit,
            quantity,
        )
    }
}

#[derive(Encode, Decode)]
struct WireTransaction {
    #[n(0)]
    id: String,
    #[n(1)]
    moves: Vec<WireMove>,
    #[n(2)]
    timestamp: WireTimestamp,
    #[n(3)]
    attestation_reference: Option<String>,
}

impl From<&Transaction> for WireTransaction {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id.as_str().to_string(),
            moves: transaction.moves.iter().map(WireMove::from).collect(),
            timestamp: WireTimestamp(transaction.timestamp),
            attestation_reference: transaction
                .attestation_reference
                .as_ref()
                .map(|h| h.as_hex().to_string()),
        }
    }
}

impl TryFrom<WireTransaction> for Transaction {
    type Error = Error;

    fn try_from(wire: WireTransaction) -> Result<Self, Error> {
        let moves = wire
            .moves
            .into_iter()
            .map(Move::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Transaction::new(
            TransactionId::new(wire.id)?,
            moves,
            wire.timestamp.0,
            wire.attestation_reference.map(ContentHash::from_hex),
        )
    }
}

/// An append-only keyed byte store: `put` rejects a second write under an
/// existing key whose bytes differ, so no caller can silently overwrite a
/// previously persisted fact (spec §6 "Storage shape" — append-only,
/// bitemporal tables).
pub struct AppendOnlyStore {
    db: sled::Db,
}

impl AppendOnlyStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self { db: sled::open(path)? })
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), Error> {
        match self.db.get(key.as_bytes())? {
            Some(existing) if existing.as_ref() == bytes.as_slice() => Ok(()),
            Some(_) => Err(Error::persistence(
                "append_only",
                format!("key {key} already has a different value on record"),
            )),
            None => {
                self.db.insert(key.as_bytes(), bytes)?;
                Ok(())
            }
        }
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    /// Persist a transaction keyed by its transaction id (spec §4.3
    /// "Idempotency"): re-persisting the same transaction is a no-op, but
    /// persisting a different transaction under an id already on record is
    /// rejected, not silently overwritten.
    pub fn put_transaction(&self, transaction: &Transaction) -> Result<(), Error> {
        let wire = WireTransaction::from(transaction);
        let bytes = minicbor::to_vec(&wire).map_err(|e| Error::persistence("minicbor", e.to_string()))?;
        self.put(transaction.id.as_str(), bytes)
    }

    pub fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, Error> {
        match self.get(id.as_str())? {
            None => Ok(None),
            Some(bytes) => {
                let wire: WireTransaction =
                    minicbor::decode(&bytes).map_err(|e| Error::persistence("minicbor", e.to_string()))?;
                Ok(Some(Transaction::try_from(wire)?))
            }
        }
    }

    /// Persist an attestation's payload keyed by its attestation id (the
    /// content hash over the full identity, spec §4.2). The payload is
    /// stored as its own canonical bytes rather than round-tripped through
    /// a generic wire codec — canonical bytes are already this crate's
    /// content-addressed source of truth, so no second encoding is needed
    /// for audit/replay lookups.
    pub fn put_attestation<T: Canonical + Clone>(&self, attestation: &Attestation<T>) -> Result<(), Error> {
        self.put(
            attestation.attestation_id().as_hex(),
            attestation.payload().to_canonical_bytes(),
        )
    }

    pub fn get_attestation_payload_bytes(&self, attestation_id: &ContentHash) -> Result<Option<Vec<u8>>, Error> {
        self.get(attestation_id.as_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::Confidence;
    use crate::value::NonEmptyString;
    use rust_decimal_macros::dec;

    fn acc(id: &str) -> AccountId {
        AccountId::new(id).unwrap()
    }

    fn sample_transaction(id: &str) -> Transaction {
        Transaction::new(
            TransactionId::new(id).unwrap(),
            vec![Move::new(acc("A"), acc("B"), "USD", dec!(100)).unwrap()],
            Utc::now(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn transaction_round_trips_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = AppendOnlyStore::open(dir.path()).unwrap();
        let tx = sample_transaction("TX-1");
        store.put_transaction(&tx).unwrap();
        let loaded = store.get_transaction(&tx.id).unwrap().unwrap();
        assert_eq!(loaded, tx);
    }

    #[test]
    fn re_persisting_the_same_transaction_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = AppendOnlyStore::open(dir.path()).unwrap();
        let tx = sample_transaction("TX-1");
        store.put_transaction(&tx).unwrap();
        assert!(store.put_transaction(&tx).is_ok());
    }

    #[test]
    fn persisting_a_different_transaction_under_the_same_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = AppendOnlyStore::open(dir.path()).unwrap();
        let tx1 = sample_transaction("TX-1");
        let mut tx2 = sample_transaction("TX-1");
        tx2.moves[0].quantity = dec!(200);
        store.put_transaction(&tx1).unwrap();
        assert!(store.put_transaction(&tx2).is_err());
    }

    #[derive(Clone)]
    struct Payload(String);
    impl Canonical for Payload {
        fn to_canonical_bytes(&self) -> Vec<u8> {
            crate::value::canonical::CanonicalWriter::new().str(&self.0).finish()
        }
    }

    #[test]
    fn attestation_payload_round_trips_as_canonical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = AppendOnlyStore::open(dir.path()).unwrap();
        let attestation = Attestation::new(
            Payload("AAPL@175.50".into()),
            NonEmptyString::new("TEST-VENUE").unwrap(),
            Utc::now(),
            Confidence::Firm {
                exchange_reference: "FILL-1".into(),
            },
            vec![],
        );
        store.put_attestation(&attestation).unwrap();
        let bytes = store
            .get_attestation_payload_bytes(attestation.attestation_id())
            .unwrap()
            .unwrap();
        assert_eq!(bytes, attestation.payload().to_canonical_bytes());
    }
}
