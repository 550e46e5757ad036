//! Moves and transactions (spec §3 "Move", "Transaction"). A move is a
//! transfer of a strictly positive quantity of one unit between two
//! distinct accounts — self-transfers are structurally inexpressible,
//! enforced here the same way the approval prototype enforces every other
//! domain invariant: a smart constructor that validates before a value
//! escapes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::account::AccountId;
use crate::error::Error;
use crate::value::canonical::{Canonical, CanonicalWriter, ContentHash};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub source: AccountId,
    pub destination: AccountId,
    pub unit: String,
    pub quantity: Decimal,
}

impl Move {
    /// Construct a move, rejecting a non-positive quantity or a
    /// source/destination pair that are the same account (spec §3
    /// "Move", §8 boundary behaviors).
    pub fn new(
        source: AccountId,
        destination: AccountId,
        unit: impl Into<String>,
        quantity: Decimal,
    ) -> Result<Self, Error> {
        if source == destination {
            return Err(Error::single_violation(
                "move",
                format!("source and destination must differ, both were {source}"),
            ));
        }
        if quantity <= Decimal::ZERO {
            return Err(Error::single_violation(
                "move.quantity",
                format!("must be strictly positive, got {quantity}"),
            ));
        }
        Ok(Self {
            source,
            destination,
            unit: unit.into(),
            quantity,
        })
    }
}

impl Canonical for Move {
    fn to_canonical_bytes(&self) -> Vec<u8> {
        CanonicalWriter::new()
            .str(self.source.as_str())
            .str(self.destination.as_str())
            .str(&self.unit)
            .decimal(self.quantity)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::single_violation("transaction_id", "must not be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub moves: Vec<Move>,
    pub timestamp: DateTime<Utc>,
    pub attestation_reference: Option<ContentHash>,
}

impl Transaction {
    /// Construct a transaction, rejecting an empty move list (spec §3, §8
    /// boundary behaviors).
    pub fn new(
        id: TransactionId,
        moves: Vec<Move>,
        timestamp: DateTime<Utc>,
        attestation_reference: Option<ContentHash>,
    ) -> Result<Self, Error> {
        if moves.is_empty() {
            return Err(Error::single_violation(
                "transaction.moves",
                "must contain at least one move",
            ));
        }
        Ok(Self {
            id,
            moves,
            timestamp,
            attestation_reference,
        })
    }

    /// The set of distinct units touched by this transaction's moves.
    pub fn affected_units(&self) -> Vec<&str> {
        let mut units: Vec<&str> = self.moves.iter().map(|m| m.unit.as_str()).collect();
        units.sort_unstable();
        units.dedup();
        units
    }
}

impl Canonical for Transaction {
    fn to_canonical_bytes(&self) -> Vec<u8> {
        let move_bytes: Vec<Vec<u8>> = self.moves.iter().map(|m| m.to_canonical_bytes()).collect();
        CanonicalWriter::new()
            .str(self.id.as_str())
            .str(&self.timestamp.to_rfc3339())
            .str(
                self.attestation_reference
                    .as_ref()
                    .map(ContentHash::as_hex)
                    .unwrap_or(""),
            )
            .sequence(move_bytes.iter().map(|v| v.as_slice()))
            .finish()
    }
}
