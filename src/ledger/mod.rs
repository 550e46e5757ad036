//! The Ledger Engine (spec §4.3): a generic, instrument-agnostic
//! double-entry processor. Carries zero instrument-specific code —
//! instruments appear only as opaque unit strings.

pub mod engine;
pub mod transaction;

pub use engine::{ExecuteOutcome, LedgerEngine};
pub use transaction::{Move, Transaction, TransactionId};
