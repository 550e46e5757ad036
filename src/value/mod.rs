//! Value Foundation: refined primitives with construction-time validation,
//! canonical byte serialization, content hashing, and the process-wide
//! decimal arithmetic context. Nothing in this module can cross a
//! component boundary unvalidated.

pub mod canonical;
pub mod decimal;
pub mod primitives;

pub use canonical::{content_hash, ContentHash};
pub use decimal::{DecimalContext, NonNegativeDecimal, PositiveDecimal};
pub use primitives::{Isin, Lei, NonEmptyString, Uti, UtcTimestamp};
