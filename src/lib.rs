//! Attestation-first cross-asset trading back-office core.
//!
//! Five components, leaves first: [`value`] (refined primitives, canonical
//! bytes, decimal arithmetic), [`attestation`] (provenance-carrying
//! envelopes), [`ledger`] (generic double-entry engine), [`market`]
//! (calibrated surfaces and curves behind an arbitrage-freedom gate), and
//! [`projection`] (regulatory report projection under the commutativity
//! law). See `SPEC_FULL.md` for the full requirements this crate implements.

pub mod error;

pub mod value;

pub mod attestation;

pub mod account;
pub mod collateral;
pub mod ledger;
pub mod lifecycle;
pub mod order;

pub mod market;

pub mod projection;

pub mod config;
pub mod logging;
pub mod persistence;

pub use error::{Error, Result};
