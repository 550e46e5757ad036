//! The Market Data Oracle (spec §4.4): ingestion of raw observations as
//! attestations, calibration of two families of market objects —
//! volatility surfaces (SVI) and credit curves (piecewise-constant
//! hazard) — each a pure function of attested inputs, gated by an
//! arbitrage-freedom taxonomy before publication.

pub mod credit_curve;
pub mod gates;
pub mod ingestion;
pub mod numerics;
pub mod svi;
pub mod surface;
pub mod yield_curve;

pub use credit_curve::{bootstrap_credit_curve, CreditCurve};
pub use gates::{CalibrationVerdict, GateFailure, GateSeverity, PublicationOutcome};
pub use ingestion::{ingest_fill, ingest_quote, MarketDataPoint};
pub use surface::VolatilitySurface;
pub use svi::{calibrate_svi_slice, SviSlice};
pub use yield_curve::{bootstrap_yield_curve, RateInstrument, YieldCurve};
