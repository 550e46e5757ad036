//! Attestation Machinery (spec §4.2): a generic envelope wrapping a
//! payload with provenance. Grounded on the approval prototype's
//! `Witness`/`WitnessType` pair (`src/context.rs`), generalized from
//! trade-state actions to arbitrary attested payloads and widened from one
//! witness-type enum to the three-variant confidence discipline spec.md
//! requires.

use chrono::{DateTime, Utc};

use crate::value::canonical::{Canonical, CanonicalWriter, ContentHash};
use crate::value::NonEmptyString;

/// The epistemic status of an attestation. Every `match` on this type must
/// be exhaustive — there is no wildcard arm anywhere in this crate that
/// silently drops a variant, by convention enforced at review time (Rust's
/// compiler already forces exhaustiveness on `match`; `#[non_exhaustive]`
/// is deliberately not used here so downstream crates get the same
/// guarantee).
#[derive(Debug, Clone, PartialEq)]
pub enum Confidence {
    /// A single exchange fill, attested by a named venue.
    Firm { exchange_reference: String },
    /// A two-sided market quote. `bid <= ask` is enforced at construction.
    Quoted {
        bid: rust_decimal::Decimal,
        ask: rust_decimal::Decimal,
        venue: String,
        condition: QuoteCondition,
    },
    /// A calibration output, carrying the model name, its input
    /// attestation ids, and a fit-quality map (e.g. `rmse`, `max_error`).
    Derived {
        model: String,
        inputs: Vec<String>,
        fit_quality: Vec<(String, rust_decimal::Decimal)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteCondition {
    Normal,
    Indicative,
    Stale,
}

impl QuoteCondition {
    fn tag(&self) -> &'static str {
        match self {
            QuoteCondition::Normal => "normal",
            QuoteCondition::Indicative => "indicative",
            QuoteCondition::Stale => "stale",
        }
    }
}

impl Confidence {
    fn tag(&self) -> &'static str {
        match self {
            Confidence::Firm { .. } => "firm",
            Confidence::Quoted { .. } => "quoted",
            Confidence::Derived { .. } => "derived",
        }
    }

    fn to_canonical_bytes(&self) -> Vec<u8> {
        let writer = CanonicalWriter::new().tag(self.tag());
        match self {
            Confidence::Firm { exchange_reference } => writer.str(exchange_reference).finish(),
            Confidence::Quoted {
                bid,
                ask,
                venue,
                condition,
            } => writer
                .decimal(*bid)
                .decimal(*ask)
                .str(venue)
                .tag(condition.tag())
                .finish(),
            Confidence::Derived {
                model,
                inputs,
                fit_quality,
            } => {
                let input_bytes: Vec<Vec<u8>> = inputs
                    .iter()
                    .map(|i| CanonicalWriter::new().str(i).finish())
                    .collect();
                let mut sorted_fit = fit_quality.clone();
                sorted_fit.sort_by(|a, b| a.0.cmp(&b.0));
                let fit_bytes = CanonicalWriter::new()
                    .u64(sorted_fit.len() as u64)
                    .sequence(
                        sorted_fit
                            .iter()
                            .map(|(k, v)| {
                                CanonicalWriter::new().str(k).decimal(*v).finish()
                            })
                            .collect::<Vec<_>>()
                            .iter()
                            .map(|v| v.as_slice()),
                    )
                    .finish();
                writer
                    .str(model)
                    .sequence(input_bytes.iter().map(|v| v.as_slice()))
                    .nested(&fit_bytes)
                    .finish()
            }
        }
    }

    /// Construct a `Quoted` confidence, enforcing `bid <= ask`.
    pub fn quoted(
        bid: rust_decimal::Decimal,
        ask: rust_decimal::Decimal,
        venue: impl Into<String>,
        condition: QuoteCondition,
    ) -> Result<Self, crate::error::Error> {
        if bid > ask {
            return Err(crate::error::Error::single_violation(
                "confidence.quoted",
                format!("bid {bid} must be <= ask {ask}"),
            ));
        }
        Ok(Confidence::Quoted {
            bid,
            ask,
            venue: venue.into(),
            condition,
        })
    }
}

/// A generic provenance-carrying envelope around payload `T`.
///
/// `attestation_id` is a deterministic hash of the full identity payload —
/// source, payload content hash, timestamp, confidence, and provenance —
/// so that two calls to [`Attestation::new`] with identical arguments
/// always produce byte-equal ids, on any host, at any time. This is the
/// foundation of replay determinism (spec §4.2, §8).
#[derive(Debug, Clone, PartialEq)]
pub struct Attestation<T: Canonical + Clone> {
    payload: T,
    source: NonEmptyString,
    timestamp: DateTime<Utc>,
    payload_hash: ContentHash,
    attestation_id: ContentHash,
    confidence: Confidence,
    provenance: Vec<ContentHash>,
}

impl<T: Canonical + Clone> Attestation<T> {
    /// Construct a new attestation. The timestamp is taken as an explicit
    /// argument (spec §5 "Deterministic clock") — this function never
    /// reads a system clock.
    pub fn new(
        payload: T,
        source: NonEmptyString,
        timestamp: DateTime<Utc>,
        confidence: Confidence,
        provenance: Vec<ContentHash>,
    ) -> Self {
        let payload_hash = payload.content_hash();
        let identity_bytes = CanonicalWriter::new()
            .str(source.as_str())
            .nested(payload_hash.as_hex().as_bytes())
            .str(&timestamp.to_rfc3339())
            .nested(&confidence.to_canonical_bytes())
            .sequence(provenance.iter().map(|p| p.as_hex().as_bytes()))
            .finish();
        let attestation_id = crate::value::canonical::content_hash(&identity_bytes);

        Self {
            payload,
            source,
            timestamp,
            payload_hash,
            attestation_id,
            confidence,
            provenance,
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn source(&self) -> &str {
        self.source.as_str()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload_hash(&self) -> &ContentHash {
        &self.payload_hash
    }

    pub fn attestation_id(&self) -> &ContentHash {
        &self.attestation_id
    }

    pub fn confidence(&self) -> &Confidence {
        &self.confidence
    }

    pub fn provenance(&self) -> &[ContentHash] {
        &self.provenance
    }

    /// Produce a *new* attestation correcting this one: its provenance
    /// references this attestation's id, and its confidence is the
    /// caller-supplied replacement. Attestations are otherwise never
    /// mutated (spec §4.2 "Immutability").
    pub fn correct(
        &self,
        new_payload: T,
        source: NonEmptyString,
        timestamp: DateTime<Utc>,
        confidence: Confidence,
    ) -> Self {
        let mut provenance = self.provenance.clone();
        provenance.push(self.attestation_id.clone());
        Self::new(new_payload, source, timestamp, confidence, provenance)
    }
}
