//! The closed error taxonomy (spec §7). Every fallible operation in this
//! crate returns a value of this enum rather than panicking or throwing;
//! callers are expected to exhaustively match on [`Error`].

use rust_decimal::Decimal;

pub type Result<T> = std::result::Result<T, Error>;

/// A single field violation collected during construction of a refined
/// value. Construction of compound values (e.g. [`crate::order::CanonicalOrder`])
/// collects *every* violation before failing, so callers see the complete
/// error set in one round trip rather than one-field-at-a-time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// One or more refined-primitive or compound-value constraints failed.
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldViolation>),

    /// A successful-looking transaction would have changed total supply of
    /// a unit; rejected and rolled back before this error is returned.
    #[error("conservation violation in law {law}: unit {unit} expected {expected}, got {actual}")]
    ConservationViolation {
        law: &'static str,
        unit: String,
        expected: Decimal,
        actual: Decimal,
    },

    /// A lifecycle transition `(from, to)` that does not appear in the
    /// governing transition table.
    #[error("illegal transition for {entity}: {from} -> {to}")]
    IllegalTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// A required market observable was absent and no fallback within the
    /// staleness threshold existed.
    #[error("missing observable {key} as of {as_of}")]
    MissingObservable { key: String, as_of: String },

    /// A calibration (yield curve, credit curve, SVI slice) could not be
    /// produced, or was produced but rejected by a Critical arbitrage gate.
    #[error("calibration failed for model {model}: {cause}")]
    Calibration {
        model: String,
        cause: String,
        fit_quality: Vec<(String, Decimal)>,
    },

    /// Reserved for the external pricing collaborator; the core never
    /// prices instruments itself but surfaces this kind so callers can
    /// pattern-match the full taxonomy.
    #[error("pricing error in model {model}: {reason}")]
    Pricing { model: String, reason: String },

    /// A failure in an external persistence layer (e.g. `sled`).
    #[error("persistence error in {layer}: {cause}")]
    Persistence { layer: String, cause: String },
}

impl Error {
    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        Self::Validation(violations)
    }

    pub fn single_violation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation(vec![FieldViolation::new(field, reason)])
    }

    pub fn persistence(layer: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Persistence {
            layer: layer.into(),
            cause: cause.into(),
        }
    }
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::persistence("sled", e.to_string())
    }
}
