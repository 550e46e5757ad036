//! Canonical byte serialization and content hashing (spec §4.1).
//!
//! Canonical bytes are deliberately *not* the wire format (`minicbor`, kept
//! from the teacher for the external envelope — see `SPEC_FULL.md` §B):
//! canonical bytes exist solely so that two structurally equal values hash
//! to the same identifier on any host, at any time, forever. The encoding
//! is simple on purpose: length-prefixed fields in a stable declared order,
//! decimals in their canonical textual form, timestamps as strict RFC3339
//! UTC, enums by a stable string tag, and maps written in key-sorted order.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use sha256::digest;

/// A SHA-256 content hash, stored as its lowercase hex encoding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 of `bytes`, as a [`ContentHash`].
pub fn content_hash(bytes: &[u8]) -> ContentHash {
    ContentHash(digest(bytes))
}

/// Builder for canonical bytes. Fields must be appended in a fixed,
/// declared order by the caller (the "stable field ordering" spec.md §4.1
/// requires); this type only guarantees that each field's own encoding is
/// unambiguous and delimiter-safe, not that callers order fields
/// consistently — that discipline lives in each type's `to_canonical_bytes`.
#[derive(Default)]
pub struct CanonicalWriter {
    buf: Vec<u8>,
}

impl CanonicalWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_len_prefixed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
        self.buf.extend_from_slice(bytes);
    }

    pub fn str(mut self, value: &str) -> Self {
        self.push_len_prefixed(value.as_bytes());
        self
    }

    pub fn tag(self, value: &str) -> Self {
        self.str(value)
    }

    pub fn decimal(self, value: Decimal) -> Self {
        // `Decimal::normalize` would strip trailing zeros that may be
        // semantically meaningful (e.g. scale carries precision intent in
        // some contracts), so the raw canonical string form is used as-is.
        self.str(&value.to_string())
    }

    pub fn i64(mut self, value: i64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u64(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn bytes(mut self, value: &[u8]) -> Self {
        self.push_len_prefixed(value);
        self
    }

    /// Append an already-canonicalized nested value (e.g. the canonical
    /// bytes of a sub-structure), length-prefixed so it cannot be confused
    /// with adjacent fields.
    pub fn nested(self, value: &[u8]) -> Self {
        self.bytes(value)
    }

    /// Append a sequence of already-canonicalized items in the given
    /// order. Ordering is the caller's responsibility: for sets without an
    /// intrinsic order (e.g. a map) the caller must sort keys first.
    pub fn sequence<'a>(mut self, items: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut count = 0u64;
        let mut body = Vec::new();
        for item in items {
            body.extend_from_slice(&(item.len() as u64).to_be_bytes());
            body.extend_from_slice(item);
            count += 1;
        }
        self.buf.extend_from_slice(&count.to_be_bytes());
        self.buf.extend_from_slice(&body);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// A value that can produce its own canonical byte representation. Every
/// attested or content-addressed type in this crate implements this.
pub trait Canonical {
    fn to_canonical_bytes(&self) -> Vec<u8>;

    fn content_hash(&self) -> ContentHash {
        content_hash(&self.to_canonical_bytes())
    }
}

/// Canonical-sort a map's keys, then write `(key, value_bytes)` pairs in
/// that order. Used whenever spec.md requires "maps serialized in
/// key-sorted order" (fit-quality maps, provenance-keyed structures, etc).
pub fn canonical_sorted_map<'a>(
    mut entries: Vec<(&'a str, Vec<u8>)>,
) -> Vec<u8> {
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let mut writer = CanonicalWriter::new().u64(entries.len() as u64);
    for (key, value) in entries {
        writer = writer.str(key).bytes(&value);
    }
    writer.finish()
}

/// Render a hash's hex into a fixed-width hex string, useful for wiring a
/// content hash into a fixed-length identifier slot (e.g. UTI derivation).
pub fn first_hex_chars(hash: &ContentHash, n: usize) -> String {
    let hex = hash.as_hex();
    let mut out = String::with_capacity(n);
    for c in hex.chars().take(n) {
        let _ = write!(out, "{c}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn identical_structure_hashes_identically() {
        let a = CanonicalWriter::new().str("AAPL").decimal(dec!(175.50)).finish();
        let b = CanonicalWriter::new().str("AAPL").decimal(dec!(175.50)).finish();
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn different_field_order_hashes_differently() {
        let a = CanonicalWriter::new().str("AAPL").str("USD").finish();
        let b = CanonicalWriter::new().str("USD").str("AAPL").finish();
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn sorted_map_is_order_independent_of_insertion() {
        let m1 = canonical_sorted_map(vec![("rmse", dec!(0.01).to_string().into_bytes()), ("max_error", dec!(0.02).to_string().into_bytes())]);
        let m2 = canonical_sorted_map(vec![("max_error", dec!(0.02).to_string().into_bytes()), ("rmse", dec!(0.01).to_string().into_bytes())]);
        assert_eq!(m1, m2);
    }
}
