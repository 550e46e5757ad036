//! UTI derivation (spec §4.5 "UTI derivation"): executing-party LEI (20
//! chars) concatenated with the first 32 hex characters of the order's
//! content hash, giving a deterministic 52-character identifier.

use crate::error::Error;
use crate::value::canonical::{first_hex_chars, ContentHash};
use crate::value::{Lei, Uti};

/// Derive the UTI for an order: `executing_party_lei ++ first_hex_chars(order_hash, 32)`.
/// Deterministic and reproducible — same LEI and hash always produce the
/// same UTI (spec §4.5).
pub fn derive_uti(executing_party_lei: &Lei, order_content_hash: &ContentHash) -> Result<Uti, Error> {
    let mut value = String::with_capacity(52);
    value.push_str(executing_party_lei.as_str());
    value.push_str(&first_hex_chars(order_content_hash, 32));
    Uti::new(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uti_is_deterministic_for_identical_inputs() {
        let lei = Lei::new("5299001234567890ABCD").unwrap();
        let hash = ContentHash::from_hex("a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d8e9f0a1b2".to_string());
        let uti1 = derive_uti(&lei, &hash).unwrap();
        let uti2 = derive_uti(&lei, &hash).unwrap();
        assert_eq!(uti1, uti2);
        assert_eq!(uti1.as_str().len(), 52);
        assert!(uti1.as_str().starts_with("5299001234567890ABCD"));
    }
}
