//! Content hashing.
//!
//! Version identifiers are content-addressed: the same (spec id, sequence,
//! text) triple always derives the same id.

use sha2::{Digest, Sha256};

/// Number of hex characters kept in a version id.
const VERSION_ID_LEN: usize = 16;

/// Derive the version id for one tracked snapshot.
pub fn version_id(spec_id: &str, sequence: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(spec_id.as_bytes());
    hasher.update([0]);
    hasher.update(sequence.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(text.as_bytes());
    let mut hex = hex_encode(&hasher.finalize());
    hex.truncate(VERSION_ID_LEN);
    hex
}

/// Encode bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_id_is_pure() {
        let a = version_id("S1", 1, "Shall support X");
        let b = version_id("S1", 1, "Shall support X");
        assert_eq!(a, b);
        assert_eq!(a.len(), VERSION_ID_LEN);
    }

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(hex_encode(&[0x00, 0x0f, 0xab]), "000fab");
    }

    #[test]
    fn version_id_depends_on_every_input() {
        let base = version_id("S1", 1, "text");
        assert_ne!(base, version_id("S1", 2, "text"));
        assert_ne!(base, version_id("S2", 1, "text"));
        assert_ne!(base, version_id("S1", 1, "text2"));
        // the separator keeps ("S1", 11) and ("S11", 1) apart
        assert_ne!(version_id("S1", 11, "t"), version_id("S11", 1, "t"));
    }
}
