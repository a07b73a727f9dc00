//! Content digest used to deduplicate clipboard items.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex-encoded SHA-256 digest of `content`.
pub fn checksum(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_empty_input() {
        assert_eq!(
            checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn checksum_is_stable_and_content_sensitive() {
        assert_eq!(checksum(b"hello"), checksum(b"hello"));
        assert_ne!(checksum(b"hello"), checksum(b"hello "));
        assert_eq!(checksum(b"hello").len(), 64);
    }
}
