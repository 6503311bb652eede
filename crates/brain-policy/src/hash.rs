// hash.rs — SHA-256 hashing helpers.
//
// All content addressing in the policy service is SHA-256, hex-encoded
// lowercase: regime hashes use the full 64-character digest, proposal
// tokens use a truncated prefix.

use sha2::{Digest, Sha256};

/// Hash a UTF-8 string, returning a lowercase hex-encoded SHA-256 digest.
pub fn sha256_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash a UTF-8 string and keep the first `len` hex characters.
pub fn sha256_hex_truncated(s: &str, len: usize) -> String {
    let mut digest = sha256_hex(s);
    digest.truncate(len);
    digest
}
