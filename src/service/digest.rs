//! Content digests tying stored scores back to the graded text

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a response text
pub fn response_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
