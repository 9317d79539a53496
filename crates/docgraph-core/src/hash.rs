use sha2::{Digest, Sha256};

/// Deterministic fingerprint of a file's bytes, used to detect real
/// content changes independent of file-system metadata.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
