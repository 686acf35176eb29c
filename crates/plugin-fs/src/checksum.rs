//! SHA-256 checksum utilities
//!
//! Used by update checks that compare an installed payload against the file
//! it was originally installed from.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::{Error, Result};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of raw bytes.
///
/// Returns a string in the canonical format `"sha256:<hex>"`.
pub fn compute_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the SHA-256 checksum of a file's contents.
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(compute_checksum(&content))
}

/// Whether two files have identical content.
pub fn files_match(a: &Path, b: &Path) -> Result<bool> {
    Ok(compute_file_checksum(a)? == compute_file_checksum(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_known_value() {
        assert_eq!(
            compute_checksum(b"hello world"),
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn files_match_detects_difference() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, "same").unwrap();
        std::fs::write(&b, "same").unwrap();
        assert!(files_match(&a, &b).unwrap());

        std::fs::write(&b, "different").unwrap();
        assert!(!files_match(&a, &b).unwrap());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = compute_file_checksum(Path::new("/nonexistent/payload.bin")).unwrap_err();
        assert_eq!(err.path(), Some(Path::new("/nonexistent/payload.bin")));
    }
}
