// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Update payload integrity: SHA-256 over the downloaded artifact.

use std::fs::File;
use std::path::{Path, PathBuf};

use printdesk_core::error::{PrintdeskError, Result};
use sha2::{Digest, Sha256};

/// SHA-256 of `data` as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// SHA-256 of a file, streamed so large installers are never held in memory.
pub async fn hash_file(path: &Path) -> Result<String> {
    let owned: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<String> {
        let mut file = File::open(&owned)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| PrintdeskError::UpdateFeed(format!("hashing aborted: {e}")))?
}

/// Check the artifact against the digest the feed advertised.
///
/// Comparison is case-insensitive since feeds differ in hex casing.
pub async fn verify_file(path: &Path, expected_hex: &str) -> Result<()> {
    let actual = hash_file(path).await?;
    if actual.eq_ignore_ascii_case(expected_hex.trim()) {
        Ok(())
    } else {
        Err(PrintdeskError::IntegrityMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256("hello"), verified against coreutils sha256sum.
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn hash_known_value() {
        assert_eq!(hash_bytes(b"hello"), HELLO_SHA256);
    }

    #[tokio::test]
    async fn file_hash_matches_bytes_hash() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"hello").unwrap();
        assert_eq!(hash_file(file.path()).await.unwrap(), HELLO_SHA256);
        verify_file(file.path(), &HELLO_SHA256.to_uppercase())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn mismatch_reports_both_digests() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"tampered").unwrap();
        match verify_file(file.path(), HELLO_SHA256).await {
            Err(PrintdeskError::IntegrityMismatch { expected, actual }) => {
                assert_eq!(expected, HELLO_SHA256);
                assert_eq!(actual, hash_bytes(b"tampered"));
            }
            other => panic!("expected IntegrityMismatch, got {other:?}"),
        }
    }
}
