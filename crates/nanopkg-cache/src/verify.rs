//! Package checksum and detached-signature verification (spec §4.5).

use std::fs;
use std::path::Path;

use nanopkg_config::SignatureMode;
use nanopkg_core::{Error, Result};
use sequoia_openpgp::parse::stream::{
    DetachedVerifierBuilder, MessageLayer, MessageStructure, VerificationHelper,
};
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::policy::StandardPolicy;
use sequoia_openpgp::{Cert, KeyHandle};
use md5::Digest as _;
use sha2::Digest as Sha2Digest;

/// The checksums a solvable declares for its download (spec §3). At least
/// one of the two is expected to be present for any real package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checksums {
    pub md5: Option<String>,
    pub sha256: Option<String>,
}

/// Verify every checksum `expected` declares against the bytes at `path`.
/// On any mismatch the file is left for the caller to unlink (spec §4.5
/// "the corrupt file is unlinked and the fetch is reported as failed").
pub fn verify_checksums(path: &Path, expected: &Checksums) -> Result<()> {
    let data = fs::read(path).map_err(|e| Error::filesystem(path, e))?;

    if let Some(want) = &expected.md5 {
        let mut hasher = md5::Md5::new();
        hasher.update(&data);
        let got = format!("{:x}", hasher.finalize());
        if !got.eq_ignore_ascii_case(want) {
            return Err(Error::verification(
                path,
                format!("MD5 mismatch: expected {want}, got {got}"),
            ));
        }
    }
    if let Some(want) = &expected.sha256 {
        let mut hasher = sha2::Sha256::new();
        hasher.update(&data);
        let got = hex::encode(hasher.finalize());
        if !got.eq_ignore_ascii_case(want) {
            return Err(Error::verification(
                path,
                format!("SHA-256 mismatch: expected {want}, got {got}"),
            ));
        }
    }
    Ok(())
}

/// Verify a detached OpenPGP signature (`.sig`/`.asc`, spec §4.5) over
/// `data` against any key in `keyring`.
pub fn verify_signature(
    data: &[u8],
    signature: &[u8],
    keyring: &Path,
    mode: SignatureMode,
) -> Result<()> {
    if mode == SignatureMode::None {
        return Ok(());
    }
    let policy = StandardPolicy::new();
    let certs = Cert::from_file(keyring)
        .map_err(|e| Error::verification(keyring, format!("failed to load keyring: {e}")))?;

    let helper = KeyringHelper { certs: vec![certs] };
    let mut verifier = DetachedVerifierBuilder::from_bytes(signature)
        .map_err(|e| Error::verification(keyring, format!("malformed signature: {e}")))?
        .with_policy(&policy, None, helper)
        .map_err(|e| Error::verification(keyring, format!("failed to start verification: {e}")))?;
    verifier
        .verify_bytes(data)
        .map_err(|e| Error::verification(keyring, format!("signature verification failed: {e}")))
}

struct KeyringHelper {
    certs: Vec<Cert>,
}

impl VerificationHelper for KeyringHelper {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> sequoia_openpgp::Result<Vec<Cert>> {
        Ok(self.certs.clone())
    }

    fn check(&mut self, structure: MessageStructure) -> sequoia_openpgp::Result<()> {
        for layer in structure.into_iter() {
            if let MessageLayer::SignatureGroup { results } = layer {
                if results.into_iter().any(|r| r.is_ok()) {
                    return Ok(());
                }
            }
        }
        Err(anyhow::anyhow!("no valid signature found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.ipk");
        fs::write(&path, b"hello").unwrap();
        let expected = Checksums {
            md5: None,
            sha256: Some("0".repeat(64)),
        };
        assert!(verify_checksums(&path, &expected).is_err());
    }

    #[test]
    fn matching_sha256_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.ipk");
        fs::write(&path, b"hello").unwrap();
        let mut hasher = sha2::Sha256::new();
        hasher.update(b"hello");
        let digest = hex::encode(hasher.finalize());
        let expected = Checksums {
            md5: None,
            sha256: Some(digest),
        };
        assert!(verify_checksums(&path, &expected).is_ok());
    }

    #[test]
    fn no_declared_checksums_always_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.ipk");
        fs::write(&path, b"hello").unwrap();
        assert!(verify_checksums(&path, &Checksums::default()).is_ok());
    }
}
