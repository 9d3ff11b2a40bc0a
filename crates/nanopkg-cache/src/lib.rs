//! Content-addressed download cache rooted at `cache_dir` (spec §4.5).
//!
//! Wraps [`nanopkg_downloader::Downloader`] with cache-key derivation,
//! checksum/signature verification and the `file:` URL / `volatile_cache`
//! special cases, as a single on-disk tier rather than a multi-tier
//! hierarchy.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod key;
pub mod verify;

use std::path::{Path, PathBuf};

use nanopkg_config::SignatureMode;
use nanopkg_core::{Error, Result};
use nanopkg_downloader::Downloader;
use url::Url;
use verify::Checksums;

/// A download cache rooted at `cache_dir` (spec §4.5).
#[derive(Debug, Clone)]
pub struct DownloadCache {
    cache_dir: PathBuf,
    cache_local_files: bool,
    volatile: bool,
    downloader: Downloader,
}

impl DownloadCache {
    /// Build a cache rooted at `cache_dir`.
    #[must_use]
    pub fn new(
        cache_dir: PathBuf,
        cache_local_files: bool,
        volatile: bool,
        downloader: Downloader,
    ) -> Self {
        Self {
            cache_dir,
            cache_local_files,
            volatile,
            downloader,
        }
    }

    /// The on-disk path a cache entry for `url` would live at, regardless
    /// of whether it currently exists.
    #[must_use]
    pub fn entry_path(&self, url: &Url) -> PathBuf {
        self.cache_dir.join(key::cache_key(url))
    }

    /// Fetch `url`, returning the local path of the verified file
    /// (spec §4.5).
    ///
    /// A cache hit whose contents still match `expected` is returned
    /// without re-fetching. Otherwise the file is downloaded, verified and
    /// stored (or, under `volatile_cache`, downloaded straight to `dest`
    /// and never retained). `file:` URLs are hard-linked or copied
    /// depending on `cache_local_files`, never passed to the HTTP backend.
    ///
    /// # Errors
    /// Returns a `VerificationError` if the fetched (or pre-existing)
    /// file fails checksum verification, or a `NetworkError`/
    /// `FilesystemError` if the fetch/copy itself fails.
    pub async fn fetch(&self, url: &Url, expected: &Checksums, dest: &Path) -> Result<PathBuf> {
        if url.scheme() == "file" {
            return self.fetch_local(url, expected, dest);
        }

        if self.volatile {
            let bytes = self.downloader.fetch(url).await?;
            std::fs::write(dest, &bytes).map_err(|e| Error::filesystem(dest, e))?;
            if let Err(e) = verify::verify_checksums(dest, expected) {
                let _ = std::fs::remove_file(dest);
                return Err(e);
            }
            return Ok(dest.to_path_buf());
        }

        let entry = self.entry_path(url);
        if entry.is_file() && verify::verify_checksums(&entry, expected).is_ok() {
            return Ok(entry);
        }

        let bytes = self.downloader.fetch(url).await?;
        if let Some(parent) = entry.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
        }
        std::fs::write(&entry, &bytes).map_err(|e| Error::filesystem(&entry, e))?;
        if let Err(e) = verify::verify_checksums(&entry, expected) {
            let _ = std::fs::remove_file(&entry);
            return Err(e);
        }
        Ok(entry)
    }

    fn fetch_local(&self, url: &Url, expected: &Checksums, dest: &Path) -> Result<PathBuf> {
        let source = url
            .to_file_path()
            .map_err(|()| Error::network(url.as_str(), "malformed file: URL"))?;

        if self.volatile {
            copy_or_link(&source, dest, self.cache_local_files)?;
            if let Err(e) = verify::verify_checksums(dest, expected) {
                let _ = std::fs::remove_file(dest);
                return Err(e);
            }
            return Ok(dest.to_path_buf());
        }

        let entry = self.entry_path(url);
        if entry.is_file() && verify::verify_checksums(&entry, expected).is_ok() {
            return Ok(entry);
        }
        if let Some(parent) = entry.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
        }
        let _ = std::fs::remove_file(&entry);
        copy_or_link(&source, &entry, self.cache_local_files)?;
        if let Err(e) = verify::verify_checksums(&entry, expected) {
            let _ = std::fs::remove_file(&entry);
            return Err(e);
        }
        Ok(entry)
    }

    /// Fetch and verify a detached signature for `url`'s already-downloaded
    /// bytes, per `mode` (spec §4.5). `<url>.sig` is used for
    /// [`SignatureMode::GpgSig`], `<url>.asc` for [`SignatureMode::GpgAsc`].
    ///
    /// # Errors
    /// Returns a `VerificationError` on a missing, malformed or invalid
    /// signature, or the underlying network error if the signature itself
    /// cannot be fetched.
    pub async fn verify_signature(
        &self,
        url: &Url,
        data: &[u8],
        keyring: &Path,
        mode: SignatureMode,
    ) -> Result<()> {
        let suffix = match mode {
            SignatureMode::None => return Ok(()),
            SignatureMode::GpgSig => ".sig",
            SignatureMode::GpgAsc => ".asc",
        };
        let sig_url = Url::parse(&format!("{url}{suffix}"))
            .map_err(|e| Error::network(url.as_str(), e.to_string()))?;
        let signature = self.downloader.fetch(&sig_url).await?;
        verify::verify_signature(data, &signature, keyring, mode)
    }
}

fn copy_or_link(source: &Path, dest: &Path, hard_link: bool) -> Result<()> {
    if hard_link {
        if std::fs::hard_link(source, dest).is_ok() {
            return Ok(());
        }
    }
    std::fs::copy(source, dest)
        .map(|_| ())
        .map_err(|e| Error::filesystem(dest, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanopkg_config::ProxyConfig;

    fn downloader() -> Downloader {
        Downloader::new(&ProxyConfig::default(), 1, 1).unwrap()
    }

    fn sha256(data: &[u8]) -> String {
        use sha2::Digest as _;
        let mut hasher = sha2::Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    #[tokio::test]
    async fn file_url_is_hard_linked_into_cache() {
        let src_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("pkg.ipk");
        std::fs::write(&source, b"hello").unwrap();

        let cache = DownloadCache::new(
            cache_dir.path().to_path_buf(),
            true,
            false,
            downloader(),
        );
        let url = Url::from_file_path(&source).unwrap();
        let expected = Checksums {
            md5: None,
            sha256: Some(sha256(b"hello")),
        };
        let dest = out_dir.path().join("unused.ipk");
        let path = cache.fetch(&url, &expected, &dest).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert!(path.starts_with(cache_dir.path()));
    }

    #[tokio::test]
    async fn volatile_cache_downloads_straight_to_dest_and_is_not_retained() {
        let src_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("pkg.ipk");
        std::fs::write(&source, b"world").unwrap();

        let cache = DownloadCache::new(cache_dir.path().to_path_buf(), false, true, downloader());
        let url = Url::from_file_path(&source).unwrap();
        let expected = Checksums {
            md5: None,
            sha256: Some(sha256(b"world")),
        };
        let dest = out_dir.path().join("pkg.ipk");
        let path = cache.fetch(&url, &expected, &dest).await.unwrap();
        assert_eq!(path, dest);
        assert!(std::fs::read_dir(cache_dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn cache_hit_short_circuits_without_refetch() {
        let src_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("pkg.ipk");
        std::fs::write(&source, b"cached").unwrap();

        let cache = DownloadCache::new(cache_dir.path().to_path_buf(), false, false, downloader());
        let url = Url::from_file_path(&source).unwrap();
        let expected = Checksums {
            md5: None,
            sha256: Some(sha256(b"cached")),
        };
        let dest = out_dir.path().join("pkg.ipk");
        let first = cache.fetch(&url, &expected, &dest).await.unwrap();

        // Remove the source; a cache hit must not need to read it again.
        std::fs::remove_file(&source).unwrap();
        let second = cache.fetch(&url, &expected, &dest).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn checksum_mismatch_unlinks_the_fetched_file() {
        let src_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("pkg.ipk");
        std::fs::write(&source, b"tampered").unwrap();

        let cache = DownloadCache::new(cache_dir.path().to_path_buf(), false, false, downloader());
        let url = Url::from_file_path(&source).unwrap();
        let expected = Checksums {
            md5: None,
            sha256: Some("0".repeat(64)),
        };
        let dest = out_dir.path().join("pkg.ipk");
        assert!(cache.fetch(&url, &expected, &dest).await.is_err());
        assert!(!cache.entry_path(&url).exists());
    }
}
