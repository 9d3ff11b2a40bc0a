//! The repository loader: fetch `Release`/`Packages` into `lists_dir`
//! (`update`) and ingest the cached indices into a [`Pool`] (`load`),
//! spec §4.3.

use std::path::{Path, PathBuf};

use sha2::Digest as _;

use nanopkg_config::{Architecture, Config, SignatureMode, Src};
use nanopkg_core::{parse_many, Error, Result};
use nanopkg_downloader::Downloader;
use nanopkg_pool::Pool;
use url::Url;

use crate::{index, release};

/// Outcome of [`RepositoryLoader::update`]: one source failing does not
/// abort the others (spec §4.3 "A failure for one dist increments a
/// failure counter; other dists proceed").
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub sources_updated: usize,
    pub sources_failed: usize,
    pub failures: Vec<(String, String)>,
}

impl UpdateReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.sources_failed == 0
    }
}

/// Fetches and ingests repository metadata for every configured source
/// (spec §4.3).
#[derive(Debug)]
pub struct RepositoryLoader<'a> {
    downloader: &'a Downloader,
    lists_dir: PathBuf,
    sources: &'a [Src],
    architectures: Vec<Architecture>,
}

impl<'a> RepositoryLoader<'a> {
    #[must_use]
    pub fn new(config: &'a Config, downloader: &'a Downloader) -> Self {
        Self {
            downloader,
            lists_dir: config.lists_dir.clone(),
            sources: &config.sources,
            architectures: config.sorted_architectures(),
        }
    }

    /// Refresh every configured source's cached indices under `lists_dir`
    /// (spec §4.3). Never returns `Err` for a single source's failure —
    /// failures accumulate in the returned [`UpdateReport`] instead, per
    /// the "aggregated failure count is the exit code" propagation policy
    /// (spec §7).
    pub async fn update(&self) -> UpdateReport {
        let mut report = UpdateReport::default();
        for src in self.sources {
            match self.update_source(src).await {
                Ok(()) => report.sources_updated += 1,
                Err(e) => {
                    report.sources_failed += 1;
                    report.failures.push((src.name().to_string(), e.to_string()));
                    tracing::warn!(source = src.name(), error = %e, "failed to update source");
                }
            }
        }
        report
    }

    async fn update_source(&self, src: &Src) -> Result<()> {
        match src {
            Src::Flat { name, url } => {
                let packages_url = Url::parse(&format!("{}/Packages", url.trim_end_matches('/')))
                    .map_err(|e| Error::config(format!("invalid source URL '{url}': {e}")))?;
                let bytes = self.downloader.fetch(&packages_url).await?;
                self.write_list(name, &bytes)
            }
            Src::Dist {
                name,
                signature_key,
                signature_mode,
                ..
            } => {
                let release_url = src
                    .release_url()
                    .ok_or_else(|| Error::config(format!("dist source '{name}' has no Release URL")))?;
                let release_url = Url::parse(&release_url)
                    .map_err(|e| Error::config(format!("invalid Release URL: {e}")))?;
                let release_bytes = self.downloader.fetch(&release_url).await?;

                if *signature_mode != SignatureMode::None {
                    let keyring = signature_key.as_ref().ok_or_else(|| {
                        Error::config(format!(
                            "dist source '{name}' requires a signature but has no signature_key"
                        ))
                    })?;
                    self.verify_release_signature(&release_url, &release_bytes, keyring, *signature_mode)
                        .await?;
                }

                let release_text = String::from_utf8_lossy(&release_bytes).into_owned();
                let parsed = release::parse(&release_text)?;
                let dist_root = format!("{}/dists/{name}/", src.url().trim_end_matches('/'));

                for component in src.expand(&self.architectures) {
                    if let Some(req_component) = &component.component {
                        if !parsed.components.contains(req_component) {
                            return Err(Error::config(format!(
                                "component '{req_component}' not present in Release for '{name}'"
                            )));
                        }
                    }
                    let packages_url = Url::parse(&component.packages_url)
                        .map_err(|e| Error::config(format!("invalid Packages URL: {e}")))?;
                    let bytes = self.downloader.fetch(&packages_url).await?;

                    let dist_relative = component
                        .packages_url
                        .strip_prefix(&dist_root)
                        .unwrap_or(&component.packages_url);
                    if let Some(declared) = parsed.file(dist_relative) {
                        verify_sha256(&bytes, &declared.sha256)?;
                    }

                    self.write_list(&component.lists_key, &bytes)?;
                }
                Ok(())
            }
        }
    }

    async fn verify_release_signature(
        &self,
        release_url: &Url,
        release_bytes: &[u8],
        keyring: &str,
        mode: SignatureMode,
    ) -> Result<()> {
        let suffix = match mode {
            SignatureMode::None => return Ok(()),
            SignatureMode::GpgSig => ".sig",
            SignatureMode::GpgAsc => ".asc",
        };
        let sig_url = Url::parse(&format!("{release_url}{suffix}"))
            .map_err(|e| Error::network(release_url.as_str(), e.to_string()))?;
        let signature = self.downloader.fetch(&sig_url).await?;
        nanopkg_cache::verify::verify_signature(release_bytes, &signature, Path::new(keyring), mode)
    }

    fn write_list(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.lists_dir.join(key);
        nanopkg_status::atomic::atomic_write(&path, bytes)
    }

    /// Parse every cached index under `lists_dir` into `pool`, one fresh
    /// repo per stored index (spec §4.3 "Load"). A solvable whose
    /// architecture is not in the configured arch table is dropped with a
    /// debug note rather than rejecting the whole index.
    pub fn load(&self, pool: &mut Pool) -> Result<()> {
        let mut entries: Vec<PathBuf> = match std::fs::read_dir(&self.lists_dir) {
            Ok(rd) => rd
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::filesystem(&self.lists_dir, e)),
        };
        entries.sort();

        for (priority, path) in entries.iter().enumerate() {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();
            let text = std::fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
            let repo = pool.add_repo(&name, (entries.len() - priority) as i64);

            for parsed in parse_many(&text) {
                let stanza = match parsed {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::warn!(index = %name, error = %e, "skipping malformed index stanza");
                        continue;
                    }
                };
                match index::stanza_to_solvable(&stanza, repo) {
                    Ok(solvable) => {
                        if !pool.is_known_architecture(&solvable.architecture) {
                            tracing::debug!(
                                index = %name,
                                package = %solvable.name,
                                arch = %solvable.architecture,
                                "dropping solvable with unconfigured architecture"
                            );
                            continue;
                        }
                        let _ = pool.add_solvable(repo, solvable);
                    }
                    Err(e) => {
                        tracing::warn!(index = %name, error = %e, "skipping malformed index stanza");
                    }
                }
            }
            pool.internalize(repo);
        }
        Ok(())
    }
}

fn verify_sha256(bytes: &[u8], expected: &str) -> Result<()> {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    let got = hex::encode(hasher.finalize());
    if got.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(Error::verification(
            "Packages",
            format!("SHA-256 mismatch against Release: expected {expected}, got {got}"),
        ))
    }
}
