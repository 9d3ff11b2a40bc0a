//! The download phase (spec §4.7 step 1-2).
//!
//! Resolves each step's archive to a local path: either a caller-supplied
//! local file (`--pkgs` given as a path on the command line, "provided by
//! hand") or a fetch through the [`nanopkg_cache::DownloadCache`] against
//! the base URL of the solvable's owning repo.

use std::path::PathBuf;

use ahash::AHashMap;
use url::Url;

use nanopkg_cache::verify::Checksums;
use nanopkg_core::{Error, Result};
use nanopkg_pool::SolvableId;
use nanopkg_resolver::{StepKind, Transaction};

use crate::context::Context;

/// Steps that introduce a new archive on disk and therefore need a
/// download (everything except a pure erase, spec §4.7 step 1).
fn needs_archive(kind: StepKind) -> bool {
    !matches!(kind, StepKind::Erase)
}

/// Per-`Src` base URL, keyed by the `lists_key` each solvable's owning
/// repo was loaded under (spec §4.3 `ExpandedSource::lists_key` ==
/// `RepositoryLoader::load`'s repo name).
#[must_use]
pub fn repo_base_urls(config: &nanopkg_config::Config) -> AHashMap<String, String> {
    let architectures = config.sorted_architectures();
    config
        .sources
        .iter()
        .flat_map(|src| src.expand(&architectures))
        .map(|expanded| (expanded.lists_key, expanded.base_url))
        .collect()
}

/// Resolve and fetch every step's archive, aborting before any mutation on
/// the first failure (spec §4.7 step 1 "Any failure aborts before any
/// mutation").
///
/// `local_archives` pre-supplies a local file path for a solvable that was
/// "provided by hand" on the command line; these are used as-is and never
/// touch the download cache.
///
/// # Errors
/// Returns the first `NetworkError`/`VerificationError`/`FilesystemError`
/// encountered resolving any step's archive.
pub async fn download_phase(
    ctx: &Context,
    txn: &Transaction,
    local_archives: &AHashMap<SolvableId, PathBuf>,
) -> Result<AHashMap<SolvableId, PathBuf>> {
    let base_urls = repo_base_urls(&ctx.config);
    let mut archives = AHashMap::default();

    for step in txn.iter() {
        if !needs_archive(step.kind) {
            continue;
        }
        if let Some(path) = local_archives.get(&step.solvable) {
            archives.insert(step.solvable, path.clone());
            continue;
        }

        let solvable = ctx.pool.solvable(step.solvable);
        let repo_name = &ctx.pool.repo(solvable.repo).name;
        let base_url = base_urls.get(repo_name).ok_or_else(|| {
            Error::config(format!(
                "no configured source owns repo '{repo_name}' (package '{}')",
                solvable.name
            ))
        })?;
        let url = Url::parse(&format!("{}/{}", base_url.trim_end_matches('/'), solvable.url))
            .map_err(|e| Error::config(format!("invalid package URL for '{}': {e}", solvable.name)))?;

        let checksums = Checksums {
            md5: solvable.md5.clone(),
            sha256: solvable.sha256.clone(),
        };
        let dest = ctx.cache.entry_path(&url);
        let path = ctx.cache.fetch(&url, &checksums, &dest).await?;
        archives.insert(step.solvable, path);
    }

    Ok(archives)
}
