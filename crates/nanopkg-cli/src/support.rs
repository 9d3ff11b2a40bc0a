//! Shared setup shared by every subcommand: config loading, the advisory
//! destination lock, and the `Context` a run operates against (spec §9
//! `Context`, §5 locking).

use std::fs::File;
use std::path::PathBuf;

use fs2::FileExt;
use nanopkg_cache::DownloadCache;
use nanopkg_config::Config;
use nanopkg_core::{Error, Result};
use nanopkg_downloader::Downloader;
use nanopkg_exec::Context;
use nanopkg_pool::Pool;
use nanopkg_repository::RepositoryLoader;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

/// Holds the advisory lock on a destination's `usr/lib/opkg/lock` for the
/// lifetime of a mutating run; released on drop.
pub struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

/// Install a `tracing-subscriber` filter from the global `-v`/`-q` counts
/// (spec §10).
pub fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Load and validate configuration, applying the CLI's global overrides
/// (spec §11, §6 global flags).
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = nanopkg_config::load(cli.config.as_deref())?;
    if let Some(root) = &cli.offline_root {
        config.offline_root = Some(root.clone());
    }
    if cli.force_depends {
        config.force_depends = true;
    }
    if cli.force_reinstall {
        config.force_reinstall = true;
    }
    if cli.batch {
        config.interactive = false;
    }
    nanopkg_config::validate(&config)?;
    Ok(config)
}

/// Acquire the destination's advisory lock (spec §5 "a single writer at a
/// time"). Held for the duration of a mutating command.
pub fn lock_destination(config: &Config) -> Result<LockGuard> {
    let path = config.rooted(&config.lock_file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
    }
    let file = File::create(&path).map_err(|e| Error::filesystem(&path, e))?;
    file.try_lock_exclusive().map_err(|e| {
        Error::config_with(
            format!("another nanopkg run holds the lock at {}: {e}", path.display()),
            vec!["Wait for the other run to finish, or remove a stale lock file".to_string()],
        )
    })?;
    Ok(LockGuard(file))
}

/// Build the pool (every configured repo plus the installed repo) and the
/// `Context` a subcommand operates against (spec §9).
pub async fn build_context(config: Config) -> Result<Context> {
    let dest = config
        .default_dest()
        .cloned()
        .ok_or_else(|| Error::config("no destination configured"))?;

    let mut pool = Pool::new();
    let archs: Vec<(String, u32)> = config
        .sorted_architectures()
        .into_iter()
        .map(|a| (a.name, a.priority))
        .collect();
    pool.set_architectures(&archs);

    let downloader = Downloader::new(&config.proxy, config.download_parallelism, config.max_retries)?;
    let loader = RepositoryLoader::new(&config, &downloader);
    loader.load(&mut pool)?;
    nanopkg_status::load(&dest, &mut pool)?;
    pool.create_whatprovides();

    let cache_dir: PathBuf = config.rooted(&config.cache_dir);
    let cache = DownloadCache::new(cache_dir, config.cache_local_files, config.volatile_cache, downloader);
    Ok(Context::new(config, pool, cache, dest))
}
