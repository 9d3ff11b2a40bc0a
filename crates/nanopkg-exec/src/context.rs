//! The executor's working set: config, pool, cache and the single active
//! destination a run targets (spec §9 `Context { config, pool,
//! status_store, cache }`).
//!
//! `status_store` has no dedicated type: `nanopkg_status::{load, write}`
//! are plain functions over a [`Dest`] and the pool, so this context just
//! tracks whether the active destination has been mutated since it was
//! loaded. Only one destination is targeted per run — in practice an opkg
//! installation has exactly one.

use nanopkg_cache::DownloadCache;
use nanopkg_config::{Config, Dest};
use nanopkg_pool::Pool;

/// The owned value every executor phase reads from and mutates.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub pool: Pool,
    pub cache: DownloadCache,
    pub dest: Dest,
    dirty: bool,
}

impl Context {
    #[must_use]
    pub fn new(config: Config, pool: Pool, cache: DownloadCache, dest: Dest) -> Self {
        Self {
            config,
            pool,
            cache,
            dest,
            dirty: false,
        }
    }

    /// Record that the installed repo changed and the status file needs
    /// rewriting (spec §4.4, §4.7 step 6).
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
