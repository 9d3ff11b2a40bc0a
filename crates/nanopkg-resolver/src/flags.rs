//! Solver flags threaded alongside a [`crate::Job`] (spec §4.6).

use nanopkg_config::Config;

/// Flags controlling preprocessing and job rewriting (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverFlags {
    pub install_recommends: bool,
    pub ignore_recommends: bool,
    pub force_depends: bool,
    pub force_reinstall: bool,
    pub cleandeps: bool,
    pub interactive: bool,
}

impl SolverFlags {
    /// Derive the solver flags carried by `config`, with `cleandeps`
    /// (autoremove) off by default — callers opt in per job via
    /// [`Self::with_cleandeps`].
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            install_recommends: config.install_recommends,
            ignore_recommends: config.ignore_recommends,
            force_depends: config.force_depends,
            force_reinstall: config.force_reinstall,
            cleandeps: false,
            interactive: config.interactive,
        }
    }

    #[must_use]
    pub fn with_cleandeps(mut self, cleandeps: bool) -> Self {
        self.cleandeps = cleandeps;
        self
    }

    /// Recommends are promoted to hard requires only when desired at all
    /// (spec §4.6 preprocessing step 2).
    #[must_use]
    pub fn promote_recommends(self) -> bool {
        self.install_recommends && !self.ignore_recommends
    }
}
