//! The transaction executor: download, confirm, apply, configure and
//! persist a resolved [`nanopkg_resolver::Transaction`] (spec §4.7).

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod apply;
pub mod confirm;
pub mod configure;
pub mod context;
pub mod download;
pub mod persist;

use std::path::PathBuf;

use ahash::{AHashMap, AHashSet};

use nanopkg_core::Result;
use nanopkg_intercept::InterceptRunner;
use nanopkg_pool::SolvableId;
use nanopkg_resolver::Transaction;

pub use apply::StepOutcome;
pub use configure::ConfigureOutcome;
pub use context::Context;

/// Knobs the CLI threads into a run (spec §4.7, §6 global flags).
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Stop after the download phase (the `download` verb).
    pub download_only: bool,
    /// Packages named directly by the user, as opposed to pulled in by a
    /// dependency — used to set `Flag::User` on newly installed packages
    /// (spec §3).
    pub requested: AHashSet<SolvableId>,
    /// A solvable's archive already sitting on disk (a local file path
    /// given on the command line), skipping the download cache entirely
    /// (spec §4.7 step 1 "provided by hand").
    pub local_archives: AHashMap<SolvableId, PathBuf>,
    /// `--force-maintainer`: skip conffile preservation and always
    /// install the package's version (spec §6).
    pub force_maintainer: bool,
    /// Require an explicit `y` before applying (spec §4.7 step 3); `false`
    /// proceeds without prompting regardless of `Config.interactive`
    /// (`--noaction`/`-y` style non-interactive runs).
    pub interactive: bool,
}

/// What happened during a run, independent of whether it's reported as a
/// process success: apply- and configure-phase failures are recorded here
/// rather than raised, matching the "best-effort completion" propagation
/// policy (spec §7).
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub downloaded: usize,
    pub download_only: bool,
    pub steps: Vec<StepOutcome>,
    pub configured: Vec<ConfigureOutcome>,
    pub cancelled: bool,
}

impl ExecutionReport {
    /// Did every step and every configure action succeed? The CLI maps
    /// `false` to a non-zero exit code (spec §7).
    #[must_use]
    pub fn success(&self) -> bool {
        !self.cancelled && self.steps.iter().all(|s| s.ok) && self.configured.iter().all(|c| c.ok)
    }
}

/// Run a resolved transaction to completion: download, confirm, apply,
/// configure, persist (spec §4.7).
///
/// Returns `Ok` even when individual steps fail — see [`ExecutionReport::success`].
/// Only a download-phase failure or a cancelled confirmation returns
/// before any mutation, per spec §4.7 step 1/3.
///
/// # Errors
/// Returns the first `NetworkError`/`VerificationError`/`FilesystemError`
/// encountered resolving an archive in the download phase, or an error
/// activating the intercept runner.
pub async fn execute(ctx: &mut Context, txn: &Transaction, opts: &ExecuteOptions) -> Result<ExecutionReport> {
    if txn.is_empty() {
        return Ok(ExecutionReport::default());
    }

    let archives = download::download_phase(ctx, txn, &opts.local_archives).await?;
    if opts.download_only {
        return Ok(ExecutionReport {
            downloaded: archives.len(),
            download_only: true,
            ..Default::default()
        });
    }

    if !confirm::confirm(txn, &ctx.pool, opts.interactive)? {
        return Ok(ExecutionReport {
            cancelled: true,
            ..Default::default()
        });
    }

    let intercept = InterceptRunner::activate()?;
    let steps = apply::apply_phase(ctx, txn, &archives, &opts.requested, &intercept, opts.force_maintainer)?;
    let configured = configure::configure_phase(ctx, &intercept, None)?;
    let finalize = intercept.finalize()?;
    if !finalize.all_ok() {
        tracing::warn!(failed = finalize.failed.len(), "one or more intercept triggers failed");
    }

    persist::persist(ctx)?;

    Ok(ExecutionReport {
        downloaded: archives.len(),
        download_only: false,
        steps,
        configured,
        cancelled: false,
    })
}
