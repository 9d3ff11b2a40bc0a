//! The configure phase: run `postinst configure` for every package left in
//! `unpacked` state (spec §4.7 step 5).
//!
//! Scanning the installed repo for `Status::Unpacked` rather than walking
//! the just-applied transaction also implements the standalone
//! `configure [pkgs]` verb (spec §6) and the "every already unpacked
//! installed solvable discovered at startup" resumption rule in one pass:
//! a package left unpacked by an interrupted prior run looks identical to
//! one this run just unpacked.

use nanopkg_core::Result;
use nanopkg_intercept::InterceptRunner;
use nanopkg_pool::{PackageState, SolvableId, Status};

use crate::context::Context;

/// Outcome of configuring one package.
#[derive(Debug, Clone)]
pub struct ConfigureOutcome {
    pub solvable: SolvableId,
    pub name: String,
    pub ok: bool,
}

/// Run `postinst configure` for every `Status::Unpacked` installed
/// package, optionally restricted to `only` (used by the standalone
/// `configure <pkgs>` verb; `None` configures everything pending).
///
/// The status file is rewritten after each package is configured, for the
/// same per-step crash-safety reason as the apply phase (spec §5, §8).
///
/// # Errors
/// Returns `Err` only if a per-step status rewrite fails. A script failure
/// is recorded per-package in the returned outcomes, matching the apply
/// phase's propagation policy.
pub fn configure_phase(
    ctx: &mut Context,
    intercept: &InterceptRunner,
    only: Option<&[String]>,
) -> Result<Vec<ConfigureOutcome>> {
    let pending: Vec<SolvableId> = ctx
        .pool
        .installed_ids()
        .filter(|&id| ctx.pool.solvable(id).state.map(|s| s.status) == Some(Status::Unpacked))
        .filter(|&id| match only {
            Some(names) => names.iter().any(|n| n == &ctx.pool.solvable(id).name),
            None => true,
        })
        .collect();

    let mut outcomes = Vec::with_capacity(pending.len());
    for id in pending {
        outcomes.push(configure_one(ctx, id, intercept));
        if ctx.is_dirty() {
            nanopkg_status::write(&ctx.dest, &ctx.pool)?;
        }
    }
    Ok(outcomes)
}

fn configure_one(ctx: &mut Context, id: SolvableId, intercept: &InterceptRunner) -> ConfigureOutcome {
    let name = ctx.pool.solvable(id).name.clone();
    let postinst = ctx.dest.info_dir.join(format!("{name}.postinst"));
    let root_dir_str = ctx.dest.root_dir.display().to_string();

    let ok = if postinst.is_file() {
        match intercept.run_script(&name, "configure", &postinst, &[("PKG_ROOT", &root_dir_str)]) {
            Ok(status) if status.success() => true,
            Ok(status) => {
                tracing::warn!(package = %name, %status, "postinst configure failed");
                false
            }
            Err(e) => {
                tracing::warn!(package = %name, error = %e, "postinst configure could not be run");
                false
            }
        }
    } else {
        true
    };

    let solvable = ctx.pool.solvable_mut(id);
    let state = solvable.state.unwrap_or_default();
    solvable.state = Some(PackageState {
        status: if ok { Status::Installed } else { Status::HalfConfigured },
        ..state
    });
    ctx.mark_dirty();

    ConfigureOutcome { solvable: id, name, ok }
}
