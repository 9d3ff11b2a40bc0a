//! The apply phase: unpack/erase each step and update the installed repo
//! (spec §4.7 step 4, §4.10).

use std::path::{Path, PathBuf};

use ahash::{AHashMap, AHashSet};
use md5::Digest as _;

use nanopkg_archive::PackageArchive;
use nanopkg_core::{Error, Result};
use nanopkg_intercept::InterceptRunner;
use nanopkg_pool::{Flag, PackageState, SolvableId, Status, Want};
use nanopkg_resolver::{Step, StepKind, Transaction};

use crate::context::Context;

/// Maintainer scripts kept under `info_dir` so they remain available for a
/// later erase, after the archive itself is gone (spec §4.4, §4.8; mirrors
/// real opkg's `<pkg>.postinst`-style info-dir layout).
const MAINTAINER_SCRIPTS: [&str; 4] = ["preinst", "postinst", "prerm", "postrm"];

/// Outcome of applying one step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub solvable: SolvableId,
    pub name: String,
    pub kind: StepKind,
    pub ok: bool,
}

/// Walk `txn`'s steps in order, unpacking/erasing each and updating the
/// installed repo (spec §4.7 step 4). A step's own failure is recorded in
/// its [`StepOutcome`] and does not stop the remaining steps.
///
/// `requested` marks solvables the user named directly (as opposed to
/// pulled in as a dependency): installs outside this set are flagged
/// auto-installed (spec §3 `Flag::User`, §9.1 decision 1).
///
/// The status file is rewritten after every step that touched the
/// installed repo, not just once at the end: a step is "the smallest
/// atomic unit visible to the status file" (spec §5), and a process killed
/// between two steps must still see the prefix that already completed
/// (spec §8 "Transaction atomicity surrogate").
///
/// # Errors
/// Returns `Err` for a programming-contract violation (an `Install`/
/// `Upgraded`-family step with no resolved archive path) or if the
/// per-step status rewrite itself fails. Package-level step failures are
/// reported through the returned outcomes instead.
pub fn apply_phase(
    ctx: &mut Context,
    txn: &Transaction,
    archives: &AHashMap<SolvableId, PathBuf>,
    requested: &AHashSet<SolvableId>,
    intercept: &InterceptRunner,
    force_maintainer: bool,
) -> Result<Vec<StepOutcome>> {
    let mut outcomes = Vec::with_capacity(txn.steps.len());
    for step in txn.iter() {
        let outcome = apply_step(ctx, step, archives, requested, intercept, force_maintainer)?;
        if ctx.is_dirty() {
            nanopkg_status::write(&ctx.dest, &ctx.pool)?;
        }
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

fn apply_step(
    ctx: &mut Context,
    step: &Step,
    archives: &AHashMap<SolvableId, PathBuf>,
    requested: &AHashSet<SolvableId>,
    intercept: &InterceptRunner,
    force_maintainer: bool,
) -> Result<StepOutcome> {
    let name = ctx.pool.solvable(step.solvable).name.clone();
    let ok = match step.kind {
        StepKind::Install | StepKind::MultiInstall => {
            let path = archives.get(&step.solvable).ok_or_else(|| {
                Error::filesystem(Path::new(&name), std::io::Error::other("no resolved archive for install step"))
            })?;
            unpack_install(ctx, step.solvable, path, requested.contains(&step.solvable))
        }
        StepKind::Upgraded | StepKind::Downgraded | StepKind::Reinstalled | StepKind::Changed => {
            let path = archives.get(&step.solvable).ok_or_else(|| {
                Error::filesystem(Path::new(&name), std::io::Error::other("no resolved archive for upgrade step"))
            })?;
            let obsoletes = step.obsoletes.ok_or_else(|| {
                Error::filesystem(Path::new(&name), std::io::Error::other("upgrade step has no obsoleted solvable"))
            })?;
            unpack_upgrade(ctx, step.solvable, obsoletes, path, requested.contains(&step.solvable), force_maintainer)
        }
        StepKind::Erase => erase(ctx, step.solvable, intercept),
    };

    let ok = match ok {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(package = %name, error = %e, "transaction step failed");
            false
        }
    };
    Ok(StepOutcome {
        solvable: step.solvable,
        name,
        kind: step.kind,
        ok,
    })
}

fn unpack_install(ctx: &mut Context, candidate: SolvableId, archive_path: &Path, requested: bool) -> Result<()> {
    let root_dir = ctx.dest.root_dir.clone();
    let info_dir = ctx.dest.info_dir.clone();
    let mut installed = ctx.pool.solvable(candidate).clone();
    let name = installed.name.clone();

    let result = (|| -> Result<()> {
        let archive = PackageArchive::open(archive_path)?;
        let rel_paths = archive.unpack_data(&root_dir)?;
        let abs_paths: Vec<PathBuf> = rel_paths.iter().map(|p| root_dir.join(p)).collect();
        nanopkg_status::list::write_list_file(&info_dir, &name, &abs_paths)?;
        write_control(&info_dir, &name, &archive)?;
        extract_maintainer_scripts(&archive, &info_dir, &name)?;

        let declared = archive.conffiles()?;
        installed.conffiles = compute_conffiles(&declared)?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            installed.repo = ctx.pool.installed_repo();
            installed.state = Some(PackageState {
                want: Want::Install,
                flag: user_flag(requested),
                status: Status::Unpacked,
            });
            ctx.pool.add_installed(installed);
            ctx.mark_dirty();
            Ok(())
        }
        Err(e) => {
            installed.repo = ctx.pool.installed_repo();
            installed.state = Some(PackageState {
                want: Want::Install,
                flag: user_flag(requested),
                status: Status::HalfInstalled,
            });
            ctx.pool.add_installed(installed);
            ctx.mark_dirty();
            Err(e)
        }
    }
}

fn unpack_upgrade(
    ctx: &mut Context,
    candidate: SolvableId,
    obsoletes: SolvableId,
    archive_path: &Path,
    requested: bool,
    force_maintainer: bool,
) -> Result<()> {
    let root_dir = ctx.dest.root_dir.clone();
    let info_dir = ctx.dest.info_dir.clone();
    let old = ctx.pool.solvable(obsoletes).clone();
    let mut installed = ctx.pool.solvable(candidate).clone();
    let name = installed.name.clone();
    let old_flag = old.state.map(|s| s.flag).unwrap_or_default();
    let preserve_user = old_flag.contains(Flag::User) || requested;

    let result = (|| -> Result<()> {
        let old_paths = nanopkg_status::list::read_list_file(&info_dir, &name).unwrap_or_default();

        let archive = PackageArchive::open(archive_path)?;
        let declared = archive.conffiles()?;
        let preserved = if force_maintainer {
            AHashMap::default()
        } else {
            snapshot_modified_conffiles(&declared, &old.conffiles)?
        };

        let rel_paths = archive.unpack_data(&root_dir)?;
        let new_paths: Vec<PathBuf> = rel_paths.iter().map(|p| root_dir.join(p)).collect();

        for (path, original_bytes) in &preserved {
            let side_path = side_by_side_path(path);
            if let Some(parent) = side_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
            }
            let new_bytes = std::fs::read(path).map_err(|e| Error::filesystem(path, e))?;
            std::fs::write(&side_path, &new_bytes).map_err(|e| Error::filesystem(&side_path, e))?;
            std::fs::write(path, original_bytes).map_err(|e| Error::filesystem(path, e))?;
        }

        let new_set: AHashSet<&PathBuf> = new_paths.iter().collect();
        for old_path in &old_paths {
            if !new_set.contains(old_path) && old_path.is_file() {
                let _ = std::fs::remove_file(old_path);
            }
        }

        nanopkg_status::list::write_list_file(&info_dir, &name, &new_paths)?;
        write_control(&info_dir, &name, &archive)?;
        extract_maintainer_scripts(&archive, &info_dir, &name)?;

        installed.conffiles = compute_conffiles(&declared)?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            installed.repo = ctx.pool.installed_repo();
            installed.state = Some(PackageState {
                want: Want::Install,
                flag: user_flag(preserve_user),
                status: Status::Unpacked,
            });
            ctx.pool.add_installed(installed);
            ctx.mark_dirty();
            Ok(())
        }
        Err(e) => {
            installed.repo = ctx.pool.installed_repo();
            installed.state = Some(PackageState {
                want: Want::Install,
                flag: user_flag(preserve_user),
                status: Status::HalfInstalled,
            });
            ctx.pool.add_installed(installed);
            ctx.mark_dirty();
            Err(e)
        }
    }
}

fn erase(ctx: &mut Context, installed_id: SolvableId, intercept: &InterceptRunner) -> Result<()> {
    let info_dir = ctx.dest.info_dir.clone();
    let root_dir_str = ctx.dest.root_dir.display().to_string();
    let mut solvable = ctx.pool.solvable(installed_id).clone();
    let name = solvable.name.clone();

    let result = (|| -> Result<()> {
        let prerm = info_dir.join(format!("{name}.prerm"));
        if prerm.is_file() {
            let status = intercept.run_script(&name, "remove", &prerm, &[("PKG_ROOT", &root_dir_str)])?;
            if !status.success() {
                return Err(Error::script(&name, "prerm", format!("exited with {status}")));
            }
        }

        let paths = nanopkg_status::list::read_list_file(&info_dir, &name).unwrap_or_default();
        let conffile_paths: AHashSet<&PathBuf> = solvable.conffiles.iter().map(|(p, _)| p).collect();
        for path in &paths {
            if conffile_paths.contains(path) {
                continue;
            }
            if path.is_file() || path.is_symlink() {
                let _ = std::fs::remove_file(path);
            }
        }

        let postrm = info_dir.join(format!("{name}.postrm"));
        if postrm.is_file() {
            let status = intercept.run_script(&name, "remove", &postrm, &[("PKG_ROOT", &root_dir_str)])?;
            if !status.success() {
                return Err(Error::script(&name, "postrm", format!("exited with {status}")));
            }
        }

        nanopkg_status::list::remove_info_files(&info_dir, &name)?;
        for script in MAINTAINER_SCRIPTS {
            let path = info_dir.join(format!("{name}.{script}"));
            let _ = std::fs::remove_file(path);
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            if solvable.conffiles.is_empty() {
                ctx.pool.remove_installed(installed_id);
            } else {
                solvable.state = Some(PackageState {
                    want: Want::Deinstall,
                    flag: solvable.state.map(|s| s.flag).unwrap_or_default(),
                    status: Status::ConfigFiles,
                });
                ctx.pool.add_installed(solvable);
            }
            ctx.mark_dirty();
            Ok(())
        }
        Err(e) => {
            solvable.state = Some(PackageState {
                want: Want::Deinstall,
                flag: solvable.state.map(|s| s.flag).unwrap_or_default(),
                status: Status::RemovalFailed,
            });
            ctx.pool.add_installed(solvable);
            ctx.mark_dirty();
            Err(e)
        }
    }
}

fn user_flag(is_user: bool) -> nanopkg_pool::FlagSet {
    let mut flags = nanopkg_pool::FlagSet::empty();
    if is_user {
        flags.insert(Flag::User);
    }
    flags.insert(Flag::Changed);
    flags
}

fn write_control(info_dir: &Path, name: &str, archive: &PackageArchive) -> Result<()> {
    let stanza = archive.control_stanza()?;
    let path = nanopkg_status::list::control_path(info_dir, name);
    std::fs::create_dir_all(info_dir).map_err(|e| Error::filesystem(info_dir, e))?;
    std::fs::write(&path, stanza).map_err(|e| Error::filesystem(&path, e))
}

fn extract_maintainer_scripts(archive: &PackageArchive, info_dir: &Path, name: &str) -> Result<()> {
    std::fs::create_dir_all(info_dir).map_err(|e| Error::filesystem(info_dir, e))?;
    for script in MAINTAINER_SCRIPTS {
        let dest = info_dir.join(format!("{name}.{script}"));
        let _ = std::fs::remove_file(&dest);
        archive.extract_maintainer_script(script, &dest)?;
    }
    Ok(())
}

/// For every conffile the new package declares that the old package also
/// declared, snapshot the on-disk bytes when the recorded installed MD5 no
/// longer matches what's on disk (the user edited it) — spec §4.7, §8
/// scenario 2.
fn snapshot_modified_conffiles(
    declared: &[PathBuf],
    old_conffiles: &[(PathBuf, String)],
) -> Result<AHashMap<PathBuf, Vec<u8>>> {
    let mut out = AHashMap::default();
    for path in declared {
        let Some((_, old_md5)) = old_conffiles.iter().find(|(p, _)| p == path) else {
            continue;
        };
        if !path.is_file() {
            continue;
        }
        let bytes = std::fs::read(path).map_err(|e| Error::filesystem(path, e))?;
        if &md5_hex(&bytes) != old_md5 {
            out.insert(path.clone(), bytes);
        }
    }
    Ok(out)
}

/// `<path>-opkg`, the sibling the new version of a locally-modified
/// conffile is saved to (spec §8 scenario 2).
fn side_by_side_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("-opkg");
    PathBuf::from(name)
}

fn compute_conffiles(declared: &[PathBuf]) -> Result<Vec<(PathBuf, String)>> {
    let mut out = Vec::with_capacity(declared.len());
    for path in declared {
        let bytes = std::fs::read(path).map_err(|e| Error::filesystem(path, e))?;
        out.push((path.clone(), md5_hex(&bytes)));
    }
    Ok(out)
}

fn md5_hex(data: &[u8]) -> String {
    let mut hasher = md5::Md5::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
