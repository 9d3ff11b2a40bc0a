//! The intercept/script runner (spec §4.8).
//!
//! Maintainer scripts may call well-known system utilities (`ldconfig`,
//! `depmod`, `update-alternatives`, ...). Rather than let them run for
//! real during a transaction, a shimmed `PATH` entry intercepts those
//! calls: each shim just records that it was invoked (with its
//! arguments) into a per-transaction `statedir`, and the real work is
//! coalesced and run exactly once when the transaction finishes
//! (`finalize`).

use std::ffi::OsString;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

use nanopkg_core::{Error, Result};

use crate::report::FinalizeReport;

/// Utilities a maintainer script is expected to call that this runner
/// intercepts (spec §4.8 "e.g. ldconfig, depmod, update-alternatives").
const INTERCEPTED_UTILITIES: &[&str] = &["ldconfig", "depmod", "update-alternatives"];

/// Enforces spec §5 "the intercept state dir is owned by one intercept
/// context at a time; nested contexts are disallowed."
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// The environment variable exported to maintainer scripts naming the
/// current `statedir` (spec §4.8 step 3).
pub const INTERCEPT_DIR_VAR: &str = "OPKG_INTERCEPT_DIR";

/// A live intercept context: an active `statedir` and a `PATH` that has
/// been prepended with shim scripts for [`INTERCEPTED_UTILITIES`] (spec
/// §4.8).
#[derive(Debug)]
pub struct InterceptRunner {
    statedir: tempfile::TempDir,
    shim_dir: tempfile::TempDir,
    saved_path: Option<OsString>,
    finalized: bool,
}

impl InterceptRunner {
    /// Create the `statedir`, generate the shim scripts, prepend them to
    /// `PATH`, and export `OPKG_INTERCEPT_DIR` (spec §4.8 steps 1-3).
    ///
    /// # Errors
    /// Returns a `FilesystemError` if the temp directories cannot be
    /// created or the shim scripts cannot be written. Returns a
    /// `ScriptError` if another context is already active.
    pub fn activate() -> Result<Self> {
        if ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(Error::script(
                "intercept",
                "activate",
                "an intercept context is already active (nested contexts are disallowed)",
            ));
        }

        let statedir = tempfile::Builder::new()
            .prefix("nanopkg-intercept-state-")
            .tempdir()
            .map_err(|e| {
                ACTIVE.store(false, Ordering::SeqCst);
                Error::filesystem(std::env::temp_dir(), e)
            })?;
        let shim_dir = tempfile::Builder::new()
            .prefix("nanopkg-intercept-bin-")
            .tempdir()
            .map_err(|e| {
                ACTIVE.store(false, Ordering::SeqCst);
                Error::filesystem(std::env::temp_dir(), e)
            })?;

        for utility in INTERCEPTED_UTILITIES {
            if let Err(e) = write_shim(shim_dir.path(), utility) {
                ACTIVE.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        let saved_path = std::env::var_os("PATH");
        let mut new_path = OsString::from(shim_dir.path());
        if let Some(existing) = &saved_path {
            new_path.push(":");
            new_path.push(existing);
        }
        // SAFETY: this process is single-threaded cooperative per spec §5;
        // no concurrent reader can observe a torn environment variable here.
        #[allow(unsafe_code)]
        unsafe {
            std::env::set_var("PATH", &new_path);
            std::env::set_var(INTERCEPT_DIR_VAR, statedir.path());
        }

        Ok(Self {
            statedir,
            shim_dir,
            saved_path,
            finalized: false,
        })
    }

    /// The `statedir` maintainer scripts see via `OPKG_INTERCEPT_DIR`.
    #[must_use]
    pub fn statedir(&self) -> &Path {
        self.statedir.path()
    }

    /// Run one maintainer script phase under this context (spec §4.8
    /// step 4). `script` is the path to the maintainer script; `phase`
    /// (e.g. `"configure"`, `"remove"`) is passed as its first argument,
    /// matching the Debian maintainer-script calling convention.
    ///
    /// # Errors
    /// Returns a `ScriptError` if the script cannot be spawned.
    pub fn run_script(&self, pkg: &str, phase: &str, script: &Path, env: &[(&str, &str)]) -> Result<ExitStatus> {
        let mut cmd = Command::new(script);
        cmd.arg(phase);
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.status()
            .map_err(|e| Error::script(pkg, phase, format!("failed to run {}: {e}", script.display())))
    }

    /// Restore `PATH`, run every queued trigger once, and remove the
    /// `statedir` (spec §4.8 steps 5-6, §9.1 decision 2).
    ///
    /// A missing or unreadable `statedir` at this point is a precondition
    /// failure (the context's own setup is broken) and returns `Err`
    /// immediately, not recorded in a report. A failing individual
    /// trigger is recorded in the returned [`FinalizeReport`] and does not
    /// stop the remaining triggers.
    ///
    /// # Errors
    /// Returns a `FilesystemError` if `statedir` cannot be read.
    pub fn finalize(mut self) -> Result<FinalizeReport> {
        self.restore_path();
        self.finalized = true;

        let mut report = FinalizeReport::default();
        let entries = fs::read_dir(self.statedir.path())
            .map_err(|e| Error::filesystem(self.statedir.path(), e))?;

        for entry in entries {
            let entry = entry.map_err(|e| Error::filesystem(self.statedir.path(), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match run_trigger(&path) {
                Ok(status) if status.success() => report.executed.push(name),
                Ok(status) => {
                    tracing::warn!(trigger = %name, ?status, "intercept trigger failed");
                    report.failed.push((name, status));
                }
                Err(e) => {
                    tracing::warn!(trigger = %name, error = %e, "intercept trigger could not be run");
                    let status = failure_exit_status();
                    report.failed.push((name, status));
                }
            }
        }

        Ok(report)
    }

    fn restore_path(&mut self) {
        // SAFETY: this process is single-threaded cooperative per spec §5;
        // no concurrent reader can observe a torn environment variable here.
        #[allow(unsafe_code)]
        unsafe {
            match &self.saved_path {
                Some(original) => std::env::set_var("PATH", original),
                None => std::env::remove_var("PATH"),
            }
            std::env::remove_var(INTERCEPT_DIR_VAR);
        }
    }
}

impl Drop for InterceptRunner {
    fn drop(&mut self) {
        if !self.finalized {
            self.restore_path();
        }
        ACTIVE.store(false, Ordering::SeqCst);
    }
}

fn run_trigger(path: &Path) -> Result<ExitStatus> {
    Command::new("sh")
        .arg(path)
        .stdin(Stdio::null())
        .status()
        .map_err(|e| Error::filesystem(path, e))
}

#[cfg(unix)]
fn failure_exit_status() -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(1 << 8)
}

#[cfg(not(unix))]
fn failure_exit_status() -> ExitStatus {
    Command::new("false").status().unwrap_or_else(|_| {
        Command::new("cmd").arg("/C").arg("exit 1").status().expect("exit status")
    })
}

fn write_shim(shim_dir: &Path, utility: &str) -> Result<()> {
    let path = shim_dir.join(utility);
    let script = format!(
        "#!/bin/sh\n\
         out=\"${{{var}}}/{utility}.$$.$(date +%s%N 2>/dev/null || date +%s)\"\n\
         {{ printf '%s\\n' \"{utility}\"; for a in \"$@\"; do printf '%s\\n' \"$a\"; done; }} > \"$out\"\n\
         exit 0\n",
        var = INTERCEPT_DIR_VAR,
        utility = utility,
    );
    let mut file = fs::File::create(&path).map_err(|e| Error::filesystem(&path, e))?;
    file.write_all(script.as_bytes())
        .map_err(|e| Error::filesystem(&path, e))?;
    set_executable(&path)?;
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)
        .map_err(|e| Error::filesystem(path, e))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).map_err(|e| Error::filesystem(path, e))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
