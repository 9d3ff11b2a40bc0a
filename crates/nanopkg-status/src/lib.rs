//! The installed-package status store: parse/write the on-disk database
//! that backs a [`nanopkg_pool::Pool`]'s installed repo (spec §4.4).

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod atomic;
pub mod list;
pub mod stanza;

use nanopkg_config::Dest;
use nanopkg_core::{parse_many, render_many, Error, Result};
use nanopkg_pool::{Flag, Pool, Status, Want};

/// Outcome of [`load`]: whether any duplicate `(name, arch)` entries were
/// collapsed, requiring the destination to be rewritten (spec §3, §4.4).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub dirty: bool,
    pub parsed: usize,
    pub skipped: usize,
}

/// Parse `dest`'s status file into `pool`'s installed repo.
///
/// A missing status file is treated as "nothing installed yet", not an
/// error (a fresh destination has none). Malformed stanzas are logged at
/// `warn` and skipped, matching the `ParseError` propagation policy
/// (spec §7): one bad stanza does not abort the whole load.
pub fn load(dest: &Dest, pool: &mut Pool) -> Result<LoadReport> {
    let path = dest.status_file();
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LoadReport::default()),
        Err(e) => return Err(Error::filesystem(&path, e)),
    };

    let mut report = LoadReport::default();
    for parsed in parse_many(&text) {
        match parsed {
            Ok(raw) => match stanza::stanza_to_solvable(&raw, pool.installed_repo()) {
                Ok(solvable) => {
                    let (_, replaced) = pool.add_installed(solvable);
                    report.parsed += 1;
                    if replaced {
                        report.dirty = true;
                        tracing::warn!(
                            dest = %dest.name,
                            "duplicate installed entry collapsed, keeping the later one"
                        );
                    }
                }
                Err(err) => {
                    report.skipped += 1;
                    tracing::warn!(dest = %dest.name, error = %err, "skipping malformed status stanza");
                }
            },
            Err(err) => {
                report.skipped += 1;
                tracing::warn!(dest = %dest.name, error = %err, "skipping malformed status stanza");
            }
        }
    }
    Ok(report)
}

/// Should this installed solvable's stanza be omitted from a rewritten
/// status file (spec §4.4)? Packages in `config-files` status are always
/// kept so a later purge can still find their conffile list.
fn omit_from_write(want: Want, flag: nanopkg_pool::FlagSet, status: Status) -> bool {
    if status == Status::ConfigFiles {
        return false;
    }
    match want {
        Want::Unknown | Want::Purge => true,
        Want::Deinstall => !flag.contains(Flag::Hold),
        Want::Install => false,
    }
}

/// Atomically rewrite `dest`'s status file from `pool`'s current installed
/// repo contents (spec §4.4). Only destinations whose `dirty` flag the
/// caller tracks should be rewritten; this function always performs the
/// write when called — the dirty check is the caller's responsibility
/// (typically `nanopkg-exec`'s per-destination bookkeeping), mirroring the
/// upstream design where the store itself is a dumb serializer.
pub fn write(dest: &Dest, pool: &Pool) -> Result<()> {
    let stanzas: Vec<_> = pool
        .installed_ids()
        .map(|id| pool.solvable(id))
        .filter(|s| {
            let state = s.state.unwrap_or_default();
            !omit_from_write(state.want, state.flag, state.status)
        })
        .map(stanza::solvable_to_stanza)
        .collect();
    let rendered = render_many(stanzas.iter());
    atomic::atomic_write(&dest.status_file(), rendered.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanopkg_pool::{PackageState, RepoId, Solvable};
    use nanopkg_version::{Conjunction, Version};

    fn dest(root: &std::path::Path) -> Dest {
        Dest {
            name: "root".to_string(),
            root_dir: root.to_path_buf(),
            info_dir: root.join("info"),
            status_file_name: "status".to_string(),
        }
    }

    fn solvable(name: &str, repo: RepoId, want: Want, status: Status) -> Solvable {
        Solvable {
            name: name.to_string(),
            version: Version::parse("1.0").unwrap(),
            architecture: "all".to_string(),
            repo,
            depends: Conjunction::default(),
            pre_depends: Conjunction::default(),
            recommends: Conjunction::default(),
            suggests: Conjunction::default(),
            conflicts: Conjunction::default(),
            replaces: Conjunction::default(),
            provides: Vec::new(),
            obsoletes: Conjunction::default(),
            md5: None,
            sha256: None,
            download_size: 0,
            installed_size: 0,
            url: String::new(),
            description: String::new(),
            maintainer: String::new(),
            conffiles: Vec::new(),
            installed_time: None,
            tags: Vec::new(),
            state: Some(PackageState {
                want,
                flag: nanopkg_pool::FlagSet::empty(),
                status,
            }),
        }
    }

    #[test]
    fn round_trip_write_then_load_reproduces_state() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dest(dir.path());
        let mut pool = Pool::new();
        pool.add_installed(solvable(
            "foo",
            pool.installed_repo(),
            Want::Install,
            Status::Installed,
        ));

        write(&dest, &pool).unwrap();

        let mut reloaded = Pool::new();
        let report = load(&dest, &mut reloaded).unwrap();
        assert_eq!(report.parsed, 1);
        assert_eq!(reloaded.installed_ids().count(), 1);
        let id = reloaded.installed_ids().next().unwrap();
        assert_eq!(reloaded.solvable(id).name, "foo");
    }

    #[test]
    fn missing_status_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dest(dir.path());
        let mut pool = Pool::new();
        let report = load(&dest, &mut pool).unwrap();
        assert_eq!(report.parsed, 0);
        assert!(!report.dirty);
    }

    #[test]
    fn want_unknown_is_omitted_from_write() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dest(dir.path());
        let mut pool = Pool::new();
        pool.add_installed(solvable(
            "gone",
            pool.installed_repo(),
            Want::Unknown,
            Status::NotInstalled,
        ));
        write(&dest, &pool).unwrap();
        let text = std::fs::read_to_string(dest.status_file()).unwrap();
        assert!(!text.contains("gone"));
    }

    #[test]
    fn config_files_status_is_kept_even_when_purge_requested() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dest(dir.path());
        let mut pool = Pool::new();
        pool.add_installed(solvable(
            "leftover",
            pool.installed_repo(),
            Want::Purge,
            Status::ConfigFiles,
        ));
        write(&dest, &pool).unwrap();
        let text = std::fs::read_to_string(dest.status_file()).unwrap();
        assert!(text.contains("leftover"));
    }

    #[test]
    fn duplicate_name_arch_on_disk_is_deduped_and_marks_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dest(dir.path());
        std::fs::write(
            dest.status_file(),
            "Package: foo\nVersion: 1.0\nArchitecture: all\nStatus: install ok installed\nAuto-Installed: no\n\n\
             Package: foo\nVersion: 2.0\nArchitecture: all\nStatus: install ok installed\nAuto-Installed: no\n\n",
        )
        .unwrap();
        let mut pool = Pool::new();
        let report = load(&dest, &mut pool).unwrap();
        assert!(report.dirty);
        assert_eq!(pool.installed_ids().count(), 1);
        let id = pool.installed_ids().next().unwrap();
        assert_eq!(pool.solvable(id).version.to_string(), "2.0");
    }
}
