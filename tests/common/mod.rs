//! Shared harness for the `tests/scenario_*.rs` end-to-end tests (spec
//! §8). Builds a throwaway destination tree, a `nanopkg.toml` pointing at
//! it, a `file:`-served fixture repository, and `.ipk` archives, then
//! drives the compiled `nanopkg` binary exactly as a user would.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;

pub use nanopkg_test_utils::fixtures::{build_ipk, md5_hex, write_ipk, ArchiveEntry};

/// A throwaway installed root plus a repository directory served over
/// `file://`, and the `nanopkg.toml` pointing both together.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub root_dir: PathBuf,
    pub info_dir: PathBuf,
    pub lists_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub config_path: PathBuf,
}

impl Harness {
    /// Build the directory tree (spec §6 persisted state layout) and
    /// write a `nanopkg.toml` with a single flat source named `"snapshot"`
    /// whose base URL is `file://<repo_dir>`, and `lists/snapshot`
    /// pre-populated from `packages_stanza` (empty string for no
    /// repository packages at all).
    #[must_use]
    pub fn new(packages_stanza: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root_dir = dir.path().join("root");
        let info_dir = root_dir.join("usr/lib/opkg/info");
        let lists_dir = root_dir.join("usr/lib/opkg/lists");
        let cache_dir = root_dir.join("var/cache/opkg");
        let repo_dir = dir.path().join("repo");
        for d in [&info_dir, &lists_dir, &cache_dir, &repo_dir] {
            fs::create_dir_all(d).expect("create harness directory");
        }
        fs::write(lists_dir.join("snapshot"), packages_stanza).expect("seed lists/snapshot");

        let config_path = dir.path().join("nanopkg.toml");
        let repo_url = format!("file://{}", repo_dir.display());
        let toml = format!(
            r#"
lists_dir = "{lists_dir}"
cache_dir = "{cache_dir}"
lock_file = "{lock_file}"
download_parallelism = 1
max_retries = 1

[[destinations]]
name = "root"
root_dir = "{root_dir}"
info_dir = "{info_dir}"
status_file_name = "status"

[[sources]]
kind = "flat"
name = "snapshot"
url = "{repo_url}"

[[architectures]]
name = "all"
priority = 1

[[architectures]]
name = "arm_cortex-a9"
priority = 10
"#,
            lists_dir = lists_dir.display(),
            cache_dir = cache_dir.display(),
            lock_file = root_dir.join("usr/lib/opkg/lock").display(),
            root_dir = root_dir.display(),
            info_dir = info_dir.display(),
        );
        fs::write(&config_path, toml).expect("write nanopkg.toml");

        Self {
            dir,
            root_dir,
            info_dir,
            lists_dir,
            cache_dir,
            repo_dir,
            config_path,
        }
    }

    /// Append more stanzas to the `lists/snapshot` index (e.g. after
    /// preparing an "upgraded repository" view mid-test).
    pub fn append_index(&self, stanza: &str) {
        let path = self.lists_dir.join("snapshot");
        let mut existing = fs::read_to_string(&path).unwrap_or_default();
        existing.push_str(stanza);
        fs::write(&path, existing).expect("append to lists/snapshot");
    }

    pub fn replace_index(&self, stanza: &str) {
        fs::write(self.lists_dir.join("snapshot"), stanza).expect("replace lists/snapshot");
    }

    /// Build `<name>.ipk` under `repo_dir`, ready to be referenced by a
    /// `Filename:` field in the index.
    pub fn write_archive(
        &self,
        file_name: &str,
        control: &[ArchiveEntry],
        data: &[ArchiveEntry],
    ) -> PathBuf {
        write_ipk(&self.repo_dir, file_name, control, data)
    }

    /// A `nanopkg` invocation pre-wired to this harness's config and a
    /// batch (non-interactive) run, matching how a CI/embedded install
    /// would always be driven.
    #[must_use]
    pub fn nanopkg(&self) -> Command {
        let mut cmd = Command::cargo_bin("nanopkg").expect("find nanopkg binary");
        cmd.arg("--conf").arg(&self.config_path).arg("--batch");
        cmd
    }

    pub fn status_text(&self) -> String {
        fs::read_to_string(self.root_dir.join("usr/lib/opkg/status")).unwrap_or_default()
    }

    pub fn installed_path(&self, relative: &str) -> PathBuf {
        self.root_dir.join(relative.trim_start_matches('/'))
    }
}

/// One index stanza for a no-dependency package whose `data.tar.gz`
/// contains a single file at `<name>/payload`.
#[must_use]
pub fn simple_package_stanza(name: &str, version: &str, sha256: &str, size: u64) -> String {
    format!(
        "Package: {name}\nVersion: {version}\nArchitecture: all\nFilename: {name}_{version}_all.ipk\nSHA256: {sha256}\nSize: {size}\nDescription: test fixture package {name}\n\n"
    )
}

#[must_use]
pub fn sha256_of(bytes: &[u8]) -> String {
    nanopkg_test_utils::fixtures::sha256_hex(bytes)
}

pub fn control_entry(name: &str, version: &str, depends: &str) -> ArchiveEntry {
    let depends_line = if depends.is_empty() {
        String::new()
    } else {
        format!("Depends: {depends}\n")
    };
    ArchiveEntry::new(
        "./control",
        format!("Package: {name}\nVersion: {version}\nArchitecture: all\n{depends_line}\n").into_bytes(),
    )
}

/// Check whether `path` exists relative to `Harness::root_dir`.
pub fn exists(path: &Path) -> bool {
    path.exists()
}
