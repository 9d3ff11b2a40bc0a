//! Per-package file manifest (`<info_dir>/<pkg>.list`, spec §4.4).

use std::path::{Path, PathBuf};

use nanopkg_core::{Error, Result};

/// Path to `pkg`'s list file under `info_dir`.
#[must_use]
pub fn list_path(info_dir: &Path, pkg: &str) -> PathBuf {
    info_dir.join(format!("{pkg}.list"))
}

/// Path to `pkg`'s control metadata file under `info_dir`.
#[must_use]
pub fn control_path(info_dir: &Path, pkg: &str) -> PathBuf {
    info_dir.join(format!("{pkg}.control"))
}

/// Overwrite `pkg`'s list file with `paths`, one absolute path per line,
/// trailing newline (spec §6 file format). Only called when the package's
/// `filelist-changed` flag is set (spec §4.4).
pub fn write_list_file(info_dir: &Path, pkg: &str, paths: &[PathBuf]) -> Result<()> {
    std::fs::create_dir_all(info_dir).map_err(|e| Error::filesystem(info_dir, e))?;
    let path = list_path(info_dir, pkg);
    let mut content = String::new();
    for p in paths {
        content.push_str(&p.display().to_string());
        content.push('\n');
    }
    crate::atomic::atomic_write(&path, content.as_bytes())
}

/// Read `pkg`'s list file, one path per line.
pub fn read_list_file(info_dir: &Path, pkg: &str) -> Result<Vec<PathBuf>> {
    let path = list_path(info_dir, pkg);
    let content = std::fs::read_to_string(&path).map_err(|e| Error::filesystem(&path, e))?;
    Ok(content.lines().map(PathBuf::from).collect())
}

/// Remove `pkg`'s info files (`.list` and `.control`), used by the erase
/// step (spec §4.7).
pub fn remove_info_files(info_dir: &Path, pkg: &str) -> Result<()> {
    for path in [list_path(info_dir, pkg), control_path(info_dir, pkg)] {
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| Error::filesystem(&path, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_list_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![PathBuf::from("/usr/bin/foo"), PathBuf::from("/etc/foo.conf")];
        write_list_file(dir.path(), "foo", &paths).unwrap();
        let read_back = read_list_file(dir.path(), "foo").unwrap();
        assert_eq!(read_back, paths);
    }

    #[test]
    fn remove_info_files_deletes_list_and_control() {
        let dir = tempfile::tempdir().unwrap();
        write_list_file(dir.path(), "foo", &[]).unwrap();
        std::fs::write(control_path(dir.path(), "foo"), "Package: foo\n").unwrap();
        remove_info_files(dir.path(), "foo").unwrap();
        assert!(!list_path(dir.path(), "foo").exists());
        assert!(!control_path(dir.path(), "foo").exists());
    }
}
