//! Atomic replace of the status file: write to `.tmp`, `fsync`, `rename`
//! over the original (spec §4.4).

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use nanopkg_core::{Error, Result};

/// Write `content` to `path` atomically: a `.tmp` sibling is written and
/// `fsync`ed, then renamed over `path`. A reload immediately after a
/// successful call observes exactly `content` (spec §4.4 invariant).
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension(match path.extension() {
        Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
        None => "tmp".to_string(),
    });
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
    }
    {
        let mut file = File::create(&tmp_path).map_err(|e| Error::filesystem(&tmp_path, e))?;
        file.write_all(content)
            .map_err(|e| Error::filesystem(&tmp_path, e))?;
        file.sync_all().map_err(|e| Error::filesystem(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| Error::filesystem(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status");
        atomic_write(&path, b"Package: a\n\n").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"Package: a\n\n");
        assert!(!dir.path().join("status.tmp").exists());
    }

    #[test]
    fn atomic_write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }
}
