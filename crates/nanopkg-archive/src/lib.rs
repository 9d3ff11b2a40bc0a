//! Debian `ar`-archive package reader (spec §4.10, §13).
//!
//! A package file is an outer `ar` archive of exactly three members:
//! `debian-binary`, `control.tar.*` and `data.tar.*`. The two tarballs may
//! be compressed with gzip, bzip2, xz or zstd, sniffed from the member
//! name's suffix.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use nanopkg_core::{Error, Result};

/// An opened package archive: the outer `ar` members held in memory,
/// ready to have their inner tarballs decompressed on demand.
pub struct PackageArchive {
    path: PathBuf,
    members: BTreeMap<String, Vec<u8>>,
}

impl PackageArchive {
    /// Read `path`'s outer `ar` archive into memory.
    ///
    /// # Errors
    /// Returns a `FilesystemError` if `path` cannot be opened or is not a
    /// valid `ar` archive, or a `ParseError` if the required
    /// `control.tar.*`/`data.tar.*` members are missing.
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Error::filesystem(path, e))?;
        let mut archive = ar::Archive::new(file);
        let mut members = BTreeMap::new();

        while let Some(entry) = archive.next_entry() {
            let mut entry =
                entry.map_err(|e| Error::filesystem(path, std::io::Error::other(e.to_string())))?;
            let name = String::from_utf8_lossy(entry.header().identifier()).into_owned();
            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| Error::filesystem(path, e))?;
            members.insert(name, bytes);
        }

        if !members.keys().any(|n| n.starts_with("control.tar")) {
            return Err(Error::parse(format!(
                "{}: missing control.tar member",
                path.display()
            )));
        }
        if !members.keys().any(|n| n.starts_with("data.tar")) {
            return Err(Error::parse(format!(
                "{}: missing data.tar member",
                path.display()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            members,
        })
    }

    fn member(&self, prefix: &str) -> Result<(&str, &[u8])> {
        self.members
            .iter()
            .find(|(name, _)| name.starts_with(prefix))
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
            .ok_or_else(|| {
                Error::parse(format!("{}: missing {prefix} member", self.path.display()))
            })
    }

    /// The `./control` stanza text inside `control.tar.*`.
    ///
    /// # Errors
    /// Returns a `ParseError` if the control tarball cannot be
    /// decompressed or does not contain a `./control` (or `control`)
    /// entry.
    pub fn control_stanza(&self) -> Result<String> {
        let (name, bytes) = self.member("control.tar")?;
        let mut tar = open_tar(name, bytes, &self.path)?;
        for entry in tar.entries().map_err(|e| Error::filesystem(&self.path, e))? {
            let mut entry = entry.map_err(|e| Error::filesystem(&self.path, e))?;
            let entry_path = entry
                .path()
                .map_err(|e| Error::filesystem(&self.path, e))?
                .into_owned();
            if is_control_entry(&entry_path) {
                let mut text = String::new();
                entry
                    .read_to_string(&mut text)
                    .map_err(|e| Error::filesystem(&self.path, e))?;
                return Ok(text);
            }
        }
        Err(Error::parse(format!(
            "{}: control.tar has no ./control entry",
            self.path.display()
        )))
    }

    /// Unpack `data.tar.*` under `dest`, returning the relative paths of
    /// every entry written (spec §4.4, used to populate the per-package
    /// `.list` file).
    ///
    /// # Errors
    /// Returns a `FilesystemError` if the data tarball cannot be
    /// decompressed or unpacked under `dest`.
    pub fn unpack_data(&self, dest: &Path) -> Result<Vec<PathBuf>> {
        let (name, bytes) = self.member("data.tar")?;
        let mut tar = open_tar(name, bytes, &self.path)?;
        let mut paths = Vec::new();
        for entry in tar.entries().map_err(|e| Error::filesystem(&self.path, e))? {
            let mut entry = entry.map_err(|e| Error::filesystem(&self.path, e))?;
            let rel = entry
                .path()
                .map_err(|e| Error::filesystem(&self.path, e))?
                .into_owned();
            entry
                .unpack_in(dest)
                .map_err(|e| Error::filesystem(dest, e))?;
            paths.push(rel);
        }
        Ok(paths)
    }

    /// Enumerate `data.tar.*`'s entry paths without unpacking, used by
    /// `files <pkg>` (§4.9) for a package that is not currently installed.
    ///
    /// # Errors
    /// Returns a `FilesystemError` if the data tarball cannot be
    /// decompressed or its entries listed.
    pub fn list_data_paths(&self) -> Result<Vec<PathBuf>> {
        let (name, bytes) = self.member("data.tar")?;
        let mut tar = open_tar(name, bytes, &self.path)?;
        let mut paths = Vec::new();
        for entry in tar.entries().map_err(|e| Error::filesystem(&self.path, e))? {
            let entry = entry.map_err(|e| Error::filesystem(&self.path, e))?;
            let rel = entry
                .path()
                .map_err(|e| Error::filesystem(&self.path, e))?
                .into_owned();
            paths.push(rel);
        }
        Ok(paths)
    }

    /// Read one named member (e.g. `postinst`, `prerm`, `conffiles`) out of
    /// `control.tar.*`, tolerating both the `./name` and bare `name` forms
    /// tar producers use. `None` if the member is absent (spec §4.7/§4.8,
    /// maintainer scripts are optional).
    ///
    /// # Errors
    /// Returns a `FilesystemError` if the control tarball cannot be
    /// decompressed.
    pub fn control_member(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let (tar_name, bytes) = self.member("control.tar")?;
        let mut tar = open_tar(tar_name, bytes, &self.path)?;
        for entry in tar.entries().map_err(|e| Error::filesystem(&self.path, e))? {
            let mut entry = entry.map_err(|e| Error::filesystem(&self.path, e))?;
            let entry_path = entry
                .path()
                .map_err(|e| Error::filesystem(&self.path, e))?
                .into_owned();
            if matches!(entry_path.to_str(), Some(p) if p == name || p == format!("./{name}")) {
                let mut bytes = Vec::new();
                entry
                    .read_to_end(&mut bytes)
                    .map_err(|e| Error::filesystem(&self.path, e))?;
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    /// The package's declared conffiles, one absolute path per line in the
    /// `control.tar.*` `conffiles` member (spec §4.7 conffile-preservation
    /// step). Empty if the package declares none.
    ///
    /// # Errors
    /// Returns a `FilesystemError` if the control tarball cannot be read.
    pub fn conffiles(&self) -> Result<Vec<PathBuf>> {
        match self.control_member("conffiles")? {
            Some(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                Ok(text
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(PathBuf::from)
                    .collect())
            }
            None => Ok(Vec::new()),
        }
    }

    /// Extract maintainer script `name` (`preinst`, `postinst`, `prerm` or
    /// `postrm`) to `dest`, marked executable, ready to run under the
    /// intercept runner (spec §4.7 steps 4-5, §4.8). `None` if the package
    /// carries no such script.
    ///
    /// # Errors
    /// Returns a `FilesystemError` if the control tarball cannot be read or
    /// the script cannot be written to `dest`.
    pub fn extract_maintainer_script(&self, name: &str, dest: &Path) -> Result<Option<PathBuf>> {
        let Some(bytes) = self.control_member(name)? else {
            return Ok(None);
        };
        std::fs::write(dest, &bytes).map_err(|e| Error::filesystem(dest, e))?;
        set_executable(dest)?;
        Ok(Some(dest.to_path_buf()))
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)
        .map_err(|e| Error::filesystem(path, e))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).map_err(|e| Error::filesystem(path, e))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Enumerate `path`'s `data.tar.*` entries without keeping the archive
/// open, for a single-shot query (spec §4.9 `files <pkg>`).
///
/// # Errors
/// See [`PackageArchive::open`] and [`PackageArchive::list_data_paths`].
pub fn list_data_paths(path: &Path) -> Result<Vec<PathBuf>> {
    PackageArchive::open(path)?.list_data_paths()
}

fn is_control_entry(path: &Path) -> bool {
    matches!(path.to_str(), Some("./control" | "control"))
}

fn open_tar<'a>(
    member_name: &str,
    bytes: &'a [u8],
    archive_path: &Path,
) -> Result<tar::Archive<Box<dyn Read + 'a>>> {
    let reader: Box<dyn Read> = if member_name.ends_with(".tar") {
        Box::new(bytes)
    } else if member_name.ends_with(".tar.gz") {
        Box::new(flate2::read::GzDecoder::new(bytes))
    } else if member_name.ends_with(".tar.xz") {
        Box::new(xz2::read::XzDecoder::new(bytes))
    } else if member_name.ends_with(".tar.bz2") {
        Box::new(bzip2::read::BzDecoder::new(bytes))
    } else if member_name.ends_with(".tar.zst") {
        Box::new(zstd::Decoder::new(bytes).map_err(|e| Error::filesystem(archive_path, e))?)
    } else {
        return Err(Error::parse(format!(
            "{}: unrecognized tar member compression: {member_name}",
            archive_path.display()
        )));
    };
    Ok(tar::Archive::new(reader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn gz(data: &[u8]) -> Vec<u8> {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn tar_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn build_ipk(control: &[u8], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let control_gz = gz(control);
        let data_gz = gz(data);
        {
            let mut builder = ar::Builder::new(&mut out);
            builder
                .append(&ar::Header::new(b"debian-binary".to_vec(), 4), &b"2.0\n"[..])
                .unwrap();
            builder
                .append(
                    &ar::Header::new(b"control.tar.gz".to_vec(), control_gz.len() as u64),
                    control_gz.as_slice(),
                )
                .unwrap();
            builder
                .append(
                    &ar::Header::new(b"data.tar.gz".to_vec(), data_gz.len() as u64),
                    data_gz.as_slice(),
                )
                .unwrap();
        }
        out
    }

    #[test]
    fn reads_control_stanza_and_lists_data_paths() {
        let control = tar_with(&[("./control", b"Package: foo\nVersion: 1.0\n\n")]);
        let data = tar_with(&[("./usr/bin/foo", b"binary")]);
        let ipk = build_ipk(&control, &data);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.ipk");
        std::fs::write(&path, &ipk).unwrap();

        let archive = PackageArchive::open(&path).unwrap();
        let stanza = archive.control_stanza().unwrap();
        assert!(stanza.contains("Package: foo"));

        let paths = archive.list_data_paths().unwrap();
        assert_eq!(paths, vec![PathBuf::from("./usr/bin/foo")]);
    }

    #[test]
    fn unpack_data_writes_files_under_dest() {
        let control = tar_with(&[("./control", b"Package: foo\n\n")]);
        let data = tar_with(&[("./etc/foo.conf", b"setting=1\n")]);
        let ipk = build_ipk(&control, &data);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.ipk");
        std::fs::write(&path, &ipk).unwrap();

        let dest = tempfile::tempdir().unwrap();
        let archive = PackageArchive::open(&path).unwrap();
        let paths = archive.unpack_data(dest.path()).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(dest.path().join("etc/foo.conf").is_file());
    }

    #[test]
    fn reads_conffiles_and_maintainer_script() {
        let control = tar_with(&[
            ("./control", b"Package: foo\nVersion: 1.0\n\n"),
            ("./conffiles", b"/etc/foo.conf\n"),
            ("./postinst", b"#!/bin/sh\nexit 0\n"),
        ]);
        let data = tar_with(&[("./etc/foo.conf", b"setting=1\n")]);
        let ipk = build_ipk(&control, &data);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.ipk");
        std::fs::write(&path, &ipk).unwrap();

        let archive = PackageArchive::open(&path).unwrap();
        assert_eq!(archive.conffiles().unwrap(), vec![PathBuf::from("/etc/foo.conf")]);

        let script_dest = dir.path().join("postinst");
        let extracted = archive
            .extract_maintainer_script("postinst", &script_dest)
            .unwrap();
        assert_eq!(extracted, Some(script_dest.clone()));
        assert!(script_dest.is_file());
        assert!(archive.extract_maintainer_script("prerm", &dir.path().join("prerm")).unwrap().is_none());
    }

    #[test]
    fn missing_data_member_is_a_parse_error() {
        let mut out = Vec::new();
        {
            let mut builder = ar::Builder::new(&mut out);
            builder
                .append(&ar::Header::new(b"debian-binary".to_vec(), 4), &b"2.0\n"[..])
                .unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ipk");
        std::fs::write(&path, &out).unwrap();

        assert!(PackageArchive::open(&path).is_err());
    }
}
