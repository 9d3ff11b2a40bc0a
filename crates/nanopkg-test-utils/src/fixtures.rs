//! A throwaway installed-root layout, an inline-stanza pool builder, and an
//! in-memory `.ipk` archive builder for end-to-end executor tests.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use md5::Digest as _;
use nanopkg_config::Dest;
use nanopkg_core::{parse_many, Result};
use nanopkg_pool::Pool;
use nanopkg_repository::index::stanza_to_solvable;

/// A `tempfile`-backed destination with the `usr/lib/opkg/...` +
/// `var/cache/opkg/` layout spec §6 describes, already created on disk.
#[derive(Debug)]
pub struct TempDest {
    pub dir: tempfile::TempDir,
    pub dest: Dest,
    pub lists_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub lock_file: PathBuf,
}

/// Build a throwaway destination rooted at a fresh temp directory.
///
/// # Panics
/// Panics if the temp directory or its subdirectories cannot be created;
/// acceptable in test-only code.
#[must_use]
pub fn temp_dest() -> TempDest {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root_dir = dir.path().join("root");
    let info_dir = root_dir.join("usr/lib/opkg/info");
    let lists_dir = root_dir.join("usr/lib/opkg/lists");
    let cache_dir = root_dir.join("var/cache/opkg");
    let lock_file = root_dir.join("usr/lib/opkg/lock");

    for d in [&info_dir, &lists_dir, &cache_dir] {
        std::fs::create_dir_all(d).expect("create destination subdirectory");
    }

    TempDest {
        dir,
        dest: Dest {
            name: "root".to_string(),
            root_dir,
            info_dir,
            status_file_name: "status".to_string(),
        },
        lists_dir,
        cache_dir,
        lock_file,
    }
}

/// Parse `stanzas` as a single fixture repo named `"fixture"` (priority 10)
/// under an `"all"`/`"arm_cortex-a9"` architecture table, for resolver and
/// query unit tests that need a throwaway pool without a real repository
/// loader run.
///
/// # Errors
/// Returns the first `ParseError` hit converting a stanza to a solvable.
pub fn fixture_pool(stanzas: &[&str]) -> Result<Pool> {
    let mut pool = Pool::new();
    pool.set_architectures(&[
        ("all".to_string(), 1),
        ("arm_cortex-a9".to_string(), 10),
    ]);
    let repo = pool.add_repo("fixture", 10);

    for text in stanzas {
        for parsed in parse_many(text) {
            let stanza = parsed?;
            let solvable = stanza_to_solvable(&stanza, repo)?;
            pool.add_solvable(repo, solvable)?;
        }
    }
    pool.internalize(repo);
    Ok(pool)
}

/// One file to seed a `.ipk`'s `data.tar.gz` or `control.tar.gz` at a
/// given in-archive path.
pub struct ArchiveEntry {
    pub path: &'static str,
    pub contents: Vec<u8>,
}

impl ArchiveEntry {
    #[must_use]
    pub fn new(path: &'static str, contents: impl Into<Vec<u8>>) -> Self {
        Self { path, contents: contents.into() }
    }
}

fn gzip_tar(entries: &[ArchiveEntry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(entry.contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, entry.path, entry.contents.as_slice()).expect("append tar entry");
    }
    let tar_bytes = builder.into_inner().expect("finish tar");

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&tar_bytes).expect("gzip tar");
    encoder.finish().expect("finish gzip")
}

/// Build a well-formed `.ipk` (outer `ar` archive of `debian-binary` +
/// `control.tar.gz` + `data.tar.gz`) entirely in memory, for tests that
/// drive the download/apply phases against a real archive instead of a
/// bare index stanza.
#[must_use]
pub fn build_ipk(control: &[ArchiveEntry], data: &[ArchiveEntry]) -> Vec<u8> {
    let control_gz = gzip_tar(control);
    let data_gz = gzip_tar(data);

    let mut out = Vec::new();
    let mut builder = ar::Builder::new(&mut out);
    builder
        .append(&ar::Header::new(b"debian-binary".to_vec(), 4), &b"2.0\n"[..])
        .expect("append debian-binary");
    builder
        .append(&ar::Header::new(b"control.tar.gz".to_vec(), control_gz.len() as u64), control_gz.as_slice())
        .expect("append control.tar.gz");
    builder
        .append(&ar::Header::new(b"data.tar.gz".to_vec(), data_gz.len() as u64), data_gz.as_slice())
        .expect("append data.tar.gz");
    drop(builder);
    out
}

/// [`build_ipk`], written to `dir/<name>`, returning the path.
///
/// # Panics
/// Panics if the file cannot be written; acceptable in test-only code.
#[must_use]
pub fn write_ipk(dir: &Path, name: &str, control: &[ArchiveEntry], data: &[ArchiveEntry]) -> PathBuf {
    let bytes = build_ipk(control, data);
    let path = dir.join(name);
    std::fs::write(&path, &bytes).expect("write ipk fixture");
    path
}

/// Hex MD5 of `bytes`, for building `Conffiles:`-bearing control stanzas
/// whose recorded checksum matches a fixture's `data.tar.gz` payload.
#[must_use]
pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = md5::Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hex SHA-256 of `bytes`, for `SHA256:` control fields.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::Digest as _;
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
