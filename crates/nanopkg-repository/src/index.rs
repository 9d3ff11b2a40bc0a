//! Conversion between an index control [`Stanza`] and a
//! [`nanopkg_pool::Solvable`] (spec §4.3).
//!
//! Distinct from `nanopkg-status`'s stanza conversion: index stanzas carry
//! download metadata (`Filename`, `MD5Sum`, `SHA256`, `Size`) that an
//! installed-package stanza never does, and never carry `state`.

use nanopkg_core::{Error, Result, Stanza};
use nanopkg_pool::{RepoId, Solvable};
use nanopkg_version::{Atom, Conjunction, Version};

/// Parse one `Packages`-index stanza into a repo-less [`Solvable`]
/// (spec §4.3 "each block becomes one solvable").
pub fn stanza_to_solvable(stanza: &Stanza, repo: RepoId) -> Result<Solvable> {
    let name = stanza
        .get("Package")
        .ok_or_else(|| Error::parse("index stanza missing Package field"))?
        .to_string();
    let version = Version::parse(
        stanza
            .get("Version")
            .ok_or_else(|| Error::parse(format!("index stanza for '{name}' missing Version")))?,
    )?;
    let architecture = stanza
        .get("Architecture")
        .ok_or_else(|| Error::parse(format!("index stanza for '{name}' missing Architecture")))?
        .to_string();

    let depends = Conjunction::parse(stanza.get("Depends").unwrap_or(""))?;
    let pre_depends = Conjunction::parse(stanza.get("Pre-Depends").unwrap_or(""))?;
    let recommends = Conjunction::parse(stanza.get("Recommends").unwrap_or(""))?;
    let suggests = Conjunction::parse(stanza.get("Suggests").unwrap_or(""))?;
    let conflicts = Conjunction::parse(stanza.get("Conflicts").unwrap_or(""))?;
    let replaces = Conjunction::parse(stanza.get("Replaces").unwrap_or(""))?;
    let provides: Vec<Atom> = Conjunction::parse_provides(stanza.get("Provides").unwrap_or(""))?;
    let obsoletes = Conjunction::parse(stanza.get("Obsoletes").unwrap_or(""))?;

    let md5 = stanza.get("MD5Sum").map(str::to_string);
    let sha256 = stanza.get("SHA256").map(str::to_string);
    let download_size = stanza
        .get("Size")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let installed_size = stanza
        .get("Installed-Size")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let url = stanza.get("Filename").unwrap_or_default().to_string();
    let description = stanza.get("Description").unwrap_or_default().to_string();
    let maintainer = stanza.get("Maintainer").unwrap_or_default().to_string();

    Ok(Solvable {
        name,
        version,
        architecture,
        repo,
        depends,
        pre_depends,
        recommends,
        suggests,
        conflicts,
        replaces,
        provides,
        obsoletes,
        md5,
        sha256,
        download_size,
        installed_size,
        url,
        description,
        maintainer,
        conffiles: Vec::new(),
        installed_time: None,
        tags: Vec::new(),
        state: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_index_stanza() {
        let mut stanza = Stanza::new();
        stanza.set("Package", "foo");
        stanza.set("Version", "1.0-1");
        stanza.set("Architecture", "all");
        stanza.set("Filename", "foo_1.0-1_all.ipk");
        stanza.set("SHA256", "deadbeef");
        stanza.set("Size", "1024");

        let solvable = stanza_to_solvable(&stanza, RepoId(1)).unwrap();
        assert_eq!(solvable.name, "foo");
        assert_eq!(solvable.url, "foo_1.0-1_all.ipk");
        assert_eq!(solvable.sha256.as_deref(), Some("deadbeef"));
        assert_eq!(solvable.download_size, 1024);
        assert!(solvable.state.is_none());
    }

    #[test]
    fn missing_architecture_is_a_parse_error() {
        let mut stanza = Stanza::new();
        stanza.set("Package", "foo");
        stanza.set("Version", "1.0");
        assert!(stanza_to_solvable(&stanza, RepoId(1)).is_err());
    }
}
