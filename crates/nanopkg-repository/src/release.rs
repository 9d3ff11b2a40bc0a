//! Parsing of a distribution's `Release` manifest (spec §4.3, §6).
//!
//! A `Release` file is an RFC 822-style header block: most fields are
//! single-line (`Components:`, `Architectures:`), and `SHA256:` is a
//! multi-line field whose continuation lines are `<digest> <size> <path>`
//! triples, one per indexed file.

use nanopkg_core::{Error, Result, Stanza};

/// One entry of a `Release`'s `SHA256:` file map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFile {
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

/// A parsed `Release` manifest (spec §3 `Src::Dist`, §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Release {
    pub components: Vec<String>,
    pub architectures: Vec<String>,
    pub files: Vec<ReleaseFile>,
}

impl Release {
    /// The declared checksum for `path`, if the manifest lists it.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&ReleaseFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Parse a `Release` manifest's text (spec §4.3, §6).
///
/// # Errors
/// Returns a `ParseError` if the text has no parseable control stanza, or
/// if a `SHA256:` continuation line is malformed.
pub fn parse(text: &str) -> Result<Release> {
    let stanzas = nanopkg_core::parse_many(text);
    let stanza: &Stanza = stanzas
        .first()
        .ok_or_else(|| Error::parse("Release manifest has no stanza"))?
        .as_ref()
        .map_err(|e| Error::parse(format!("malformed Release manifest: {e}")))?;

    let components = stanza
        .get("Components")
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let architectures = stanza
        .get("Architectures")
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut files = Vec::new();
    if let Some(field) = stanza.get("SHA256") {
        for line in field.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let sha256 = parts
                .next()
                .ok_or_else(|| Error::parse(format!("malformed SHA256 entry: '{line}'")))?;
            let size: u64 = parts
                .next()
                .ok_or_else(|| Error::parse(format!("malformed SHA256 entry: '{line}'")))?
                .parse()
                .map_err(|_| Error::parse(format!("non-numeric size in SHA256 entry: '{line}'")))?;
            let path = parts
                .next()
                .ok_or_else(|| Error::parse(format!("malformed SHA256 entry: '{line}'")))?;
            files.push(ReleaseFile {
                path: path.to_string(),
                size,
                sha256: sha256.to_string(),
            });
        }
    }

    Ok(Release {
        components,
        architectures,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Components: main contrib\n\
                           Architectures: arm_cortex-a9 all\n\
                           SHA256:\n \
                           aaaa 1234 main/binary-all/Packages\n \
                           bbbb 5678 main/binary-arm_cortex-a9/Packages\n\n";

    #[test]
    fn parses_components_and_architectures() {
        let release = parse(SAMPLE).unwrap();
        assert_eq!(release.components, vec!["main", "contrib"]);
        assert_eq!(release.architectures, vec!["arm_cortex-a9", "all"]);
    }

    #[test]
    fn parses_sha256_file_map() {
        let release = parse(SAMPLE).unwrap();
        assert_eq!(release.files.len(), 2);
        let entry = release.file("main/binary-all/Packages").unwrap();
        assert_eq!(entry.sha256, "aaaa");
        assert_eq!(entry.size, 1234);
    }

    #[test]
    fn missing_file_lookup_is_none() {
        let release = parse(SAMPLE).unwrap();
        assert!(release.file("nope").is_none());
    }

    #[test]
    fn empty_text_is_a_parse_error() {
        assert!(parse("").is_err());
    }
}
