//! Conversion between a status-file control [`Stanza`] and a
//! [`nanopkg_pool::Solvable`] + [`PackageState`] (spec §4.4).

use std::path::PathBuf;

use nanopkg_core::{Error, Result, Stanza};
use nanopkg_pool::{Flag, FlagSet, PackageState, RepoId, Solvable, Status, Want};
use nanopkg_version::{Atom, Conjunction, Version};

/// Parse one installed-package stanza into a `(Solvable, want-is-user)`
/// pair. `repo` is the pool's installed repo id the solvable will belong
/// to.
pub fn stanza_to_solvable(stanza: &Stanza, repo: RepoId) -> Result<Solvable> {
    let name = stanza
        .get("Package")
        .ok_or_else(|| Error::parse("status stanza missing Package field"))?
        .to_string();
    let version = Version::parse(
        stanza
            .get("Version")
            .ok_or_else(|| Error::parse(format!("status stanza for '{name}' missing Version")))?,
    )?;
    let architecture = stanza.get("Architecture").unwrap_or("all").to_string();

    let depends = Conjunction::parse(stanza.get("Depends").unwrap_or(""))?;
    let pre_depends = Conjunction::parse(stanza.get("Pre-Depends").unwrap_or(""))?;
    let recommends = Conjunction::parse(stanza.get("Recommends").unwrap_or(""))?;
    let suggests = Conjunction::parse(stanza.get("Suggests").unwrap_or(""))?;
    let conflicts = Conjunction::parse(stanza.get("Conflicts").unwrap_or(""))?;
    let replaces = Conjunction::parse(stanza.get("Replaces").unwrap_or(""))?;
    let provides: Vec<Atom> = Conjunction::parse_provides(stanza.get("Provides").unwrap_or(""))?;
    let obsoletes = Conjunction::default();

    let conffiles = parse_conffiles(stanza.get("Conffiles").unwrap_or(""));
    let installed_time = stanza.get("Installed-Time").and_then(|s| s.trim().parse().ok());
    let tags = parse_tags(stanza.get("Tags").unwrap_or(""));

    let (want, status, flag) = parse_status_field(stanza.get("Status"))?;
    let mut flag = flag;
    // Open question §9.1 decision 1: `Auto-Installed: yes` means "pulled
    // in as a dependency", i.e. `Flag::User` is *absent*. `Auto-Installed:
    // no` (or the field missing, historically meaning "not auto") sets
    // `Flag::User`. No numeric inversion anywhere in this path.
    match stanza.get("Auto-Installed") {
        Some("yes") => {}
        _ => flag.insert(Flag::User),
    }
    if stanza.get("Essential") == Some("yes") {
        flag.insert(Flag::Noprune);
    }

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
        md5: None,
        sha256: None,
        download_size: 0,
        installed_size: 0,
        url: String::new(),
        description: String::new(),
        maintainer: String::new(),
        conffiles,
        installed_time,
        tags,
        state: Some(PackageState { want, flag, status }),
    })
}

/// Render an installed solvable back into a status-file stanza. Volatile
/// flags (`FilelistChanged`, `Changed`) are never persisted (spec §3).
#[must_use]
pub fn solvable_to_stanza(solvable: &Solvable) -> Stanza {
    let state = solvable.state.unwrap_or_default();
    let mut stanza = Stanza::new();
    stanza.set("Package", &solvable.name);
    stanza.set("Version", solvable.version.to_string());
    stanza.set("Architecture", &solvable.architecture);
    if !solvable.depends.0.is_empty() {
        stanza.set("Depends", render_conjunction(&solvable.depends));
    }
    if !solvable.pre_depends.0.is_empty() {
        stanza.set("Pre-Depends", render_conjunction(&solvable.pre_depends));
    }
    if !solvable.recommends.0.is_empty() {
        stanza.set("Recommends", render_conjunction(&solvable.recommends));
    }
    if !solvable.suggests.0.is_empty() {
        stanza.set("Suggests", render_conjunction(&solvable.suggests));
    }
    if !solvable.provides.is_empty() {
        let rendered = solvable
            .provides
            .iter()
            .map(std::string::ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        stanza.set("Provides", rendered);
    }
    if !solvable.replaces.0.is_empty() {
        stanza.set("Replaces", render_conjunction(&solvable.replaces));
    }
    if !solvable.conflicts.0.is_empty() {
        stanza.set("Conflicts", render_conjunction(&solvable.conflicts));
    }

    let persisted = state.flag.persistable();
    stanza.set("Status", render_status_field(state.want, persisted, state.status));
    if persisted.contains(Flag::User) {
        stanza.set("Auto-Installed", "no");
    } else {
        stanza.set("Auto-Installed", "yes");
    }
    if persisted.contains(Flag::Noprune) {
        stanza.set("Essential", "yes");
    }
    if !solvable.conffiles.is_empty() {
        let rendered = solvable
            .conffiles
            .iter()
            .map(|(path, md5)| format!("\n{} {}", path.display(), md5))
            .collect::<String>();
        stanza.set("Conffiles", rendered);
    }
    if let Some(installed_time) = solvable.installed_time {
        stanza.set("Installed-Time", installed_time.to_string());
    }
    if !solvable.tags.is_empty() {
        stanza.set("Tags", solvable.tags.join(", "));
    }
    stanza
}

fn render_conjunction(conj: &Conjunction) -> String {
    conj.0
        .iter()
        .map(|alt| {
            alt.0
                .iter()
                .map(std::string::ToString::to_string)
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_tags(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_conffiles(field: &str) -> Vec<(PathBuf, String)> {
    field
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let (path, md5) = line.rsplit_once(' ')?;
            Some((PathBuf::from(path.trim()), md5.trim().to_string()))
        })
        .collect()
}

/// `Status:` is three space-separated words: `want flag status`. Only
/// `hold`/`ok` are recognized in the flag slot on load; other persisted
/// flags round-trip through `Essential`/`Auto-Installed` instead, matching
/// the field set spec §4.4 actually recognizes.
fn parse_status_field(field: Option<&str>) -> Result<(Want, Status, FlagSet)> {
    let Some(field) = field else {
        return Ok((Want::Unknown, Status::NotInstalled, FlagSet::empty()));
    };
    let mut words = field.split_whitespace();
    let want = match words.next() {
        Some("install") => Want::Install,
        Some("deinstall") => Want::Deinstall,
        Some("purge") => Want::Purge,
        Some("unknown") | None => Want::Unknown,
        Some(other) => return Err(Error::parse(format!("unknown Status want '{other}'"))),
    };
    let mut flags = FlagSet::empty();
    let flag_word = words
        .next()
        .ok_or_else(|| Error::parse("Status field missing flag word"))?;
    match flag_word {
        "hold" => flags.insert(Flag::Hold),
        "reinstreq" => flags.insert(Flag::Reinstreq),
        "ok" => flags.insert(Flag::Ok),
        other => return Err(Error::parse(format!("unknown Status flag '{other}'"))),
    }
    let status_word = words
        .next()
        .ok_or_else(|| Error::parse("Status field missing status word"))?;
    let status = Status::parse(status_word)
        .ok_or_else(|| Error::parse(format!("unknown Status status '{status_word}'")))?;
    Ok((want, status, flags))
}

fn render_status_field(want: Want, flags: FlagSet, status: Status) -> String {
    let want_word = match want {
        Want::Unknown => "unknown",
        Want::Install => "install",
        Want::Deinstall => "deinstall",
        Want::Purge => "purge",
    };
    let flag_word = if flags.contains(Flag::Hold) {
        "hold"
    } else if flags.contains(Flag::Reinstreq) {
        "reinstreq"
    } else {
        "ok"
    };
    format!("{want_word} {flag_word} {}", status.as_field_word())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_minimal_stanza() {
        let repo = RepoId(0);
        let mut stanza = Stanza::new();
        stanza.set("Package", "foo");
        stanza.set("Version", "1.0-1");
        stanza.set("Architecture", "all");
        stanza.set("Status", "install ok installed");
        stanza.set("Auto-Installed", "no");

        let solvable = stanza_to_solvable(&stanza, repo).unwrap();
        assert_eq!(solvable.name, "foo");
        assert_eq!(solvable.state.unwrap().status, Status::Installed);
        assert!(solvable.state.unwrap().flag.contains(Flag::User));

        let rendered = solvable_to_stanza(&solvable);
        assert_eq!(rendered.get("Status"), Some("install ok installed"));
        assert_eq!(rendered.get("Auto-Installed"), Some("no"));
    }

    #[test]
    fn auto_installed_yes_means_not_user_requested() {
        let repo = RepoId(0);
        let mut stanza = Stanza::new();
        stanza.set("Package", "foo");
        stanza.set("Version", "1.0");
        stanza.set("Status", "install ok installed");
        stanza.set("Auto-Installed", "yes");
        let solvable = stanza_to_solvable(&stanza, repo).unwrap();
        assert!(!solvable.state.unwrap().flag.contains(Flag::User));
    }

    #[test]
    fn parses_multiline_conffiles() {
        let repo = RepoId(0);
        let mut stanza = Stanza::new();
        stanza.set("Package", "x");
        stanza.set("Version", "1.0");
        stanza.set("Status", "install ok installed");
        stanza.set("Conffiles", "\n/etc/x.conf abcd1234");
        let solvable = stanza_to_solvable(&stanza, repo).unwrap();
        assert_eq!(solvable.conffiles.len(), 1);
        assert_eq!(solvable.conffiles[0].0, PathBuf::from("/etc/x.conf"));
        assert_eq!(solvable.conffiles[0].1, "abcd1234");
    }

    #[test]
    fn hold_flag_round_trips() {
        let repo = RepoId(0);
        let mut stanza = Stanza::new();
        stanza.set("Package", "held");
        stanza.set("Version", "1.0");
        stanza.set("Status", "install hold installed");
        stanza.set("Auto-Installed", "no");
        let solvable = stanza_to_solvable(&stanza, repo).unwrap();
        assert!(solvable.state.unwrap().flag.contains(Flag::Hold));
        let rendered = solvable_to_stanza(&solvable);
        assert_eq!(rendered.get("Status"), Some("install hold installed"));
    }

    #[test]
    fn installed_time_and_tags_round_trip() {
        let repo = RepoId(0);
        let mut stanza = Stanza::new();
        stanza.set("Package", "foo");
        stanza.set("Version", "1.0");
        stanza.set("Status", "install ok installed");
        stanza.set("Installed-Time", "1700000000");
        stanza.set("Tags", "role::app-data, implemented-in::c");

        let solvable = stanza_to_solvable(&stanza, repo).unwrap();
        assert_eq!(solvable.installed_time, Some(1_700_000_000));
        assert_eq!(solvable.tags, vec!["role::app-data", "implemented-in::c"]);

        let rendered = solvable_to_stanza(&solvable);
        assert_eq!(rendered.get("Installed-Time"), Some("1700000000"));
        assert_eq!(rendered.get("Tags"), Some("role::app-data, implemented-in::c"));
    }

    #[test]
    fn missing_version_is_parse_error() {
        let repo = RepoId(0);
        let mut stanza = Stanza::new();
        stanza.set("Package", "foo");
        assert!(stanza_to_solvable(&stanza, repo).is_err());
    }
}
