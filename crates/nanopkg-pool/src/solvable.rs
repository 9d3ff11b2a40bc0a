//! The `Solvable` type and its install-state companions (spec §3).

use std::path::PathBuf;

use nanopkg_version::{Atom, Conjunction, Version};

/// Opaque identifier for a solvable within a [`crate::Pool`]. Stable for the
/// lifetime of the pool; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SolvableId(pub u32);

/// Opaque identifier for a repo within a [`crate::Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoId(pub u32);

/// One concrete `(name, epoch, upstream-version, revision, architecture,
/// repository-id)` package entity (spec §3).
#[derive(Debug, Clone)]
pub struct Solvable {
    pub name: String,
    pub version: Version,
    pub architecture: String,
    pub repo: RepoId,

    pub depends: Conjunction,
    pub pre_depends: Conjunction,
    pub recommends: Conjunction,
    pub suggests: Conjunction,
    pub conflicts: Conjunction,
    pub replaces: Conjunction,
    pub provides: Vec<Atom>,
    pub obsoletes: Conjunction,

    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub download_size: u64,
    pub installed_size: u64,
    pub url: String,
    pub description: String,
    pub maintainer: String,
    pub conffiles: Vec<(PathBuf, String)>,

    /// `Installed-Time:` from the status file, a Unix timestamp. `None`
    /// for solvables that never came from a status stanza.
    pub installed_time: Option<i64>,
    /// `Tags:` from the status file, split on `,`. Empty for solvables
    /// that never came from a status stanza or carried no tags.
    pub tags: Vec<String>,

    /// `None` for solvables from a repository index; `Some` once added to
    /// the installed repo (spec §3 "Package state").
    pub state: Option<PackageState>,
}

impl Solvable {
    /// This solvable's identity tuple as `(name, arch)`, the key used for
    /// installed-repo uniqueness (spec §3).
    #[must_use]
    pub fn name_arch(&self) -> (&str, &str) {
        (&self.name, &self.architecture)
    }

    /// Does this solvable (by its own identity, or one of its `Provides:`)
    /// satisfy `atom`?
    #[must_use]
    pub fn satisfies(&self, atom: &Atom) -> bool {
        if atom.satisfied_by(&self.name, Some(&self.version)) {
            return true;
        }
        self.provides
            .iter()
            .any(|p| atom.satisfied_by(&p.name, p.constraint.as_ref().map(|(_, v)| v)))
    }
}

/// What the resolver/user wants done with an installed package (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Want {
    #[default]
    Unknown,
    Install,
    Deinstall,
    Purge,
}

/// Install-state bits (spec §3). `FilelistChanged` and `Changed` are
/// volatile and never persisted to the status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Ok,
    Reinstreq,
    Hold,
    Replace,
    Noprune,
    Prefer,
    Obsolete,
    User,
    FilelistChanged,
    Changed,
}

/// A set of [`Flag`] bits, backed by a `u16` bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagSet(u16);

impl Flag {
    const fn bit(self) -> u16 {
        1 << (self as u8)
    }

    /// True for flags that are never written to the status file (spec §3).
    #[must_use]
    pub const fn is_volatile(self) -> bool {
        matches!(self, Self::FilelistChanged | Self::Changed)
    }
}

impl FlagSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, flag: Flag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn insert(&mut self, flag: Flag) {
        self.0 |= flag.bit();
    }

    pub fn remove(&mut self, flag: Flag) {
        self.0 &= !flag.bit();
    }

    /// This flag set with every volatile flag cleared, for persistence
    /// (spec §3, §4.4).
    #[must_use]
    pub fn persistable(self) -> Self {
        let mut out = self;
        out.remove(Flag::FilelistChanged);
        out.remove(Flag::Changed);
        out
    }

    /// All set flags, in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Flag> {
        const ALL: [Flag; 10] = [
            Flag::Ok,
            Flag::Reinstreq,
            Flag::Hold,
            Flag::Replace,
            Flag::Noprune,
            Flag::Prefer,
            Flag::Obsolete,
            Flag::User,
            Flag::FilelistChanged,
            Flag::Changed,
        ];
        ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<T: IntoIterator<Item = Flag>>(iter: T) -> Self {
        let mut out = Self::empty();
        for f in iter {
            out.insert(f);
        }
        out
    }
}

/// Install-state machine position (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    NotInstalled,
    Unpacked,
    HalfConfigured,
    Installed,
    HalfInstalled,
    ConfigFiles,
    PostInstFailed,
    RemovalFailed,
}

impl Status {
    /// The on-disk `Status:` field's three-word rendering, e.g.
    /// `"install ok installed"` (spec §4.4, §4.10).
    #[must_use]
    pub fn as_field_word(self) -> &'static str {
        match self {
            Self::NotInstalled => "not-installed",
            Self::Unpacked => "unpacked",
            Self::HalfConfigured => "half-configured",
            Self::Installed => "installed",
            Self::HalfInstalled => "half-installed",
            Self::ConfigFiles => "config-files",
            Self::PostInstFailed => "post-inst-failed",
            Self::RemovalFailed => "removal-failed",
        }
    }

    /// Parse the third word of a `Status:` field.
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        Some(match word {
            "not-installed" => Self::NotInstalled,
            "unpacked" => Self::Unpacked,
            "half-configured" => Self::HalfConfigured,
            "installed" => Self::Installed,
            "half-installed" => Self::HalfInstalled,
            "config-files" => Self::ConfigFiles,
            "post-inst-failed" => Self::PostInstFailed,
            "removal-failed" => Self::RemovalFailed,
            _ => return None,
        })
    }

    /// Terminal states needing no further action (spec §4.10).
    #[must_use]
    pub const fn is_terminal_success(self) -> bool {
        matches!(self, Self::Installed | Self::NotInstalled)
    }
}

/// `(want, flag, status)` attached to a solvable once it is part of the
/// installed repo (spec §3).
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageState {
    pub want: Want,
    pub flag: FlagSet,
    pub status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flagset_roundtrips_insert_remove() {
        let mut flags = FlagSet::empty();
        flags.insert(Flag::Hold);
        assert!(flags.contains(Flag::Hold));
        flags.remove(Flag::Hold);
        assert!(!flags.contains(Flag::Hold));
    }

    #[test]
    fn persistable_drops_volatile_flags() {
        let flags: FlagSet = [Flag::Hold, Flag::Changed, Flag::FilelistChanged]
            .into_iter()
            .collect();
        let persisted = flags.persistable();
        assert!(persisted.contains(Flag::Hold));
        assert!(!persisted.contains(Flag::Changed));
        assert!(!persisted.contains(Flag::FilelistChanged));
    }

    #[test]
    fn status_field_word_round_trips() {
        for s in [
            Status::NotInstalled,
            Status::Unpacked,
            Status::HalfConfigured,
            Status::Installed,
            Status::HalfInstalled,
            Status::ConfigFiles,
            Status::PostInstFailed,
            Status::RemovalFailed,
        ] {
            assert_eq!(Status::parse(s.as_field_word()), Some(s));
        }
    }
}
