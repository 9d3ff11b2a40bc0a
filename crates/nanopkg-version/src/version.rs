//! Debian-style version parsing and comparison.
//!
//! A version is `[epoch:]upstream-version[-revision]`. Comparison proceeds
//! epoch, then upstream-version, then revision, each upstream/revision
//! segment compared with `verrevcmp` (spec §4.1).

use std::cmp::Ordering;
use std::fmt;

use nanopkg_core::Error;

/// A parsed Debian-style version: `epoch:upstream-revision`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    epoch: u32,
    upstream: String,
    revision: String,
}

impl Version {
    /// Build a version directly from its three segments.
    #[must_use]
    pub fn new(epoch: u32, upstream: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            epoch,
            upstream: upstream.into(),
            revision: revision.into(),
        }
    }

    /// Parse a version string. Epoch defaults to 0 if absent; revision
    /// defaults to the empty string if there is no `-` in the remainder.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let (epoch, rest) = match s.split_once(':') {
            Some((epoch_str, rest)) => {
                let epoch = epoch_str
                    .parse::<u32>()
                    .map_err(|_| Error::parse(format!("invalid epoch in version '{s}'")))?;
                (epoch, rest)
            }
            None => (0, s),
        };
        if rest.is_empty() {
            return Err(Error::parse(format!("empty version after epoch in '{s}'")));
        }
        let (upstream, revision) = match rest.rfind('-') {
            Some(idx) => (rest[..idx].to_string(), rest[idx + 1..].to_string()),
            None => (rest.to_string(), String::new()),
        };
        if upstream.is_empty() {
            return Err(Error::parse(format!("empty upstream version in '{s}'")));
        }
        Ok(Self {
            epoch,
            upstream,
            revision,
        })
    }

    /// The epoch, defaulting to 0.
    #[must_use]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// The upstream version segment.
    #[must_use]
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// The revision segment, empty string if none was present.
    #[must_use]
    pub fn revision(&self) -> &str {
        &self.revision
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.upstream)?;
        if !self.revision.is_empty() {
            write!(f, "-{}", self.revision)?;
        }
        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| verrevcmp(self.upstream.as_bytes(), other.upstream.as_bytes()).cmp(&0))
            .then_with(|| verrevcmp(self.revision.as_bytes(), other.revision.as_bytes()).cmp(&0))
    }
}

/// `order()` from the Debian version comparison algorithm: `~` sorts below
/// everything, digits and end-of-string tie at 0, letters sort by ASCII
/// value, everything else sorts at `value + 256` (above letters and
/// digits).
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(c) => i32::from(c) + 256,
    }
}

/// Compare two version segments (upstream or revision) by the Debian rule:
/// alternating non-digit runs (compared via [`order`]) and digit runs
/// (compared numerically, leading zeros ignored, tie-broken by the first
/// differing raw digit if the numeric values are otherwise equal).
fn verrevcmp(a: &[u8], b: &[u8]) -> i32 {
    let mut ai = 0usize;
    let mut bi = 0usize;
    while ai < a.len() || bi < b.len() {
        loop {
            let ac = a.get(ai).copied();
            let bc = b.get(bi).copied();
            let a_nondigit = ac.is_some_and(|c| !c.is_ascii_digit());
            let b_nondigit = bc.is_some_and(|c| !c.is_ascii_digit());
            if !(a_nondigit || b_nondigit) {
                break;
            }
            let ao = order(ac);
            let bo = order(bc);
            if ao != bo {
                return ao - bo;
            }
            ai += 1;
            bi += 1;
        }
        while a.get(ai) == Some(&b'0') {
            ai += 1;
        }
        while b.get(bi) == Some(&b'0') {
            bi += 1;
        }
        let mut first_diff = 0i32;
        while a.get(ai).is_some_and(u8::is_ascii_digit) && b.get(bi).is_some_and(u8::is_ascii_digit)
        {
            if first_diff == 0 {
                first_diff = i32::from(a[ai]) - i32::from(b[bi]);
            }
            ai += 1;
            bi += 1;
        }
        if a.get(ai).is_some_and(u8::is_ascii_digit) {
            return 1;
        }
        if b.get(bi).is_some_and(u8::is_ascii_digit) {
            return -1;
        }
        if first_diff != 0 {
            return first_diff;
        }
    }
    0
}
