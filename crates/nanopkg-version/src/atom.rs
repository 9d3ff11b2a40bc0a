//! Dependency atom algebra: `name [(op version)]`, conjunctions of
//! alternations, and atom-satisfaction against a provide (spec §4.1).

use std::cmp::Ordering;
use std::fmt;

use nanopkg_core::Error;

use crate::version::Version;

/// A relational operator between a named atom and a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `<<`
    Lt,
    /// `<=`
    Le,
    /// `=`
    Eq,
    /// `>=`
    Ge,
    /// `>>`
    Gt,
}

impl Op {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "<<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "=" => Some(Self::Eq),
            ">=" => Some(Self::Ge),
            ">>" => Some(Self::Gt),
            _ => None,
        }
    }

    /// Does `cmp` (the result of comparing a candidate version to the
    /// atom's version) satisfy this operator?
    #[must_use]
    pub fn matches(self, cmp: Ordering) -> bool {
        match self {
            Self::Lt => cmp == Ordering::Less,
            Self::Le => cmp != Ordering::Greater,
            Self::Eq => cmp == Ordering::Equal,
            Self::Ge => cmp != Ordering::Less,
            Self::Gt => cmp == Ordering::Greater,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lt => "<<",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ge => ">=",
            Self::Gt => ">>",
        };
        write!(f, "{s}")
    }
}

/// A single dependency atom: a package name with an optional version
/// constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub name: String,
    pub constraint: Option<(Op, Version)>,
}

impl Atom {
    /// Parse one atom: `name` or `name (op version)`.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        let Some(paren_start) = s.find('(') else {
            let name = s.trim();
            if name.is_empty() {
                return Err(Error::parse("empty dependency atom"));
            }
            return Ok(Self {
                name: name.to_string(),
                constraint: None,
            });
        };
        let name = s[..paren_start].trim();
        if name.is_empty() {
            return Err(Error::parse(format!("empty package name in atom '{s}'")));
        }
        let rest = s[paren_start + 1..]
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| Error::parse(format!("unterminated constraint in atom '{s}'")))?
            .trim();
        let (op_str, version_str) = rest
            .split_once(|c: char| c.is_whitespace())
            .ok_or_else(|| Error::parse(format!("malformed constraint in atom '{s}'")))?;
        let op = Op::parse(op_str)
            .ok_or_else(|| Error::parse(format!("unknown relation operator '{op_str}' in '{s}'")))?;
        let version = Version::parse(version_str.trim())?;
        Ok(Self {
            name: name.to_string(),
            constraint: Some((op, version)),
        })
    }

    /// Does a provide named `provide_name` with optional `provide_version`
    /// satisfy this atom? (spec §4.1: an unversioned provide only
    /// satisfies an unconstrained atom.)
    #[must_use]
    pub fn satisfied_by(&self, provide_name: &str, provide_version: Option<&Version>) -> bool {
        if self.name != provide_name {
            return false;
        }
        match &self.constraint {
            None => true,
            Some((op, required)) => match provide_version {
                Some(actual) => op.matches(actual.cmp(required)),
                None => false,
            },
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some((op, version)) = &self.constraint {
            write!(f, " ({op} {version})")?;
        }
        Ok(())
    }
}

/// A disjunction of atoms (`a | b`): satisfied if any alternative is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternation(pub Vec<Atom>);

impl Alternation {
    /// Parse `a | b | c`.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let atoms = s
            .split('|')
            .map(Atom::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if atoms.is_empty() {
            return Err(Error::parse("empty alternation"));
        }
        Ok(Self(atoms))
    }
}

/// A conjunction of alternations (`Depends:` field value): every
/// alternation must be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Conjunction(pub Vec<Alternation>);

impl Conjunction {
    /// Parse a `Depends:`/`Conflicts:`/`Replaces:`-style field value: a
    /// comma-separated list of (possibly `|`-separated) atoms. An empty or
    /// all-whitespace field parses to an empty conjunction.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        let alternations = s
            .split(',')
            .map(|part| Alternation::parse(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(alternations))
    }

    /// Parse a `Provides:` field value: a comma-separated list of pure
    /// atoms (no `|` alternation is meaningful for provides).
    pub fn parse_provides(s: &str) -> Result<Vec<Atom>, Error> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Vec::new());
        }
        s.split(',').map(|part| Atom::parse(part.trim())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_atom() {
        let atom = Atom::parse("libfoo").unwrap();
        assert_eq!(atom.name, "libfoo");
        assert!(atom.constraint.is_none());
    }

    #[test]
    fn parses_versioned_atom() {
        let atom = Atom::parse("libfoo (>= 1.2.0)").unwrap();
        assert_eq!(atom.name, "libfoo");
        let (op, version) = atom.constraint.unwrap();
        assert_eq!(op, Op::Ge);
        assert_eq!(version.to_string(), "1.2.0");
    }

    #[test]
    fn unconstrained_atom_satisfied_by_any_version() {
        let atom = Atom::parse("libfoo").unwrap();
        let v = Version::parse("9.9").unwrap();
        assert!(atom.satisfied_by("libfoo", Some(&v)));
        assert!(atom.satisfied_by("libfoo", None));
    }

    #[test]
    fn versioned_atom_rejects_unversioned_provide() {
        let atom = Atom::parse("libfoo (= 1.0)").unwrap();
        assert!(!atom.satisfied_by("libfoo", None));
    }

    #[test]
    fn versioned_atom_checks_relation() {
        let atom = Atom::parse("libfoo (>= 1.0)").unwrap();
        let older = Version::parse("0.9").unwrap();
        let newer = Version::parse("1.5").unwrap();
        assert!(!atom.satisfied_by("libfoo", Some(&older)));
        assert!(atom.satisfied_by("libfoo", Some(&newer)));
    }

    #[test]
    fn parses_conjunction_of_alternations() {
        let conj = Conjunction::parse("a (>= 1.0), b | c").unwrap();
        assert_eq!(conj.0.len(), 2);
        assert_eq!(conj.0[0].0.len(), 1);
        assert_eq!(conj.0[1].0.len(), 2);
    }

    #[test]
    fn empty_field_parses_to_empty_conjunction() {
        let conj = Conjunction::parse("  ").unwrap();
        assert!(conj.0.is_empty());
    }
}
