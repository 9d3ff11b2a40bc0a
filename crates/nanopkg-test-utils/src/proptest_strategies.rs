//! Proptest strategies generating arbitrary valid versions and dependency
//! atoms for the version-algebra invariants in spec §8.

use proptest::prelude::*;

/// A single upstream-version segment: digits, letters, `.`, `~` or `+`, the
/// characters `Version::parse` accepts in `upstream`/`revision`.
fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9~+.]{1,12}".prop_filter("non-empty after trim", |s| !s.is_empty())
}

/// A full `Version` string: optional `epoch:`, an upstream segment, and an
/// optional `-revision` suffix.
pub fn version_string_strategy() -> impl Strategy<Value = String> {
    (
        proptest::option::of(0u32..5),
        segment_strategy(),
        proptest::option::of(segment_strategy()),
    )
        .prop_map(|(epoch, upstream, revision)| {
            let mut s = String::new();
            if let Some(e) = epoch {
                s.push_str(&e.to_string());
                s.push(':');
            }
            s.push_str(&upstream);
            if let Some(r) = revision {
                s.push('-');
                s.push_str(&r);
            }
            s
        })
}

/// A bare package name: lowercase letters, digits and `-`/`+`/`.`, matching
/// the charset real `Packages` indices use.
pub fn package_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9+.-]{0,20}"
}

/// An `Op` token as it appears in a dependency atom (`<<`, `<=`, `=`, `>=`,
/// `>>`).
pub fn op_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof!["<<", "<=", "=", ">=", ">>"]
}

/// A single dependency atom string: `name`, or `name (op version)`.
pub fn atom_string_strategy() -> impl Strategy<Value = String> {
    (
        package_name_strategy(),
        proptest::option::of((op_strategy(), version_string_strategy())),
    )
        .prop_map(|(name, constraint)| match constraint {
            Some((op, version)) => format!("{name} ({op} {version})"),
            None => name,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanopkg_version::{Atom, Version};

    proptest! {
        #[test]
        fn generated_versions_always_parse(s in version_string_strategy()) {
            prop_assert!(Version::parse(&s).is_ok());
        }

        #[test]
        fn generated_atoms_always_parse(s in atom_string_strategy()) {
            prop_assert!(Atom::parse(&s).is_ok());
        }
    }
}
