//! Parsing and rendering of Debian-style control stanzas.
//!
//! A control stanza is an ordered sequence of `Field: value` lines, where a
//! value may continue on following lines that start with whitespace (used
//! for `Conffiles:`, `Description:` and similar multi-line fields). Stanzas
//! are separated by one or more blank lines. This module is the shared
//! primitive behind the `Packages` index format, the `Release` manifest
//! format, and the installed-package status file format (spec §6).

use crate::error::{Error, Result};

/// One parsed control stanza: an ordered list of `(field, value)` pairs.
///
/// Field names are matched case-insensitively on lookup but the original
/// casing is preserved for re-serialization. Continuation lines are joined
/// into the value with embedded `\n` separators, continuation indentation
/// stripped to a single leading space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    fields: Vec<(String, String)>,
}

impl Stanza {
    /// An empty stanza.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a field by name, case-insensitively. Returns the first match
    /// in insertion order.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a field, appending it if not already present, otherwise
    /// replacing the first occurrence in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self
            .fields
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Remove a field by name, if present.
    pub fn remove(&mut self, name: &str) {
        self.fields.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Iterate the fields in original insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True if the stanza has no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render back into the on-disk stanza format, one field per line and
    /// multi-line values re-indented by one space per continuation line.
    /// Does not append the trailing blank-line stanza separator; callers
    /// join rendered stanzas with `"\n"`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.fields {
            out.push_str(k);
            out.push_str(": ");
            let mut lines = v.split('\n');
            if let Some(first) = lines.next() {
                out.push_str(first);
            }
            for cont in lines {
                out.push('\n');
                out.push(' ');
                out.push_str(cont);
            }
            out.push('\n');
        }
        out
    }
}

/// Parse every stanza out of `text`, skipping blank runs between them.
///
/// A stanza that fails to parse (a continuation line with no preceding
/// field) is reported as a [`Error::parse`] in the returned vector rather
/// than aborting the whole index; per spec §7 the caller logs and skips it,
/// continuing with the rest of the text.
pub fn parse_many(text: &str) -> Vec<Result<Stanza>> {
    let mut out = Vec::new();
    let mut current: Option<Stanza> = None;
    let mut pending_error = false;

    let flush = |current: &mut Option<Stanza>, pending_error: &mut bool, out: &mut Vec<Result<Stanza>>| {
        if *pending_error {
            out.push(Err(Error::parse("continuation line with no preceding field")));
        } else if let Some(stanza) = current.take() {
            if !stanza.is_empty() {
                out.push(Ok(stanza));
            }
        }
        *pending_error = false;
    };

    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut current, &mut pending_error, &mut out);
            current = None;
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            let cont = line.trim_start();
            match current.as_mut().and_then(|s| s.fields.last_mut()) {
                Some((_, value)) => {
                    value.push('\n');
                    value.push_str(cont);
                }
                None => pending_error = true,
            }
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            pending_error = true;
            continue;
        };
        current
            .get_or_insert_with(Stanza::new)
            .fields
            .push((name.trim().to_string(), value.trim().to_string()));
    }
    flush(&mut current, &mut pending_error, &mut out);
    out
}

/// Render a sequence of stanzas back into index/status-file text, each
/// separated by a blank line, with a trailing blank line after the last
/// stanza (spec §4.4 "ending with a blank line").
#[must_use]
pub fn render_many<'a>(stanzas: impl IntoIterator<Item = &'a Stanza>) -> String {
    let mut out = String::new();
    for stanza in stanzas {
        out.push_str(&stanza.render());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_stanza() {
        let text = "Package: foo\nVersion: 1.0\n\n";
        let stanzas = parse_many(text);
        assert_eq!(stanzas.len(), 1);
        let s = stanzas[0].as_ref().unwrap();
        assert_eq!(s.get("package"), Some("foo"));
        assert_eq!(s.get("Version"), Some("1.0"));
    }

    #[test]
    fn parses_multiline_conffiles() {
        let text = "Package: x\nConffiles:\n /etc/x.conf abcd1234\n /etc/y.conf beef0000\n\n";
        let stanzas = parse_many(text);
        let s = stanzas[0].as_ref().unwrap();
        let conffiles = s.get("Conffiles").unwrap();
        assert_eq!(conffiles, "\n/etc/x.conf abcd1234\n/etc/y.conf beef0000");
    }

    #[test]
    fn separates_multiple_stanzas() {
        let text = "Package: a\n\nPackage: b\n\n";
        let stanzas = parse_many(text);
        assert_eq!(stanzas.len(), 2);
        assert_eq!(stanzas[0].as_ref().unwrap().get("Package"), Some("a"));
        assert_eq!(stanzas[1].as_ref().unwrap().get("Package"), Some("b"));
    }

    #[test]
    fn continuation_without_field_is_parse_error() {
        let text = " dangling continuation\n\n";
        let stanzas = parse_many(text);
        assert_eq!(stanzas.len(), 1);
        assert!(stanzas[0].is_err());
    }

    #[test]
    fn round_trips_through_render() {
        let mut s = Stanza::new();
        s.set("Package", "foo");
        s.set("Version", "1.0");
        let rendered = render_many(std::iter::once(&s));
        let reparsed = parse_many(&rendered);
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed[0].as_ref().unwrap(), &s);
    }
}
