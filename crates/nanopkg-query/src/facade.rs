//! `list` / `info` / `files` / `search` (spec §4.9).

use std::path::{Path, PathBuf};

use nanopkg_core::{Error, Result, Stanza};
use nanopkg_pool::{Pool, SolvableId};

/// A read-only handle bundling the pieces `files`/`search` need beyond the
/// pool itself: the active destination's `info_dir`, where per-package
/// `.list` manifests live (spec §4.4, §4.9).
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub pool: &'a Pool,
    pub info_dir: &'a Path,
}

impl<'a> Query<'a> {
    #[must_use]
    pub fn new(pool: &'a Pool, info_dir: &'a Path) -> Self {
        Self { pool, info_dir }
    }

    /// `list` / `list-installed`: solvables matching `pattern` (a shell
    /// glob over the name, `None` matches everything), sorted by name
    /// (spec §4.9).
    #[must_use]
    pub fn list(&self, pattern: Option<&str>, installed_only: bool) -> Vec<SolvableId> {
        list(self.pool, pattern, installed_only)
    }

    /// `info` / `status`: formatted control fields for `id` (spec §4.9).
    #[must_use]
    pub fn info(&self, id: SolvableId) -> String {
        format_info(self.pool, id)
    }

    /// `files <pkg>`: the installed file manifest for `pkg`, read from its
    /// `.list` file. `Ok(None)` if `pkg` is not installed — the CLI falls
    /// back to enumerating a local archive's data tarball in that case
    /// (spec §4.9).
    ///
    /// # Errors
    /// Returns a `FilesystemError` if `pkg` is installed but its `.list`
    /// file cannot be read.
    pub fn files(&self, pkg: &str) -> Result<Option<Vec<PathBuf>>> {
        if !self.pool.installed_ids().any(|id| self.pool.solvable(id).name == pkg) {
            return Ok(None);
        }
        nanopkg_status::list::read_list_file(self.info_dir, pkg).map(Some)
    }

    /// `search <glob>`: every `(package, path)` pair among installed
    /// packages whose installed file path matches `pattern` (spec §4.9).
    #[must_use]
    pub fn search(&self, pattern: &str) -> Vec<(String, PathBuf)> {
        search(self.pool, self.info_dir, pattern)
    }
}

/// Solvables matching `pattern` (name glob, `None` = all), sorted by name
/// (spec §4.9 `list`/`list_installed`).
#[must_use]
pub fn list(pool: &Pool, pattern: Option<&str>, installed_only: bool) -> Vec<SolvableId> {
    let glob = pattern.and_then(|p| glob::Pattern::new(p).ok());
    let ids: Box<dyn Iterator<Item = SolvableId>> = if installed_only {
        Box::new(pool.installed_ids())
    } else {
        Box::new(pool.all_ids())
    };
    let mut matches: Vec<SolvableId> = ids
        .filter(|&id| match &glob {
            Some(g) => g.matches(&pool.solvable(id).name),
            None => true,
        })
        .collect();
    matches.sort_by(|&a, &b| pool.solvable(a).name.cmp(&pool.solvable(b).name));
    matches
}

/// Solvable ids whose name exactly matches `name`, across every repo
/// (helper shared by the reverse-lookup queries).
#[must_use]
pub fn matching_ids(pool: &Pool, name: &str) -> Vec<SolvableId> {
    pool.all_ids().filter(|&id| pool.solvable(id).name == name).collect()
}

/// Render `id`'s control fields as a stanza, including the installed
/// `Status`/`Auto-Installed` fields when the solvable belongs to the
/// installed repo (spec §4.9 `info`/`status`).
#[must_use]
pub fn format_info(pool: &Pool, id: SolvableId) -> String {
    let s = pool.solvable(id);
    let mut stanza = Stanza::new();
    stanza.set("Package", &s.name);
    stanza.set("Version", s.version.to_string());
    stanza.set("Architecture", &s.architecture);
    if !s.maintainer.is_empty() {
        stanza.set("Maintainer", &s.maintainer);
    }
    if s.installed_size > 0 {
        stanza.set("Installed-Size", s.installed_size.to_string());
    }
    if s.download_size > 0 {
        stanza.set("Size", s.download_size.to_string());
    }
    if !s.depends.0.is_empty() {
        stanza.set("Depends", render_conjunction(&s.depends));
    }
    if !s.provides.is_empty() {
        let rendered = s
            .provides
            .iter()
            .map(std::string::ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        stanza.set("Provides", rendered);
    }
    if !s.conflicts.0.is_empty() {
        stanza.set("Conflicts", render_conjunction(&s.conflicts));
    }
    if !s.url.is_empty() {
        stanza.set("URL", &s.url);
    }
    if let Some(state) = s.state {
        if pool.is_installed_repo(s.repo) {
            stanza.set("Status", state.status.as_field_word());
        }
    }
    if !s.description.is_empty() {
        stanza.set("Description", &s.description);
    }
    stanza.render()
}

fn render_conjunction(conjunction: &nanopkg_version::Conjunction) -> String {
    conjunction
        .0
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

/// `search <glob>`: scan every installed package's `.list` file for a path
/// matching `pattern` via shell-style wildcards (spec §4.9).
#[must_use]
pub fn search(pool: &Pool, info_dir: &Path, pattern: &str) -> Vec<(String, PathBuf)> {
    let Ok(glob) = glob::Pattern::new(pattern) else {
        return Vec::new();
    };
    let mut hits = Vec::new();
    for id in pool.installed_ids() {
        let name = pool.solvable(id).name.clone();
        let Ok(paths) = nanopkg_status::list::read_list_file(info_dir, &name) else {
            continue;
        };
        for path in paths {
            if glob.matches(&path.display().to_string()) {
                hits.push((name.clone(), path));
            }
        }
    }
    hits
}

/// `files <pkg>` fallback for a package that isn't installed: enumerate a
/// local archive's data tarball (spec §4.9).
///
/// # Errors
/// See [`nanopkg_archive::list_data_paths`].
pub fn files_from_archive(archive_path: &Path) -> Result<Vec<PathBuf>> {
    nanopkg_archive::list_data_paths(archive_path)
}

/// Convenience wrapper turning a missing `Query::files` hit into a proper
/// `ParseError` ("package not installed and no local archive given"), for
/// callers that don't have an archive path to fall back to.
///
/// # Errors
/// Returns a `ParseError` if `pkg` is not installed.
pub fn require_installed_files(query: &Query<'_>, pkg: &str) -> Result<Vec<PathBuf>> {
    query
        .files(pkg)?
        .ok_or_else(|| Error::parse(format!("package '{pkg}' is not installed")))
}
