//! The `Pool`: the unified store of solvables across every repository plus
//! the installed repo, with interning and `whatprovides` indices (spec §4.2).

use ahash::AHashMap;

use nanopkg_core::{Error, Result};
use nanopkg_version::Atom;

use crate::solvable::{PackageState, RepoId, Solvable, SolvableId};

/// One named, priority-ordered subset of the pool's solvables (spec §3
/// `Repo`). Frozen by [`Pool::internalize`]; no more solvables may be added
/// to a frozen repo.
#[derive(Debug, Clone)]
pub struct Repo {
    pub id: RepoId,
    pub name: String,
    pub priority: i64,
    pub frozen: bool,
    pub members: Vec<SolvableId>,
}

/// A simple string interner: stable `u32` ids for names/versions/relation
/// atoms so identity comparison within a pool is O(1) (spec §4.2).
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<String>,
    ids: AHashMap<String, u32>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning a stable id. Repeated calls with the same
    /// string return the same id.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.ids.insert(s.to_string(), id);
        id
    }

    /// Resolve a previously interned id back to its string.
    #[must_use]
    pub fn resolve(&self, id: u32) -> &str {
        &self.strings[id as usize]
    }

    /// Look up an id without interning; `None` if never interned.
    #[must_use]
    pub fn lookup(&self, s: &str) -> Option<u32> {
        self.ids.get(s).copied()
    }
}

/// The name reserved for the distinguished installed repo (spec §3).
pub const INSTALLED_REPO_NAME: &str = "installed";

/// The unified store of solvables across every repository plus the
/// installed repo (spec §3, §4.2).
#[derive(Debug)]
pub struct Pool {
    interner: Interner,
    repos: Vec<Repo>,
    solvables: Vec<Solvable>,
    installed_repo: RepoId,
    /// `(name, relation-atom) -> providers`, built by [`Self::create_whatprovides`].
    whatprovides_index: AHashMap<u32, Vec<SolvableId>>,
    /// Architecture priority table (name -> priority), spec §3.
    arch_priority: AHashMap<String, u32>,
    /// Restricts the universe when set (spec §4.2 `considered`); solvables
    /// not in this set are excluded from `whatprovides` and from a freshly
    /// built index.
    considered: Option<Vec<bool>>,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// A fresh, empty pool with just the installed repo created.
    #[must_use]
    pub fn new() -> Self {
        let mut repos = Vec::new();
        let installed_repo = RepoId(0);
        repos.push(Repo {
            id: installed_repo,
            name: INSTALLED_REPO_NAME.to_string(),
            // Highest priority so the whatprovides tie-break ("installed
            // first") falls out of the ordinary priority comparison.
            priority: i64::MAX,
            frozen: false,
            members: Vec::new(),
        });
        Self {
            interner: Interner::new(),
            repos,
            solvables: Vec::new(),
            installed_repo,
            whatprovides_index: AHashMap::new(),
            arch_priority: AHashMap::new(),
            considered: None,
        }
    }

    /// Intern a string, stable within this pool (spec §4.2 `intern`).
    pub fn intern(&mut self, s: &str) -> u32 {
        self.interner.intern(s)
    }

    /// Configure the architecture priority table used to order
    /// `whatprovides` results and to reject install-ineligible archs
    /// (spec §3).
    pub fn set_architectures(&mut self, table: &[(String, u32)]) {
        self.arch_priority = table.iter().cloned().collect();
    }

    /// The id of the distinguished installed repo.
    #[must_use]
    pub fn installed_repo(&self) -> RepoId {
        self.installed_repo
    }

    /// Register a new non-installed repo with the given priority (higher
    /// sorts first in `whatprovides`).
    pub fn add_repo(&mut self, name: &str, priority: i64) -> RepoId {
        let id = RepoId(self.repos.len() as u32);
        self.repos.push(Repo {
            id,
            name: name.to_string(),
            priority,
            frozen: false,
            members: Vec::new(),
        });
        id
    }

    #[must_use]
    pub fn repo(&self, id: RepoId) -> &Repo {
        &self.repos[id.0 as usize]
    }

    /// Register a solvable under `repo`. Fails if the repo has already
    /// been [`Self::internalize`]d.
    pub fn add_solvable(&mut self, repo: RepoId, solvable: Solvable) -> Result<SolvableId> {
        if self.repos[repo.0 as usize].frozen {
            return Err(Error::parse(format!(
                "cannot add solvable to frozen repo '{}'",
                self.repos[repo.0 as usize].name
            )));
        }
        let id = SolvableId(self.solvables.len() as u32);
        self.solvables.push(solvable);
        self.repos[repo.0 as usize].members.push(id);
        Ok(id)
    }

    /// Add (or replace) an installed solvable, enforcing the invariant of
    /// at most one solvable per `(name, architecture)` in the installed
    /// repo. Duplicates are de-duplicated by keeping the *last* entry
    /// (spec §3). Returns `(id, replaced)`, `replaced` set when an earlier
    /// entry for the same `(name, arch)` was evicted — callers mark their
    /// destination dirty in that case.
    pub fn add_installed(&mut self, mut solvable: Solvable) -> (SolvableId, bool) {
        solvable.state.get_or_insert_with(PackageState::default);
        let (name, arch) = (solvable.name.clone(), solvable.architecture.clone());
        let existing = self.repos[self.installed_repo.0 as usize]
            .members
            .iter()
            .copied()
            .find(|&id| self.solvables[id.0 as usize].name_arch() == (name.as_str(), arch.as_str()));

        if let Some(old_id) = existing {
            self.solvables[old_id.0 as usize] = solvable;
            (old_id, true)
        } else {
            let id = SolvableId(self.solvables.len() as u32);
            self.solvables.push(solvable);
            self.repos[self.installed_repo.0 as usize].members.push(id);
            (id, false)
        }
    }

    /// Remove a solvable from the installed repo (spec §4.7 erase step).
    /// The slot is retained (never compacted, to keep ids stable) but
    /// removed from the repo's member list and the whatprovides index is
    /// left stale until the next [`Self::create_whatprovides`].
    pub fn remove_installed(&mut self, id: SolvableId) {
        self.repos[self.installed_repo.0 as usize]
            .members
            .retain(|&m| m != id);
    }

    /// Freeze a repo and make its solvables visible to future
    /// `whatprovides` queries; required before querying (spec §4.2).
    pub fn internalize(&mut self, repo: RepoId) {
        self.repos[repo.0 as usize].frozen = true;
    }

    #[must_use]
    pub fn solvable(&self, id: SolvableId) -> &Solvable {
        &self.solvables[id.0 as usize]
    }

    pub fn solvable_mut(&mut self, id: SolvableId) -> &mut Solvable {
        &mut self.solvables[id.0 as usize]
    }

    /// Iterate every solvable id currently in the pool (across all repos).
    pub fn all_ids(&self) -> impl Iterator<Item = SolvableId> + '_ {
        (0..self.solvables.len() as u32).map(SolvableId)
    }

    /// Iterate every installed solvable id.
    pub fn installed_ids(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.repos[self.installed_repo.0 as usize]
            .members
            .iter()
            .copied()
    }

    /// Restrict the universe `whatprovides` considers (spec §4.2
    /// `considered`); `None` removes the restriction.
    pub fn set_considered(&mut self, ids: Option<Vec<SolvableId>>) {
        self.considered = ids.map(|allowed| {
            let mut mask = vec![false; self.solvables.len()];
            for id in allowed {
                mask[id.0 as usize] = true;
            }
            mask
        });
    }

    #[must_use]
    pub fn is_considered(&self, id: SolvableId) -> bool {
        match &self.considered {
            Some(mask) => mask.get(id.0 as usize).copied().unwrap_or(false),
            None => true,
        }
    }

    /// Rebuild the global `whatprovides` index from every solvable's own
    /// name and `Provides:` entries (spec §4.2 `create_whatprovides`).
    pub fn create_whatprovides(&mut self) {
        self.whatprovides_index.clear();
        for (idx, solvable) in self.solvables.iter().enumerate() {
            let id = SolvableId(idx as u32);
            if !self.is_considered(id) {
                continue;
            }
            let name_id = self.interner.intern(&solvable.name);
            self.whatprovides_index.entry(name_id).or_default().push(id);
            for provide in &solvable.provides {
                let provide_id = self.interner.intern(&provide.name);
                self.whatprovides_index
                    .entry(provide_id)
                    .or_default()
                    .push(id);
            }
        }
    }

    fn arch_priority(&self, arch: &str) -> u32 {
        self.arch_priority.get(arch).copied().unwrap_or(0)
    }

    /// Solvables satisfying `atom`, ordered: installed first, then by repo
    /// priority descending, then by architecture priority descending, then
    /// by version descending (spec §4.2).
    #[must_use]
    pub fn whatprovides(&self, atom: &Atom) -> Vec<SolvableId> {
        let Some(name_id) = self.interner.lookup(&atom.name) else {
            return Vec::new();
        };
        let Some(candidates) = self.whatprovides_index.get(&name_id) else {
            return Vec::new();
        };
        let mut matches: Vec<SolvableId> = candidates
            .iter()
            .copied()
            .filter(|&id| self.is_considered(id))
            .filter(|&id| self.solvables[id.0 as usize].satisfies(atom))
            .collect();
        matches.sort_by(|&a, &b| {
            let sa = &self.solvables[a.0 as usize];
            let sb = &self.solvables[b.0 as usize];
            let repo_a = &self.repos[sa.repo.0 as usize];
            let repo_b = &self.repos[sb.repo.0 as usize];
            repo_a
                .priority
                .cmp(&repo_b.priority)
                .then_with(|| self.arch_priority(&sa.architecture).cmp(&self.arch_priority(&sb.architecture)))
                .then_with(|| sa.version.cmp(&sb.version))
                .then_with(|| repo_a.name.cmp(&repo_b.name))
                .reverse()
        });
        matches
    }

    /// Is `arch` present in the configured architecture table (spec §3
    /// "install eligibility")?
    #[must_use]
    pub fn is_known_architecture(&self, arch: &str) -> bool {
        self.arch_priority.contains_key(arch)
    }

    /// The distinguished installed repo's tie-break priority; used by
    /// callers (e.g. the resolver) comparing a solvable's repo against it
    /// directly rather than through `whatprovides`.
    #[must_use]
    pub fn is_installed_repo(&self, repo: RepoId) -> bool {
        repo == self.installed_repo
    }
}
