//! Forward/reverse dependency-graph lookups over the provides index
//! (spec §4.9 `depends` / `whatdepends[rec]` / `whatprovides` /
//! `whatreplaces` / `whatconflicts` / `whatrecommends` / `whatsuggests`).

use ahash::AHashSet;

use nanopkg_pool::{Pool, SolvableId};
use nanopkg_version::{Atom, Conjunction};

/// `depends <pkg>`: every atom `id` requires, `Pre-Depends` first (spec
/// §4.9 forward lookup).
#[must_use]
pub fn depends(pool: &Pool, id: SolvableId) -> Vec<Atom> {
    let s = pool.solvable(id);
    flatten(&s.pre_depends)
        .into_iter()
        .chain(flatten(&s.depends))
        .collect()
}

/// `whatprovides <pkg>`: every solvable providing `atom`, in the pool's
/// standard ordering (installed first, then repo/arch/version priority;
/// spec §4.2, §4.9).
#[must_use]
pub fn whatprovides(pool: &Pool, atom: &Atom) -> Vec<SolvableId> {
    pool.whatprovides(atom)
}

/// `whatreplaces <pkg>`: every solvable whose `Replaces:` names `pkg`.
#[must_use]
pub fn whatreplaces(pool: &Pool, pkg: &str) -> Vec<SolvableId> {
    reverse_over(pool, pkg, |s| &s.replaces)
}

/// `whatconflicts <pkg>`: every solvable whose `Conflicts:` names `pkg`.
#[must_use]
pub fn whatconflicts(pool: &Pool, pkg: &str) -> Vec<SolvableId> {
    reverse_over(pool, pkg, |s| &s.conflicts)
}

/// `whatrecommends <pkg>`: every solvable whose `Recommends:` names `pkg`.
#[must_use]
pub fn whatrecommends(pool: &Pool, pkg: &str) -> Vec<SolvableId> {
    reverse_over(pool, pkg, |s| &s.recommends)
}

/// `whatsuggests <pkg>`: every solvable whose `Suggests:` names `pkg`.
#[must_use]
pub fn whatsuggests(pool: &Pool, pkg: &str) -> Vec<SolvableId> {
    reverse_over(pool, pkg, |s| &s.suggests)
}

/// `whatdepends[rec] <pkg>`: every solvable that `Depends:`/`Pre-Depends:`
/// on `pkg`. With `recursive`, continues from each hit's own name until no
/// new solvable is found ("continuing to saturation", spec §4.9).
#[must_use]
pub fn whatdepends(pool: &Pool, pkg: &str, recursive: bool) -> Vec<SolvableId> {
    let mut seen_names: AHashSet<String> = AHashSet::new();
    let mut frontier = vec![pkg.to_string()];
    let mut result_ids: Vec<SolvableId> = Vec::new();
    let mut seen_ids: AHashSet<SolvableId> = AHashSet::new();

    while let Some(name) = frontier.pop() {
        if !seen_names.insert(name.clone()) {
            continue;
        }
        let direct = reverse_over(pool, &name, |s| &s.depends)
            .into_iter()
            .chain(reverse_over(pool, &name, |s| &s.pre_depends));
        for id in direct {
            if seen_ids.insert(id) {
                result_ids.push(id);
                if recursive {
                    frontier.push(pool.solvable(id).name.clone());
                }
            }
        }
        if !recursive {
            break;
        }
    }
    result_ids
}

fn reverse_over(
    pool: &Pool,
    pkg: &str,
    select: impl Fn(&nanopkg_pool::Solvable) -> &Conjunction,
) -> Vec<SolvableId> {
    pool.all_ids()
        .filter(|&id| {
            select(pool.solvable(id))
                .0
                .iter()
                .flat_map(|alt| &alt.0)
                .any(|atom| atom.name == pkg)
        })
        .collect()
}

fn flatten(conjunction: &Conjunction) -> Vec<Atom> {
    conjunction.0.iter().flat_map(|alt| alt.0.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanopkg_pool::{RepoId, Solvable};
    use nanopkg_version::Version;

    fn bare(name: &str, repo: RepoId) -> Solvable {
        Solvable {
            name: name.to_string(),
            version: Version::parse("1.0").unwrap(),
            architecture: "all".to_string(),
            repo,
            depends: Conjunction::default(),
            pre_depends: Conjunction::default(),
            recommends: Conjunction::default(),
            suggests: Conjunction::default(),
            conflicts: Conjunction::default(),
            replaces: Conjunction::default(),
            provides: Vec::new(),
            obsoletes: Conjunction::default(),
            md5: None,
            sha256: None,
            download_size: 0,
            installed_size: 0,
            url: String::new(),
            description: String::new(),
            maintainer: String::new(),
            conffiles: Vec::new(),
            installed_time: None,
            tags: Vec::new(),
            state: None,
        }
    }

    #[test]
    fn whatdepends_finds_direct_reverse_edge() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("snapshot", 10);
        pool.add_solvable(repo, bare("c", repo)).unwrap();
        let mut b = bare("b", repo);
        b.depends = Conjunction::parse("c").unwrap();
        pool.add_solvable(repo, b).unwrap();
        pool.internalize(repo);

        let hits = whatdepends(&pool, "c", false);
        assert_eq!(hits.len(), 1);
        assert_eq!(pool.solvable(hits[0]).name, "b");
    }

    #[test]
    fn whatdepends_recursive_saturates_transitively() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("snapshot", 10);
        pool.add_solvable(repo, bare("c", repo)).unwrap();
        let mut b = bare("b", repo);
        b.depends = Conjunction::parse("c").unwrap();
        pool.add_solvable(repo, b).unwrap();
        let mut a = bare("a", repo);
        a.depends = Conjunction::parse("b").unwrap();
        pool.add_solvable(repo, a).unwrap();
        pool.internalize(repo);

        let hits = whatdepends(&pool, "c", true);
        let names: AHashSet<String> = hits.iter().map(|&id| pool.solvable(id).name.clone()).collect();
        assert!(names.contains("a"));
        assert!(names.contains("b"));
    }

    #[test]
    fn depends_lists_pre_depends_before_depends() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("snapshot", 10);
        let mut a = bare("a", repo);
        a.pre_depends = Conjunction::parse("base").unwrap();
        a.depends = Conjunction::parse("extra").unwrap();
        let id = pool.add_solvable(repo, a).unwrap();
        pool.internalize(repo);

        let atoms = depends(&pool, id);
        assert_eq!(atoms[0].name, "base");
        assert_eq!(atoms[1].name, "extra");
    }
}
