//! The solver: preprocessing, job rewriting and the constraint walk that
//! produces a [`Transaction`] or a list of [`Problem`]s (spec §4.6).

use std::cmp::Ordering;
use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use nanopkg_core::Result;
use nanopkg_pool::{Flag, Pool, SolvableId};
use nanopkg_version::{Atom, Conjunction};

use crate::flags::SolverFlags;
use crate::job::{Job, Operation, Selector};
use crate::problem::{Problem, Solution, SolutionAction};
use crate::transaction::{Step, StepKind, Transaction};

/// Outcome of [`solve`]: either a ready-to-apply transaction, or the
/// non-empty list of problems blocking one (spec §4.6 "Solve").
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Transaction(Transaction),
    Problems(Vec<Problem>),
}

/// How strongly a dependency edge orders its installation before its
/// dependent (spec §4.6 "Pre-depends create ordering edges stronger than
/// Depends").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EdgeStrength {
    Depends,
    PreDepends,
}

/// Run the SAT-style solve described in spec §4.6 against `pool`.
///
/// `excludes` is the config's exclude-glob list (preprocessing step 4);
/// applying it mutates the pool's `considered` set and rebuilds
/// `whatprovides`, so this takes `pool` mutably.
///
/// # Errors
/// Propagates any `nanopkg_core::Error` raised while re-internalizing the
/// pool's indices.
pub fn solve(pool: &mut Pool, job: &Job, flags: &SolverFlags, excludes: &[String]) -> Result<SolveOutcome> {
    apply_excludes(pool, excludes);

    let held = held_names(pool);
    let originally_installed: AHashMap<String, SolvableId> = pool
        .installed_ids()
        .map(|id| (pool.solvable(id).name.clone(), id))
        .collect();

    let mut chosen: AHashMap<String, SolvableId> = originally_installed.clone();
    let mut explicit_erasures: AHashSet<String> = AHashSet::new();
    let mut queue: VecDeque<Atom> = VecDeque::new();
    let mut problems: Vec<Problem> = Vec::new();

    for item in &job.items {
        match item.operation {
            Operation::Install => {
                if let Selector::Atom(atom) = &item.selector {
                    queue.push_back(atom.clone());
                }
            }
            Operation::Remove | Operation::EraseSpecific => {
                if let Selector::Atom(atom) = &item.selector {
                    explicit_erasures.insert(atom.name.clone());
                    chosen.remove(&atom.name);
                }
            }
            Operation::Update | Operation::DistUpgrade => match &item.selector {
                Selector::Atom(atom) if !held.contains(&atom.name) => {
                    queue.push_back(atom.clone());
                }
                Selector::AllInstalled => {
                    for (name, _) in &originally_installed {
                        if !held.contains(name) {
                            queue.push_back(Atom { name: name.clone(), constraint: None });
                        }
                    }
                }
                Selector::Atom(_) => {
                    // held: spec §4.6 job-rewriting leaves the package
                    // untouched rather than erroring (scenario 3).
                }
            },
            Operation::Lock | Operation::Cleandeps | Operation::Forcebest => {}
        }
    }

    while let Some(atom) = queue.pop_front() {
        if let Some(&id) = chosen.get(&atom.name) {
            if pool.solvable(id).satisfies(&atom) {
                continue;
            }
        }

        let candidates: Vec<SolvableId> = pool
            .whatprovides(&atom)
            .into_iter()
            .filter(|&id| !held.contains(&pool.solvable(id).name) || pool.is_installed_repo(pool.solvable(id).repo))
            .collect();

        let Some(&candidate) = candidates.first() else {
            problems.push(Problem::new(
                format!("no package satisfies '{atom}'"),
                vec![Solution::new("skip this requirement", Vec::new())],
            ));
            continue;
        };

        if let Some(problem) = conflict_problem(pool, &chosen, candidate) {
            problems.push(problem);
            continue;
        }

        chosen.insert(pool.solvable(candidate).name.clone(), candidate);

        let solvable = pool.solvable(candidate);
        enqueue_conjunction(&mut queue, &solvable.pre_depends, pool, &chosen);
        if !flags.force_depends {
            enqueue_conjunction(&mut queue, &solvable.depends, pool, &chosen);
            if flags.promote_recommends() {
                enqueue_satisfiable(&mut queue, &solvable.recommends, pool);
            }
        }
    }

    if !problems.is_empty() {
        return Ok(SolveOutcome::Problems(problems));
    }

    for name in explicit_erasures {
        chosen.remove(&name);
    }

    let steps = build_steps(pool, &originally_installed, &chosen);
    let ordered = order_steps(pool, steps);
    Ok(SolveOutcome::Transaction(Transaction::new(ordered)))
}

fn apply_excludes(pool: &mut Pool, excludes: &[String]) {
    if excludes.is_empty() {
        return;
    }
    let patterns: Vec<glob::Pattern> = excludes
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();
    let allowed: Vec<SolvableId> = pool
        .all_ids()
        .filter(|&id| !patterns.iter().any(|p| p.matches(&pool.solvable(id).name)))
        .collect();
    pool.set_considered(Some(allowed));
    pool.create_whatprovides();
}

fn held_names(pool: &Pool) -> AHashSet<String> {
    pool.installed_ids()
        .filter(|&id| {
            pool.solvable(id)
                .state
                .is_some_and(|s| s.flag.contains(Flag::Hold))
        })
        .map(|id| pool.solvable(id).name.clone())
        .collect()
}

fn enqueue_conjunction(queue: &mut VecDeque<Atom>, conjunction: &Conjunction, pool: &Pool, chosen: &AHashMap<String, SolvableId>) {
    for alternation in &conjunction.0 {
        let already_satisfied = alternation.0.iter().any(|atom| {
            chosen
                .get(&atom.name)
                .is_some_and(|&id| pool.solvable(id).satisfies(atom))
        });
        if already_satisfied {
            continue;
        }
        if let Some(first) = alternation.0.first() {
            queue.push_back(first.clone());
        }
    }
}

fn enqueue_satisfiable(queue: &mut VecDeque<Atom>, conjunction: &Conjunction, pool: &Pool) {
    for alternation in &conjunction.0 {
        if let Some(atom) = alternation.0.first() {
            if !pool.whatprovides(atom).is_empty() {
                queue.push_back(atom.clone());
            }
        }
    }
}

fn conflict_problem(pool: &Pool, chosen: &AHashMap<String, SolvableId>, candidate: SolvableId) -> Option<Problem> {
    let candidate_solvable = pool.solvable(candidate);
    for &other in chosen.values() {
        if other == candidate {
            continue;
        }
        let other_solvable = pool.solvable(other);
        let conflicts = candidate_solvable
            .conflicts
            .0
            .iter()
            .flat_map(|alt| &alt.0)
            .any(|atom| other_solvable.satisfies(atom))
            || other_solvable
                .conflicts
                .0
                .iter()
                .flat_map(|alt| &alt.0)
                .any(|atom| candidate_solvable.satisfies(atom));
        if conflicts {
            return Some(Problem::new(
                format!(
                    "{} conflicts with installed {}",
                    candidate_solvable.name, other_solvable.name
                ),
                vec![Solution::new(
                    format!("erase {}", other_solvable.name),
                    vec![SolutionAction::Erase(other)],
                )],
            ));
        }
    }
    None
}

fn build_steps(
    pool: &Pool,
    originally_installed: &AHashMap<String, SolvableId>,
    chosen: &AHashMap<String, SolvableId>,
) -> Vec<Step> {
    let mut steps = Vec::new();

    for (name, &new_id) in chosen {
        match originally_installed.get(name) {
            None => steps.push(Step::new(StepKind::Install, new_id, None)),
            Some(&old_id) if old_id == new_id => {}
            Some(&old_id) => {
                let kind = match pool
                    .solvable(new_id)
                    .version
                    .cmp(&pool.solvable(old_id).version)
                {
                    Ordering::Greater => StepKind::Upgraded,
                    Ordering::Less => StepKind::Downgraded,
                    Ordering::Equal => StepKind::Reinstalled,
                };
                steps.push(Step::new(kind, new_id, Some(old_id)));
            }
        }
    }

    for (name, &old_id) in originally_installed {
        if !chosen.contains_key(name) {
            steps.push(Step::new(StepKind::Erase, old_id, None));
        }
    }

    steps
}

/// Topologically order `steps` so a package's hard dependencies precede it
/// (spec §4.6 "Ordering"), ties broken by name. Erase steps have no
/// outgoing dependency edges and are scheduled after every install-family
/// step whose dependency they might still satisfy.
fn order_steps(pool: &Pool, steps: Vec<Step>) -> Vec<Step> {
    let mut graph = DiGraph::<Step, EdgeStrength>::new();
    let mut nodes = AHashMap::new();
    for step in &steps {
        let idx = graph.add_node(*step);
        nodes.insert(pool.solvable(step.solvable).name.clone(), idx);
    }

    for step in &steps {
        if step.kind == StepKind::Erase {
            continue;
        }
        let solvable = pool.solvable(step.solvable);
        let this_idx = nodes[&solvable.name];
        for (conjunction, strength) in [
            (&solvable.pre_depends, EdgeStrength::PreDepends),
            (&solvable.depends, EdgeStrength::Depends),
        ] {
            for alternation in &conjunction.0 {
                for atom in &alternation.0 {
                    if let Some(&dep_idx) = nodes.get(&atom.name) {
                        if dep_idx != this_idx {
                            graph.add_edge(dep_idx, this_idx, strength);
                        }
                    }
                }
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => {
            let mut out: Vec<Step> = order.into_iter().map(|idx| graph[idx]).collect();
            stable_name_tiebreak(pool, &mut out);
            out
        }
        Err(_) => {
            // A dependency cycle (spec doesn't forbid it explicitly for
            // Recommends-derived edges); fall back to name order rather
            // than fail the whole transaction.
            let mut out = steps;
            stable_name_tiebreak(pool, &mut out);
            out
        }
    }
}

fn stable_name_tiebreak(pool: &Pool, steps: &mut [Step]) {
    steps.sort_by(|a, b| {
        pool.solvable(a.solvable)
            .name
            .cmp(&pool.solvable(b.solvable).name)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanopkg_config::Config;
    use nanopkg_pool::{PackageState, RepoId, Solvable, Status, Want};
    use nanopkg_version::Version;
    use std::path::PathBuf;

    fn bare(name: &str, version: &str, repo: RepoId) -> Solvable {
        Solvable {
            name: name.to_string(),
            version: Version::parse(version).unwrap(),
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

    fn default_flags() -> SolverFlags {
        SolverFlags {
            install_recommends: true,
            ignore_recommends: false,
            force_depends: false,
            force_reinstall: false,
            cleandeps: false,
            interactive: false,
        }
    }

    #[test]
    fn fresh_install_orders_transitive_depends_first() {
        let mut pool = Pool::new();
        pool.set_architectures(&[("all".to_string(), 1)]);
        let repo = pool.add_repo("snapshot", 10);

        let mut c = bare("c", "1.0", repo);
        let mut b = bare("b", "1.0", repo);
        b.depends = Conjunction::parse("c").unwrap();
        let mut a = bare("a", "1.0", repo);
        a.depends = Conjunction::parse("b (>= 1.0), c").unwrap();

        pool.add_solvable(repo, c.clone()).unwrap();
        pool.add_solvable(repo, b.clone()).unwrap();
        pool.add_solvable(repo, a.clone()).unwrap();
        pool.internalize(repo);
        pool.create_whatprovides();

        let job = Job::install(Atom::parse("a").unwrap());
        let outcome = solve(&mut pool, &job, &default_flags(), &[]).unwrap();

        let SolveOutcome::Transaction(tx) = outcome else {
            panic!("expected a transaction");
        };
        let names: Vec<&str> = tx.iter().map(|s| pool.solvable(s.solvable).name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
        assert!(tx.iter().all(|s| s.kind == StepKind::Install));
    }

    #[test]
    fn held_package_blocks_dist_upgrade() {
        let mut pool = Pool::new();
        pool.set_architectures(&[("all".to_string(), 1)]);
        let repo = pool.add_repo("snapshot", 10);
        pool.add_solvable(repo, bare("l", "2.0", repo)).unwrap();
        pool.internalize(repo);

        let mut installed = bare("l", "1.0", pool.installed_repo());
        let mut state = PackageState { want: Want::Install, ..Default::default() };
        state.flag.insert(Flag::Hold);
        state.status = Status::Installed;
        installed.state = Some(state);
        pool.add_installed(installed);
        pool.create_whatprovides();

        let job = Job::dist_upgrade();
        let outcome = solve(&mut pool, &job, &default_flags(), &[]).unwrap();

        let SolveOutcome::Transaction(tx) = outcome else {
            panic!("expected a transaction");
        };
        assert!(tx.is_empty());
    }

    #[test]
    fn conflicting_install_reports_problem_without_mutation() {
        let mut pool = Pool::new();
        pool.set_architectures(&[("all".to_string(), 1)]);
        let repo = pool.add_repo("snapshot", 10);
        let mut q = bare("q", "1.0", repo);
        q.conflicts = Conjunction::parse("p").unwrap();
        pool.add_solvable(repo, q).unwrap();
        pool.internalize(repo);

        let mut installed_p = bare("p", "1.0", pool.installed_repo());
        installed_p.state = Some(PackageState {
            want: Want::Install,
            status: Status::Installed,
            ..Default::default()
        });
        pool.add_installed(installed_p);
        pool.create_whatprovides();

        let job = Job::install(Atom::parse("q").unwrap());
        let outcome = solve(&mut pool, &job, &default_flags(), &[]).unwrap();

        let SolveOutcome::Problems(problems) = outcome else {
            panic!("expected a conflict problem");
        };
        assert_eq!(problems.len(), 1);
        assert!(problems[0].solutions[0].description.contains("erase p"));
    }

    #[test]
    fn exclude_list_removes_solvable_from_candidates() {
        let mut pool = Pool::new();
        pool.set_architectures(&[("all".to_string(), 1)]);
        let repo = pool.add_repo("snapshot", 10);
        pool.add_solvable(repo, bare("a", "1.0", repo)).unwrap();
        pool.internalize(repo);
        pool.create_whatprovides();

        let job = Job::install(Atom::parse("a").unwrap());
        let outcome = solve(&mut pool, &job, &default_flags(), &["a".to_string()]).unwrap();
        let SolveOutcome::Problems(problems) = outcome else {
            panic!("excluded package should be unsatisfiable");
        };
        assert_eq!(problems.len(), 1);
    }

    #[allow(dead_code)]
    fn config_stub() -> Config {
        Config {
            destinations: Vec::new(),
            sources: Vec::new(),
            architectures: Vec::new(),
            lists_dir: PathBuf::new(),
            cache_dir: PathBuf::new(),
            lock_file: PathBuf::new(),
            offline_root: None,
            proxy: Default::default(),
            cache_local_files: true,
            volatile_cache: false,
            download_parallelism: 1,
            max_retries: 1,
            install_recommends: true,
            ignore_recommends: false,
            force_depends: false,
            force_reinstall: false,
            exclude: Vec::new(),
            interactive: false,
        }
    }
}
