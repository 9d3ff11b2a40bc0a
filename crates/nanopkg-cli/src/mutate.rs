//! Shared job-building and execute-driving logic for the mutating verbs:
//! `install`, `upgrade`/`dist-upgrade`, `remove`, `download` (spec §4.6,
//! §4.7).

use std::path::PathBuf;

use ahash::{AHashMap, AHashSet};
use console::style;

use nanopkg_core::{parse_many, Error, Result};
use nanopkg_exec::{Context, ExecuteOptions, ExecutionReport};
use nanopkg_pool::SolvableId;
use nanopkg_repository::index::stanza_to_solvable;
use nanopkg_resolver::{solve, Job, JobItem, Operation, Problem, Selector, SolveOutcome, SolverFlags, StepKind};
use nanopkg_version::Atom;

use crate::commands::Cli;

/// Resolve each `<pkgs>` argument to a dependency atom. An argument that
/// names an existing file on disk is treated as a package "provided by
/// hand" (spec §4.7 step 1): its control stanza is read and registered as
/// a one-off solvable in a throwaway repo, so the solver can plan over it
/// exactly like a repository package.
pub fn resolve_pkg_args(ctx: &mut Context, pkgs: &[String]) -> Result<(Vec<Atom>, AHashMap<String, PathBuf>)> {
    let mut atoms = Vec::with_capacity(pkgs.len());
    let mut local_by_name = AHashMap::default();
    let mut added_any_local = false;
    let local_repo = ctx.pool.add_repo("local", i64::MAX - 1);

    for pkg in pkgs {
        let path = std::path::Path::new(pkg);
        if path.is_file() {
            let archive = nanopkg_archive::PackageArchive::open(path)?;
            let text = archive.control_stanza()?;
            let stanza = parse_many(&text)
                .next()
                .ok_or_else(|| Error::parse(format!("archive '{pkg}' has an empty control stanza")))??;
            let solvable = stanza_to_solvable(&stanza, local_repo)?;
            let name = solvable.name.clone();
            ctx.pool.add_solvable(local_repo, solvable)?;
            local_by_name.insert(name.clone(), path.to_path_buf());
            atoms.push(Atom { name, constraint: None });
            added_any_local = true;
        } else {
            atoms.push(Atom::parse(pkg)?);
        }
    }

    if added_any_local {
        ctx.pool.internalize(local_repo);
        ctx.pool.create_whatprovides();
    }
    Ok((atoms, local_by_name))
}

#[must_use]
pub fn install_job(atoms: &[Atom]) -> Job {
    let mut job = Job::new();
    for atom in atoms {
        job.push(JobItem::new(Operation::Install, Selector::Atom(atom.clone())));
    }
    job
}

#[must_use]
pub fn remove_job(atoms: &[Atom]) -> Job {
    let mut job = Job::new();
    for atom in atoms {
        job.push(JobItem::new(Operation::Remove, Selector::Atom(atom.clone())));
    }
    job
}

#[must_use]
pub fn upgrade_job(atoms: &[Atom]) -> Job {
    let mut job = Job::new();
    if atoms.is_empty() {
        job.push(JobItem::new(Operation::DistUpgrade, Selector::AllInstalled));
    } else {
        for atom in atoms {
            job.push(JobItem::new(Operation::DistUpgrade, Selector::Atom(atom.clone())));
        }
    }
    job
}

/// Solve `job` against `ctx.pool` and, unless `--noaction` was given, run
/// the resulting transaction to completion. Shared by every mutating verb
/// so the plan/confirm/apply/configure/persist pipeline (spec §4.7) is
/// driven identically regardless of which verb built the job.
pub async fn plan_and_execute(
    cli: &Cli,
    ctx: &mut Context,
    job: &Job,
    requested_names: &AHashSet<String>,
    local_archives_by_name: &AHashMap<String, PathBuf>,
    download_only: bool,
) -> Result<i32> {
    let flags = SolverFlags::from_config(&ctx.config).with_cleandeps(false);
    let excludes = ctx.config.exclude.clone();
    let outcome = solve(&mut ctx.pool, job, &flags, &excludes)?;

    let txn = match outcome {
        SolveOutcome::Transaction(txn) => txn,
        SolveOutcome::Problems(problems) => {
            print_problems(&problems);
            return Ok(1);
        }
    };

    if cli.noaction {
        println!("{}", nanopkg_exec::confirm::summary(&txn, &ctx.pool));
        return Ok(0);
    }
    if txn.is_empty() {
        println!("Nothing to do.");
        return Ok(0);
    }

    let requested: AHashSet<SolvableId> = txn
        .iter()
        .filter(|step| requested_names.contains(&ctx.pool.solvable(step.solvable).name))
        .map(|step| step.solvable)
        .collect();
    let local_archives: AHashMap<SolvableId, PathBuf> = txn
        .iter()
        .filter_map(|step| {
            let name = &ctx.pool.solvable(step.solvable).name;
            local_archives_by_name.get(name).map(|path| (step.solvable, path.clone()))
        })
        .collect();

    let opts = ExecuteOptions {
        download_only,
        requested,
        local_archives,
        force_maintainer: cli.force_maintainer,
        interactive: ctx.config.interactive && !cli.batch,
    };

    let report = nanopkg_exec::execute(ctx, &txn, &opts).await?;
    Ok(render_report(&report))
}

fn print_problems(problems: &[Problem]) {
    eprintln!("{}", style("Unable to satisfy the requested changes:").red().bold());
    for problem in problems {
        eprintln!("  - {}", problem.description);
        for solution in &problem.solutions {
            eprintln!("      possible fix: {}", solution.description);
        }
    }
}

fn render_report(report: &ExecutionReport) -> i32 {
    if report.download_only {
        println!("Downloaded {} package(s).", report.downloaded);
        return 0;
    }
    if report.cancelled {
        println!("Aborted.");
        return 0;
    }
    for step in &report.steps {
        let verb = match step.kind {
            StepKind::Install | StepKind::MultiInstall => "Installed",
            StepKind::Erase => "Removed",
            StepKind::Upgraded => "Upgraded",
            StepKind::Downgraded => "Downgraded",
            StepKind::Reinstalled => "Reinstalled",
            StepKind::Changed => "Changed",
        };
        if step.ok {
            println!("{} {}", style(verb).green(), step.name);
        } else {
            eprintln!("{} {} failed", style(verb).red(), step.name);
        }
    }
    for outcome in &report.configured {
        if !outcome.ok {
            eprintln!("{} configuring {}", style("failed").red(), outcome.name);
        }
    }
    if report.success() {
        0
    } else {
        1
    }
}
