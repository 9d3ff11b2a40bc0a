//! The read-only query verbs: `list`, `list-installed`, `list-upgradable`,
//! `info`/`status`, `files`, `search`, `depends`, `whatdepends[rec]`,
//! `whatprovides`, `whatreplaces`, `whatconflicts`, `whatrecommends`,
//! `whatsuggests`, `compare-versions`, `print-architecture`,
//! `list-changed-conffiles` (spec §6, §4.9).

use std::path::Path;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use md5::Digest as _;

use nanopkg_core::{Error, Result};
use nanopkg_pool::SolvableId;
use nanopkg_version::{Atom, Op, Version};

use super::Cli;
use crate::support;

pub async fn list(cli: &Cli, glob: Option<&str>, installed_only: bool) -> Result<i32> {
    let config = support::load_config(cli)?;
    let ctx = support::build_context(config).await?;

    let ids = nanopkg_query::list(&ctx.pool, glob, installed_only);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).set_header(vec!["Package", "Version", "Description"]);
    for id in &ids {
        let s = ctx.pool.solvable(*id);
        table.add_row(vec![s.name.as_str(), &s.version.to_string(), first_line(&s.description)]);
    }
    println!("{table}");
    Ok(0)
}

pub async fn list_upgradable(cli: &Cli) -> Result<i32> {
    let config = support::load_config(cli)?;
    let ctx = support::build_context(config).await?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_header(vec!["Package", "Installed", "Candidate"]);
    let mut any = false;
    for id in ctx.pool.installed_ids() {
        let installed = ctx.pool.solvable(id);
        let best = nanopkg_query::matching_ids(&ctx.pool, &installed.name)
            .into_iter()
            .filter(|&cand| cand != id && !ctx.pool.is_installed_repo(ctx.pool.solvable(cand).repo))
            .map(|cand| ctx.pool.solvable(cand).version.clone())
            .filter(|v| *v > installed.version)
            .max();
        if let Some(candidate) = best {
            table.add_row(vec![installed.name.as_str(), &installed.version.to_string(), &candidate.to_string()]);
            any = true;
        }
    }
    println!("{table}");
    Ok(if any { 0 } else { 1 })
}

fn find_one(ctx: &nanopkg_exec::Context, pkg: &str) -> Result<SolvableId> {
    let preferred = ctx.pool.installed_ids().find(|&id| ctx.pool.solvable(id).name == pkg);
    preferred
        .or_else(|| nanopkg_query::matching_ids(&ctx.pool, pkg).into_iter().next())
        .ok_or_else(|| Error::parse(format!("package '{pkg}' not found")))
}

pub async fn info(cli: &Cli, pkg: &str) -> Result<i32> {
    let config = support::load_config(cli)?;
    let ctx = support::build_context(config).await?;
    let id = find_one(&ctx, pkg)?;
    println!("{}", nanopkg_query::format_info(&ctx.pool, id));
    Ok(0)
}

pub async fn files(cli: &Cli, pkg: &str) -> Result<i32> {
    let config = support::load_config(cli)?;
    let ctx = support::build_context(config).await?;
    let query = nanopkg_query::Query::new(&ctx.pool, ctx.dest.info_dir.as_path());

    let paths = match query.files(pkg)? {
        Some(paths) => paths,
        None if Path::new(pkg).is_file() => nanopkg_query::facade::files_from_archive(Path::new(pkg))?,
        None => return Err(Error::parse(format!("package '{pkg}' is not installed"))),
    };
    for path in paths {
        println!("{}", path.display());
    }
    Ok(0)
}

pub async fn search(cli: &Cli, pattern: &str) -> Result<i32> {
    let config = support::load_config(cli)?;
    let ctx = support::build_context(config).await?;
    let hits = nanopkg_query::search(&ctx.pool, &ctx.dest.info_dir, pattern);
    for (pkg, path) in &hits {
        println!("{}: {}", pkg, path.display());
    }
    Ok(if hits.is_empty() { 1 } else { 0 })
}

pub async fn depends(cli: &Cli, pkg: &str) -> Result<i32> {
    let config = support::load_config(cli)?;
    let ctx = support::build_context(config).await?;
    let id = find_one(&ctx, pkg)?;
    for atom in nanopkg_query::depends(&ctx.pool, id) {
        println!("{atom}");
    }
    Ok(0)
}

async fn print_reverse(cli: &Cli, _pkg: &str, lookup: impl FnOnce(&nanopkg_pool::Pool) -> Vec<SolvableId>) -> Result<i32> {
    let config = support::load_config(cli)?;
    let ctx = support::build_context(config).await?;
    let hits = lookup(&ctx.pool);
    for id in &hits {
        println!("{}", ctx.pool.solvable(*id).name);
    }
    Ok(if hits.is_empty() { 1 } else { 0 })
}

pub async fn whatdepends(cli: &Cli, pkg: &str, recursive: bool) -> Result<i32> {
    let pkg = pkg.to_string();
    print_reverse(cli, &pkg, |pool| nanopkg_query::whatdepends(pool, &pkg, recursive)).await
}

pub async fn whatprovides(cli: &Cli, pkg: &str) -> Result<i32> {
    let atom = Atom::parse(pkg)?;
    print_reverse(cli, pkg, |pool| nanopkg_query::whatprovides(pool, &atom)).await
}

pub async fn whatreplaces(cli: &Cli, pkg: &str) -> Result<i32> {
    let pkg = pkg.to_string();
    print_reverse(cli, &pkg, |pool| nanopkg_query::whatreplaces(pool, &pkg)).await
}

pub async fn whatconflicts(cli: &Cli, pkg: &str) -> Result<i32> {
    let pkg = pkg.to_string();
    print_reverse(cli, &pkg, |pool| nanopkg_query::whatconflicts(pool, &pkg)).await
}

pub async fn whatrecommends(cli: &Cli, pkg: &str) -> Result<i32> {
    let pkg = pkg.to_string();
    print_reverse(cli, &pkg, |pool| nanopkg_query::whatrecommends(pool, &pkg)).await
}

pub async fn whatsuggests(cli: &Cli, pkg: &str) -> Result<i32> {
    let pkg = pkg.to_string();
    print_reverse(cli, &pkg, |pool| nanopkg_query::whatsuggests(pool, &pkg)).await
}

pub fn compare_versions(v1: &str, op: &str, v2: &str) -> Result<i32> {
    let a = Version::parse(v1)?;
    let b = Version::parse(v2)?;
    let op = parse_op(op)?;
    Ok(if op.matches(a.cmp(&b)) { 0 } else { 1 })
}

fn parse_op(raw: &str) -> Result<Op> {
    Ok(match raw {
        "<<" | "lt" | "<" => Op::Lt,
        "<=" | "le" => Op::Le,
        "=" | "==" | "eq" => Op::Eq,
        ">=" | "ge" => Op::Ge,
        ">>" | "gt" | ">" => Op::Gt,
        _ => return Err(Error::parse(format!("unknown comparison operator '{raw}'"))),
    })
}

pub fn print_architecture(cli: &Cli) -> Result<i32> {
    let config = support::load_config(cli)?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).set_header(vec!["Architecture", "Priority"]);
    for arch in config.sorted_architectures() {
        table.add_row(vec![arch.name.clone(), arch.priority.to_string()]);
    }
    println!("{table}");
    Ok(0)
}

pub async fn list_changed_conffiles(cli: &Cli) -> Result<i32> {
    let config = support::load_config(cli)?;
    let ctx = support::build_context(config).await?;

    let mut any = false;
    for id in ctx.pool.installed_ids() {
        let s = ctx.pool.solvable(id);
        for (path, recorded_md5) in &s.conffiles {
            let on_disk = ctx.config.rooted(path);
            let Ok(bytes) = std::fs::read(&on_disk) else {
                continue;
            };
            let mut hasher = md5::Md5::new();
            hasher.update(&bytes);
            let current = format!("{:x}", hasher.finalize());
            if &current != recorded_md5 {
                println!("{}: {}", s.name, path.display());
                any = true;
            }
        }
    }
    Ok(if any { 0 } else { 1 })
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}
