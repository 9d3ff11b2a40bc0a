//! `flag <flag> <pkgs>` — set an install-state flag on installed packages
//! (spec §6, §3 `Flag`). A leading `no` un-sets the flag instead, e.g.
//! `flag nohold foo`.

use console::style;

use nanopkg_core::{Error, Result};
use nanopkg_pool::Flag;

use super::Cli;
use crate::support;

fn known_flag(name: &str) -> Option<Flag> {
    match name {
        "hold" => Some(Flag::Hold),
        "noprune" => Some(Flag::Noprune),
        "user" => Some(Flag::User),
        "ok" => Some(Flag::Ok),
        "reinstreq" => Some(Flag::Reinstreq),
        "replace" => Some(Flag::Replace),
        "prefer" => Some(Flag::Prefer),
        "obsolete" => Some(Flag::Obsolete),
        _ => None,
    }
}

fn parse_flag(raw: &str) -> Result<(Flag, bool)> {
    // `raw` itself (e.g. "noprune") is tried first so a flag whose own
    // name happens to start with "no" isn't mistaken for the negation of
    // a shorter flag that doesn't exist.
    if let Some(flag) = known_flag(raw) {
        return Ok((flag, true));
    }
    if let Some(rest) = raw.strip_prefix("no") {
        if let Some(flag) = known_flag(rest) {
            return Ok((flag, false));
        }
    }
    Err(Error::parse(format!(
        "unknown flag '{raw}' (expected one of: hold, noprune, user, ok, reinstreq, replace, prefer, obsolete; prefix with 'no' to clear)"
    )))
}

pub async fn run(cli: &Cli, flag: &str, pkgs: &[String]) -> Result<i32> {
    let (flag, set) = parse_flag(flag)?;

    let config = support::load_config(cli)?;
    let _lock = support::lock_destination(&config)?;
    let mut ctx = support::build_context(config).await?;

    let mut ok = true;
    for name in pkgs {
        let id = ctx.pool.installed_ids().find(|&id| ctx.pool.solvable(id).name == *name);
        match id {
            Some(id) => {
                let solvable = ctx.pool.solvable_mut(id);
                let mut state = solvable.state.unwrap_or_default();
                if set {
                    state.flag.insert(flag);
                } else {
                    state.flag.remove(flag);
                }
                solvable.state = Some(state);
                ctx.mark_dirty();
                println!("{} flag on {}", if set { style("set").green() } else { style("cleared").yellow() }, name);
            }
            None => {
                eprintln!("{}: {} is not installed", style("error").red(), name);
                ok = false;
            }
        }
    }

    if ctx.is_dirty() {
        nanopkg_status::write(&ctx.dest, &ctx.pool)?;
    }
    Ok(if ok { 0 } else { 1 })
}
