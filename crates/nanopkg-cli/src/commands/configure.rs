//! `configure [pkgs]` — run the configure phase for packages left
//! `unpacked`, e.g. after `--download-only`/a `configure` trigger failure
//! (spec §6, §4.7 step 6).

use console::style;
use nanopkg_core::Result;
use nanopkg_intercept::InterceptRunner;

use super::Cli;
use crate::support;

pub async fn run(cli: &Cli, pkgs: &[String]) -> Result<i32> {
    let config = support::load_config(cli)?;
    let _lock = support::lock_destination(&config)?;
    let mut ctx = support::build_context(config).await?;

    let only: Option<Vec<String>> = if pkgs.is_empty() { None } else { Some(pkgs.clone()) };
    let intercept = InterceptRunner::activate()?;
    let outcomes = nanopkg_exec::configure::configure_phase(&mut ctx, &intercept, only.as_deref())?;
    let finalize = intercept.finalize()?;

    let mut ok = finalize.all_ok();
    for outcome in &outcomes {
        if outcome.ok {
            println!("{} {}", style("Configured").green(), outcome.name);
        } else {
            eprintln!("{} configuring {}", style("failed").red(), outcome.name);
            ok = false;
        }
    }

    if ctx.is_dirty() {
        nanopkg_status::write(&ctx.dest, &ctx.pool)?;
    }
    Ok(if ok { 0 } else { 1 })
}
