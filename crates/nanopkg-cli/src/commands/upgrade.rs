//! `upgrade` / `dist-upgrade [pkgs]` (spec §6).

use ahash::AHashSet;

use nanopkg_core::Result;
use nanopkg_version::Atom;

use super::Cli;
use crate::{mutate, support};

pub async fn run(cli: &Cli, pkgs: &[String]) -> Result<i32> {
    let config = support::load_config(cli)?;
    let _lock = support::lock_destination(&config)?;
    let mut ctx = support::build_context(config).await?;

    let atoms: Result<Vec<Atom>> = pkgs.iter().map(|p| Atom::parse(p)).collect();
    let atoms = atoms?;
    let requested_names: AHashSet<String> = atoms.iter().map(|a| a.name.clone()).collect();
    let job = mutate::upgrade_job(&atoms);

    mutate::plan_and_execute(cli, &mut ctx, &job, &requested_names, &Default::default(), false).await
}
