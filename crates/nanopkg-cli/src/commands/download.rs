//! `download <pkgs>` — fetch into the cache without installing (spec §6, §4.6).

use ahash::AHashSet;

use nanopkg_core::Result;

use super::Cli;
use crate::{mutate, support};

pub async fn run(cli: &Cli, pkgs: &[String]) -> Result<i32> {
    let config = support::load_config(cli)?;
    let _lock = support::lock_destination(&config)?;
    let mut ctx = support::build_context(config).await?;

    let (atoms, local_archives) = mutate::resolve_pkg_args(&mut ctx, pkgs)?;
    let requested_names: AHashSet<String> = atoms.iter().map(|a| a.name.clone()).collect();
    let job = mutate::install_job(&atoms);

    mutate::plan_and_execute(cli, &mut ctx, &job, &requested_names, &local_archives, true).await
}
