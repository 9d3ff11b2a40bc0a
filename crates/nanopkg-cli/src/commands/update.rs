//! `update` — refresh every configured source's cached index (spec §6, §4.5).

use console::style;

use nanopkg_core::Result;
use nanopkg_downloader::Downloader;
use nanopkg_repository::RepositoryLoader;

use super::Cli;
use crate::support;

pub async fn run(cli: &Cli) -> Result<i32> {
    let config = support::load_config(cli)?;
    let _lock = support::lock_destination(&config)?;

    let downloader = Downloader::new(&config.proxy, config.download_parallelism, config.max_retries)?;
    let loader = RepositoryLoader::new(&config, &downloader);
    let report = loader.update().await;

    for (source, reason) in &report.failures {
        eprintln!("{} {}: {}", style("failed").red(), source, reason);
    }
    println!(
        "Updated {} source(s), {} failed.",
        report.sources_updated, report.sources_failed
    );

    Ok(report.sources_failed as i32)
}
