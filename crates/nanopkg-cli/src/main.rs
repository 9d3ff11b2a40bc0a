//! `nanopkg` — transaction engine for an embedded opkg-style package
//! archive: dependency resolution, download, unpack/configure, and the
//! query facade, behind a single-binary CLI.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod mutate;
mod support;

use std::process::ExitCode;

use clap::Parser;
use commands::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    support::init_tracing(cli.verbose, cli.quiet);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    let result = runtime.block_on(run(&cli));

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("{}", e.display_with_suggestions());
            ExitCode::from(e.exit_code().clamp(0, 255) as u8)
        }
    }
}

async fn run(cli: &Cli) -> nanopkg_core::Result<i32> {
    tokio::select! {
        result = commands::dispatch(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted");
            Err(nanopkg_core::Error::interrupted(2))
        }
    }
}
