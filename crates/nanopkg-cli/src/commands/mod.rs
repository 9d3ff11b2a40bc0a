//! Subcommand definitions and dispatch (spec §6, §10).

pub mod clean;
pub mod configure;
pub mod download;
pub mod flag;
pub mod install;
pub mod query;
pub mod remove;
pub mod update;
pub mod upgrade;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nanopkg_core::Result;

/// `nanopkg`: transaction engine for an embedded opkg-style archive.
#[derive(Parser, Debug)]
#[command(name = "nanopkg", version, about = "Embedded package manager transaction engine")]
pub struct Cli {
    /// Raise the log level; repeatable (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
    /// Read configuration from `<path>` instead of the default search paths
    /// (mirrors opkg's `-f`/`--conf`).
    #[arg(short = 'f', long = "conf", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Run against an alternate root instead of `/` (spec §6 persisted
    /// state layout).
    #[arg(long, global = true, value_name = "PATH")]
    pub offline_root: Option<PathBuf>,
    /// Ignore unmet dependencies when planning a transaction.
    #[arg(long, global = true)]
    pub force_depends: bool,
    /// Reinstall and refetch even when already at the target version.
    #[arg(long, global = true)]
    pub force_reinstall: bool,
    /// Skip conffile preservation; always install the package's file.
    #[arg(long, global = true)]
    pub force_maintainer: bool,
    /// Print the planned transaction and exit without applying it.
    #[arg(long, global = true)]
    pub noaction: bool,
    /// Disable interactive problem-solution and confirmation prompts.
    #[arg(short = 'A', long = "batch", global = true)]
    pub batch: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Refresh every configured source's cached index.
    Update,
    /// Plan and apply an install of `<pkgs>`.
    Install { pkgs: Vec<String> },
    /// Plan and apply an upgrade, or every installed package if `pkgs` is empty.
    #[command(alias = "dist-upgrade")]
    Upgrade { pkgs: Vec<String> },
    /// Plan and apply removal of `<pkgs>`.
    Remove { pkgs: Vec<String> },
    /// List every known package, optionally matching a glob.
    List { glob: Option<String> },
    /// List installed packages, optionally matching a glob.
    ListInstalled { glob: Option<String> },
    /// List installed packages with a newer version available.
    ListUpgradable,
    /// Print a package's control fields.
    Info { pkg: String },
    /// Alias of `info`.
    Status { pkg: String },
    /// List a package's installed file manifest.
    Files { pkg: String },
    /// Find installed files matching a glob.
    Search { pattern: String },
    /// Fetch `<pkgs>` into the download cache without installing them.
    Download { pkgs: Vec<String> },
    /// Set an install-state flag on installed packages.
    Flag { flag: String, pkgs: Vec<String> },
    /// Packages that depend on `<pkg>`.
    Whatdepends { pkg: String },
    /// Packages that depend on `<pkg>`, continuing transitively.
    Whatdependsrec { pkg: String },
    /// Packages that provide `<pkg>`.
    Whatprovides { pkg: String },
    /// Packages that replace `<pkg>`.
    Whatreplaces { pkg: String },
    /// Packages that conflict with `<pkg>`.
    Whatconflicts { pkg: String },
    /// Packages that recommend `<pkg>`.
    Whatrecommends { pkg: String },
    /// Packages that suggest `<pkg>`.
    Whatsuggests { pkg: String },
    /// `<pkg>`'s own dependency atoms.
    Depends { pkg: String },
    /// Evaluate `<v1> <op> <v2>`; exit 0 if true, 1 if false.
    CompareVersions { v1: String, op: String, v2: String },
    /// Print the configured architecture table.
    PrintArchitecture,
    /// Purge the download cache directory.
    Clean,
    /// Run the configure phase for packages left `unpacked`.
    Configure { pkgs: Vec<String> },
    /// List installed conffiles whose on-disk content no longer matches.
    ListChangedConffiles,
}

/// Dispatch `cli.command`, returning the process exit code.
pub async fn dispatch(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Command::Update => update::run(cli).await,
        Command::Install { pkgs } => install::run(cli, pkgs).await,
        Command::Upgrade { pkgs } => upgrade::run(cli, pkgs).await,
        Command::Remove { pkgs } => remove::run(cli, pkgs).await,
        Command::List { glob } => query::list(cli, glob.as_deref(), false).await,
        Command::ListInstalled { glob } => query::list(cli, glob.as_deref(), true).await,
        Command::ListUpgradable => query::list_upgradable(cli).await,
        Command::Info { pkg } | Command::Status { pkg } => query::info(cli, pkg).await,
        Command::Files { pkg } => query::files(cli, pkg).await,
        Command::Search { pattern } => query::search(cli, pattern).await,
        Command::Download { pkgs } => download::run(cli, pkgs).await,
        Command::Flag { flag, pkgs } => flag::run(cli, flag, pkgs).await,
        Command::Whatdepends { pkg } => query::whatdepends(cli, pkg, false).await,
        Command::Whatdependsrec { pkg } => query::whatdepends(cli, pkg, true).await,
        Command::Whatprovides { pkg } => query::whatprovides(cli, pkg).await,
        Command::Whatreplaces { pkg } => query::whatreplaces(cli, pkg).await,
        Command::Whatconflicts { pkg } => query::whatconflicts(cli, pkg).await,
        Command::Whatrecommends { pkg } => query::whatrecommends(cli, pkg).await,
        Command::Whatsuggests { pkg } => query::whatsuggests(cli, pkg).await,
        Command::Depends { pkg } => query::depends(cli, pkg).await,
        Command::CompareVersions { v1, op, v2 } => query::compare_versions(v1, op, v2),
        Command::PrintArchitecture => query::print_architecture(cli),
        Command::Clean => clean::run(cli),
        Command::Configure { pkgs } => configure::run(cli, pkgs).await,
        Command::ListChangedConffiles => query::list_changed_conffiles(cli).await,
    }
}
