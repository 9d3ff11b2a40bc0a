//! The unified solvable store queried by the resolver (spec §3, §4.2).
//!
//! A [`Pool`] holds every known [`Solvable`] — across every configured
//! repository plus the distinguished installed repo — and answers
//! `whatprovides` queries over them.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod pool;
pub mod solvable;

pub use pool::{Interner, Pool, Repo, INSTALLED_REPO_NAME};
pub use solvable::{Flag, FlagSet, PackageState, RepoId, Solvable, SolvableId, Status, Want};
