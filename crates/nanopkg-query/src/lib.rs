//! Read-only query facade over a [`nanopkg_pool::Pool`] (spec §4.9).
//!
//! Every operation here is a pure lookup: no mutation of the pool, the
//! status store or the filesystem beyond reading a package's `.list` file
//! or, for a not-yet-installed package, its archive's data tarball.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod facade;
pub mod reverse;

pub use facade::{format_info, list, matching_ids, search, Query};
pub use reverse::{depends, whatconflicts, whatdepends, whatprovides, whatrecommends, whatreplaces, whatsuggests};
