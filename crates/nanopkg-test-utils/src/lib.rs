//! Shared test fixtures for the nanopkg workspace (spec §15).
//!
//! Kept deliberately small: a throwaway [`Pool`](nanopkg_pool::Pool) built
//! from inline control stanzas, a [`TempDest`](fixtures::TempDest) with the
//! on-disk layout §6 describes, a [`mock_repo`](mock_server::mock_repo)
//! fake repository server, and the proptest strategies the version-algebra
//! invariants in §8 are checked against.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod fixtures;
pub mod mock_server;
pub mod proptest_strategies;

pub use fixtures::{build_ipk, fixture_pool, md5_hex, sha256_hex, temp_dest, write_ipk, ArchiveEntry, TempDest};
pub use mock_server::mock_repo;
