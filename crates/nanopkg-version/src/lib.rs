//! Debian-style version comparison and dependency atom algebra (spec §4.1).

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod atom;
pub mod version;

pub use atom::{Alternation, Atom, Conjunction, Op};
pub use version::Version;
