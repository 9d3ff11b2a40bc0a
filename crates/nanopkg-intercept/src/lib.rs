//! PATH-interception runner for maintainer scripts and their deferred
//! system-utility calls (spec §4.8).

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod report;
pub mod runner;

pub use report::FinalizeReport;
pub use runner::{InterceptRunner, INTERCEPT_DIR_VAR};
