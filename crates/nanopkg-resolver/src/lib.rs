//! SAT-style dependency resolver: turns a [`Job`] over a [`nanopkg_pool::Pool`]
//! into an ordered [`Transaction`] or a list of [`Problem`]s (spec §4.6).

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod flags;
pub mod job;
pub mod problem;
pub mod solver;
pub mod transaction;

pub use flags::SolverFlags;
pub use job::{Job, JobItem, Operation, Selector};
pub use problem::{Problem, Solution, SolutionAction};
pub use solver::{solve, SolveOutcome};
pub use transaction::{Step, StepKind, Transaction};
