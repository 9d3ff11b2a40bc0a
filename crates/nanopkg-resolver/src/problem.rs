//! Resolver problems and their candidate solutions (spec §4.6 "Solve").

use nanopkg_pool::SolvableId;

/// One concrete action a solution applies to resolve a [`Problem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionAction {
    Erase(SolvableId),
    Keep(SolvableId),
    Install(SolvableId),
}

/// One way to resolve a [`Problem`] (spec §4.6 "the solver enumerates
/// solutions; in interactive mode the user picks one").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub description: String,
    pub actions: Vec<SolutionAction>,
}

impl Solution {
    #[must_use]
    pub fn new(description: impl Into<String>, actions: Vec<SolutionAction>) -> Self {
        Self {
            description: description.into(),
            actions,
        }
    }
}

/// A single unsatisfiable requirement or conflict blocking the solve
/// (spec §4.6, §8 scenario 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub description: String,
    pub solutions: Vec<Solution>,
}

impl Problem {
    #[must_use]
    pub fn new(description: impl Into<String>, solutions: Vec<Solution>) -> Self {
        Self {
            description: description.into(),
            solutions,
        }
    }
}
