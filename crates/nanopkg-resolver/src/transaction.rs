//! A `Transaction`: the ordered sequence of install/erase/upgrade steps
//! produced by a successful solve (spec §3, §4.6).

use nanopkg_pool::SolvableId;

/// What a transaction step does to the installed repo (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Install,
    MultiInstall,
    Erase,
    Upgraded,
    Downgraded,
    Reinstalled,
    Changed,
}

/// One step of an ordered transaction (spec §3 `Step`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub solvable: SolvableId,
    /// The installed solvable this step replaces, for
    /// upgrade/downgrade/reinstall/changed steps.
    pub obsoletes: Option<SolvableId>,
}

impl Step {
    #[must_use]
    pub fn new(kind: StepKind, solvable: SolvableId, obsoletes: Option<SolvableId>) -> Self {
        Self {
            kind,
            solvable,
            obsoletes,
        }
    }
}

/// An ordered sequence of steps (spec §3 `Transaction`), topologically
/// sorted so hard dependencies precede dependents (spec §4.6 "Ordering").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub steps: Vec<Step>,
}

impl Transaction {
    #[must_use]
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }
}
