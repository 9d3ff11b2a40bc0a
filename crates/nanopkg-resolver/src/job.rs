//! A `Job`: the set of requested operations input to the resolver (spec
//! §3, §4.6).

use nanopkg_version::Atom;

/// One requested transaction-level operation (spec §3 `Job`). Several
/// operations may be OR-combined on the same selector by pushing multiple
/// `JobItem`s with the same selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Remove,
    Update,
    DistUpgrade,
    Lock,
    EraseSpecific,
    Cleandeps,
    Forcebest,
}

/// What a job item names: either a specific package by name/constraint, or
/// "every installed package" (used by a selector-less `dist-upgrade`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Atom(Atom),
    AllInstalled,
}

impl Selector {
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Atom(atom) => atom.name.clone(),
            Self::AllInstalled => "*".to_string(),
        }
    }
}

/// One `(operation, selector)` pair (spec §3 `Job`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobItem {
    pub operation: Operation,
    pub selector: Selector,
}

impl JobItem {
    #[must_use]
    pub fn new(operation: Operation, selector: Selector) -> Self {
        Self { operation, selector }
    }
}

/// A set of requested operations (spec §3 `Job`), the resolver's input
/// alongside the pool and solver flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Job {
    pub items: Vec<JobItem>,
}

impl Job {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: JobItem) -> &mut Self {
        self.items.push(item);
        self
    }

    #[must_use]
    pub fn install(atom: Atom) -> Self {
        let mut job = Self::new();
        job.push(JobItem::new(Operation::Install, Selector::Atom(atom)));
        job
    }

    #[must_use]
    pub fn remove(atom: Atom) -> Self {
        let mut job = Self::new();
        job.push(JobItem::new(Operation::Remove, Selector::Atom(atom)));
        job
    }

    #[must_use]
    pub fn dist_upgrade() -> Self {
        let mut job = Self::new();
        job.push(JobItem::new(Operation::DistUpgrade, Selector::AllInstalled));
        job
    }
}
