//! Transaction summary and interactive confirmation (spec §4.7 step 3).

use console::style;
use dialoguer::Confirm;

use nanopkg_core::Result;
use nanopkg_pool::Pool;
use nanopkg_resolver::{StepKind, Transaction};

/// Render the transaction's step list the way the summary is printed
/// before a `y/N` prompt (and, non-interactively, before applying).
#[must_use]
pub fn summary(txn: &Transaction, pool: &Pool) -> String {
    let mut lines = Vec::with_capacity(txn.steps.len());
    for step in txn.iter() {
        let solvable = pool.solvable(step.solvable);
        let verb = match step.kind {
            StepKind::Install | StepKind::MultiInstall => "Install",
            StepKind::Erase => "Remove",
            StepKind::Upgraded => "Upgrade",
            StepKind::Downgraded => "Downgrade",
            StepKind::Reinstalled => "Reinstall",
            StepKind::Changed => "Change",
        };
        lines.push(format!(
            "  {} {} ({})",
            verb,
            solvable.name,
            solvable.version
        ));
    }
    lines.join("\n")
}

/// Print the summary and, when `interactive`, require an explicit `y`
/// before proceeding (spec §4.7 step 3). Non-interactive runs always
/// proceed after printing.
///
/// # Errors
/// Returns an error if the interactive prompt itself cannot be read (a
/// closed stdin, for instance).
pub fn confirm(txn: &Transaction, pool: &Pool, interactive: bool) -> Result<bool> {
    if txn.is_empty() {
        return Ok(true);
    }
    println!("{}", style("The following changes will be made:").bold());
    println!("{}", summary(txn, pool));

    if !interactive {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt("Proceed?")
        .default(false)
        .interact()
        .map_err(|e| nanopkg_core::Error::script("nanopkg", "confirm", format!("confirmation prompt failed: {e}")))
}
