//! Outcome of [`crate::InterceptRunner::finalize`] (spec §4.8, §9.1 decision 2).

use std::process::ExitStatus;

/// Result of running every queued trigger once (spec §4.8 step 5).
///
/// A failing individual trigger is recorded here rather than aborting the
/// run: finalize only returns `Err` for a precondition failure (the
/// `statedir` itself missing or unreadable), per §9.1 decision 2.
#[derive(Debug, Default)]
pub struct FinalizeReport {
    /// Trigger file names that ran and exited successfully.
    pub executed: Vec<String>,
    /// Trigger file names that ran and exited non-zero, with their status.
    pub failed: Vec<(String, ExitStatus)>,
}

impl FinalizeReport {
    /// True if every queued trigger ran successfully (spec §4.8, §9.1
    /// decision 2 "`report.all_ok() == false`" drives a non-zero exit).
    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_report_is_all_ok() {
        assert!(FinalizeReport::default().all_ok());
    }

    #[test]
    fn any_failed_trigger_flips_all_ok() {
        let mut report = FinalizeReport::default();
        report.executed.push("ldconfig".to_string());
        assert!(report.all_ok());

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            report.failed.push(("depmod".to_string(), ExitStatus::from_raw(1 << 8)));
        }
        #[cfg(unix)]
        assert!(!report.all_ok());
    }
}
