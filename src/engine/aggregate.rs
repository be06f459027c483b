// src/engine/aggregate.rs

//! Result Aggregator: folds job results into the run verdict.

use crate::job::JobResult;

use super::run::{Run, RunStatus};

/// Status of `run`: `running` until every job reported, then the verdict
/// over its results. A stalled run is never a success.
pub fn aggregate(run: &Run) -> RunStatus {
    if run.is_stalled() {
        return RunStatus::Stalled;
    }
    if !run.is_terminal() {
        return RunStatus::Running;
    }
    verdict(run.results())
}

/// `success` iff every result succeeded, `failure` otherwise.
pub fn verdict(results: &[JobResult]) -> RunStatus {
    if results.iter().all(JobResult::passed) {
        RunStatus::Success
    } else {
        RunStatus::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProvisioningError;
    use std::time::Duration;

    fn ok(job: &str) -> JobResult {
        JobResult::from_exit(job, 0, String::new(), Duration::ZERO)
    }

    #[test]
    fn all_succeeded_is_success() {
        let results = vec![ok("a"), ok("b"), ok("c"), ok("d")];
        assert_eq!(verdict(&results), RunStatus::Success);
    }

    #[test]
    fn any_failure_or_error_is_failure() {
        let failed = vec![ok("a"), JobResult::from_exit("b", 1, String::new(), Duration::ZERO)];
        assert_eq!(verdict(&failed), RunStatus::Failure);

        let errored = vec![
            ok("a"),
            JobResult::provisioning_failed(
                ProvisioningError::new("b", "install_manifest", "boom"),
                Duration::ZERO,
            ),
        ];
        assert_eq!(verdict(&errored), RunStatus::Failure);

        let timed_out = vec![JobResult::timed_out(
            "a",
            Duration::from_secs(1),
            String::new(),
            Duration::from_secs(1),
        )];
        assert_eq!(verdict(&timed_out), RunStatus::Failure);
    }

    #[test]
    fn verdict_ignores_order() {
        let mut results = vec![
            ok("a"),
            JobResult::cancelled("b", String::new(), Duration::ZERO),
            ok("c"),
        ];
        let first = verdict(&results);
        results.reverse();
        assert_eq!(verdict(&results), first);
    }
}
