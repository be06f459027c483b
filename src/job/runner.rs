// src/job/runner.rs

use std::time::Instant;

use tracing::{info, warn};

use crate::cancel::CancelSignal;
use crate::event::Event;
use crate::exec::CheckExecutor;
use crate::job::{JobExecution, JobResult, JobStatus};
use crate::provision::Provisioner;

/// Drive one job from `pending` to a terminal status.
///
/// Provisioning failures and cancellation become `errored` results; the
/// environment is released on every path before the result is returned.
pub async fn run_job<P, E>(
    mut execution: JobExecution,
    event: &Event,
    provisioner: &P,
    executor: &E,
    mut cancel: CancelSignal,
) -> JobResult
where
    P: Provisioner + ?Sized,
    E: CheckExecutor + ?Sized,
{
    let start = Instant::now();
    let definition = execution.definition().clone();
    let name = definition.name.as_str();

    if cancel.is_cancelled() {
        mark(&mut execution, JobStatus::Errored);
        return JobResult::cancelled(name, String::new(), start.elapsed());
    }

    mark(&mut execution, JobStatus::Provisioning);

    let provisioned = tokio::select! {
        res = provisioner.provision(&definition, event) => Some(res),
        _ = cancel.cancelled() => None,
    };

    let env = match provisioned {
        Some(Ok(env)) => env,
        Some(Err(err)) => {
            warn!(job = %name, step = %err.step, error = %err.message, "provisioning failed; check skipped");
            mark(&mut execution, JobStatus::Errored);
            return JobResult::provisioning_failed(err, start.elapsed());
        }
        None => {
            // The provision future was dropped mid-step, taking its
            // workspace with it.
            info!(job = %name, "cancelled during provisioning");
            mark(&mut execution, JobStatus::Errored);
            return JobResult::cancelled(name, String::new(), start.elapsed());
        }
    };

    mark(&mut execution, JobStatus::Running);
    let result = executor.execute(&definition, &env, cancel).await;
    mark(&mut execution, result.status);

    if let Err(e) = env.release() {
        warn!(job = %name, error = %e, "failed to remove workspace");
    }

    info!(
        job = %name,
        status = %result.status,
        exit_code = ?result.exit_code,
        "job finished"
    );
    result.with_duration(start.elapsed())
}

fn mark(execution: &mut JobExecution, next: JobStatus) {
    if let Err(e) = execution.transition(next) {
        warn!(error = %e, "ignoring invalid job status transition");
    }
}
