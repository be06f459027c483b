#![allow(dead_code)]

use std::sync::Arc;

use checkrun::cancel::CancelSignal;
use checkrun::engine::{Orchestrator, Run, RunId, RuntimeOptions};
use checkrun::event::Event;
use checkrun::exec::CheckExecutor;
use checkrun::provision::Provisioner;
use checkrun::registry::JobRegistry;

/// Execute one run of `registry` over `event` to completion.
pub async fn run_once<P, E>(
    registry: Arc<JobRegistry>,
    provisioner: Arc<P>,
    executor: Arc<E>,
    event: Event,
) -> Run
where
    P: Provisioner + 'static,
    E: CheckExecutor + 'static,
{
    let orchestrator = Orchestrator::new(provisioner, executor, RuntimeOptions::default());
    let run = Run::new(RunId(1), event, registry);
    orchestrator
        .execute(run, CancelSignal::never())
        .await
        .expect("run executes")
}

/// Status of every job, in registry order.
pub fn statuses(run: &Run) -> Vec<(String, checkrun::job::JobStatus)> {
    run.registry()
        .names()
        .map(|name| {
            let status = run.result(name).expect("job reported").status;
            (name.to_string(), status)
        })
        .collect()
}
