// src/engine/dispatcher.rs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::info;

use crate::errors::Result;
use crate::event::Event;
use crate::exec::CheckExecutor;
use crate::provision::Provisioner;
use crate::trigger::TriggerListener;

use super::orchestrator::Orchestrator;
use super::run::{Run, RunId};
use super::supervisor::Supervisor;

/// Entry point for incoming events: admits them through the trigger
/// listener, registers the run with the supervisor and executes it in the
/// background.
#[derive(Debug)]
pub struct Dispatcher<P: ?Sized, E: ?Sized> {
    trigger: TriggerListener,
    supervisor: Arc<Mutex<Supervisor>>,
    orchestrator: Orchestrator<P, E>,
}

/// Cancels a dispatcher's in-flight runs from another task, e.g. a Ctrl-C
/// handler.
#[derive(Debug, Clone)]
pub struct RunCanceller {
    supervisor: Arc<Mutex<Supervisor>>,
}

impl RunCanceller {
    /// Cancel every in-flight run.
    pub fn cancel_all(&self) {
        lock(&self.supervisor).cancel_all();
    }
}

/// A run executing in the background.
#[derive(Debug)]
pub struct RunHandle {
    run_id: RunId,
    handle: JoinHandle<Result<Run>>,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> Result<Run> {
        let run_id = self.run_id;
        self.handle
            .await
            .with_context(|| format!("run {run_id} task failed"))?
    }
}

impl<P, E> Dispatcher<P, E>
where
    P: Provisioner + ?Sized + 'static,
    E: CheckExecutor + ?Sized + 'static,
{
    pub fn new(trigger: TriggerListener, supervisor: Supervisor, orchestrator: Orchestrator<P, E>) -> Self {
        Self {
            trigger,
            supervisor: Arc::new(Mutex::new(supervisor)),
            orchestrator,
        }
    }

    pub fn canceller(&self) -> RunCanceller {
        RunCanceller {
            supervisor: Arc::clone(&self.supervisor),
        }
    }

    /// Number of runs registered and not yet finished.
    pub fn active_runs(&self) -> usize {
        lock(&self.supervisor).active_runs()
    }

    /// Submit an event. Returns `None` when the trigger listener rejects it.
    pub fn submit(&mut self, event: Event) -> Option<RunHandle> {
        let run = self.trigger.admit(event)?;
        let run_id = run.id();
        let event = run.event().clone();
        let cancel = lock(&self.supervisor).register(&event, run_id);

        let orchestrator = self.orchestrator.clone();
        let supervisor = Arc::clone(&self.supervisor);
        let handle = tokio::spawn(async move {
            let result = orchestrator.execute(run, cancel).await;
            lock(&supervisor).finish(&event, run_id);
            result
        });

        Some(RunHandle { run_id, handle })
    }

    /// Cancel every in-flight run.
    pub fn cancel_all(&self) {
        self.canceller().cancel_all();
    }
}

/// Lock the supervisor, recovering from a poisoned mutex. Its state stays
/// consistent across a panic in any single method.
fn lock(supervisor: &Mutex<Supervisor>) -> MutexGuard<'_, Supervisor> {
    supervisor.lock().unwrap_or_else(PoisonError::into_inner)
}
