// src/engine/orchestrator.rs

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::cancel::CancelSignal;
use crate::errors::Result;
use crate::exec::CheckExecutor;
use crate::job::{JobResult, run_job};
use crate::provision::Provisioner;

use super::RuntimeOptions;
use super::run::Run;

/// Message sent by a job task when its execution reached a terminal status.
#[derive(Debug)]
pub struct JobFinished(pub JobResult);

/// Runs every job of a run concurrently and collects their results.
///
/// Each job is its own Tokio task; the run itself is owned by a single
/// collector loop fed over an `mpsc` channel, so jobs never wait on each
/// other.
pub struct Orchestrator<P: ?Sized, E: ?Sized> {
    provisioner: Arc<P>,
    executor: Arc<E>,
    options: RuntimeOptions,
}

impl<P: ?Sized, E: ?Sized> Clone for Orchestrator<P, E> {
    fn clone(&self) -> Self {
        Self {
            provisioner: Arc::clone(&self.provisioner),
            executor: Arc::clone(&self.executor),
            options: self.options,
        }
    }
}

impl<P: ?Sized, E: ?Sized> fmt::Debug for Orchestrator<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<P, E> Orchestrator<P, E>
where
    P: Provisioner + ?Sized + 'static,
    E: CheckExecutor + ?Sized + 'static,
{
    pub fn new(provisioner: Arc<P>, executor: Arc<E>, options: RuntimeOptions) -> Self {
        Self {
            provisioner,
            executor,
            options,
        }
    }

    pub fn options(&self) -> RuntimeOptions {
        self.options
    }

    /// Execute all of `run`'s jobs and return it once every job reported,
    /// or once it is marked stalled.
    pub async fn execute(&self, mut run: Run, cancel: CancelSignal) -> Result<Run> {
        let executions = run.take_executions();
        if executions.is_empty() {
            return Err(anyhow!("run {} has no pending jobs (already executed?)", run.id()).into());
        }

        info!(run_id = %run.id(), event = %run.event(), jobs = executions.len(), "run started");

        let event = Arc::new(run.event().clone());
        let (tx, mut rx) = mpsc::channel::<JobFinished>(executions.len());
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(executions.len());

        for execution in executions {
            let span = info_span!("job", run_id = %run.id(), job = %execution.name());
            let provisioner = Arc::clone(&self.provisioner);
            let executor = Arc::clone(&self.executor);
            let event = Arc::clone(&event);
            let cancel = cancel.clone();
            let tx = tx.clone();

            handles.push(tokio::spawn(
                async move {
                    let result =
                        run_job(execution, &event, &*provisioner, &*executor, cancel).await;
                    if tx.send(JobFinished(result)).await.is_err() {
                        debug!("run collector gone; dropping job result");
                    }
                }
                .instrument(span),
            ));
        }
        drop(tx);

        // A timeout too large to represent never elapses.
        let deadline = self
            .options
            .run_timeout
            .and_then(|t| tokio::time::Instant::now().checked_add(t));

        while !run.is_terminal() {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(msg) => msg,
                    Err(_) => {
                        warn!(run_id = %run.id(), missing = ?run.missing_jobs(), "run timeout elapsed; marking run stalled");
                        run.mark_stalled();
                        break;
                    }
                },
                None => rx.recv().await,
            };

            match next {
                Some(JobFinished(result)) => {
                    debug!(run_id = %run.id(), job = %result.job, status = %result.status, "job result received");
                    if let Err(e) = run.append(result) {
                        warn!(run_id = %run.id(), error = %e, "discarding job result");
                    }
                }
                None => {
                    error!(run_id = %run.id(), missing = ?run.missing_jobs(), "job tasks ended without reporting; marking run stalled");
                    run.mark_stalled();
                    break;
                }
            }
        }

        if run.is_stalled() {
            // Dropping a job's future kills its processes and removes its
            // workspace.
            for handle in handles.iter() {
                handle.abort();
            }
        }

        info!(run_id = %run.id(), status = %run.status(), "run finished");
        Ok(run)
    }
}
