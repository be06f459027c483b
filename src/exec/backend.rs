// src/exec/backend.rs

//! Pluggable check executor abstraction.
//!
//! The job runner talks to a `CheckExecutor` instead of spawning processes
//! itself. Production uses [`ShellCheckExecutor`](super::ShellCheckExecutor);
//! tests can provide a fake that returns scripted results without spawning
//! anything.

use crate::cancel::CancelSignal;
use crate::job::JobResult;
use crate::provision::Environment;
use crate::registry::JobDefinition;
use crate::types::BoxFuture;

/// Trait abstracting how a job's run command is executed.
pub trait CheckExecutor: Send + Sync {
    /// Run `job`'s command inside `env` and report its terminal result.
    ///
    /// Implementations must:
    /// - start the job's side-capabilities before the command and tear
    ///   them down afterwards, whatever the outcome
    /// - map exit 0 to `succeeded` and anything else to `failed`
    /// - kill the command after `job.timeout` and report a timeout
    /// - stop early with a `Cancelled` result when `cancel` fires
    fn execute<'a>(
        &'a self,
        job: &'a JobDefinition,
        env: &'a Environment,
        cancel: CancelSignal,
    ) -> BoxFuture<'a, JobResult>;
}
