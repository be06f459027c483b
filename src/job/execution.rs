// src/job/execution.rs

use std::sync::Arc;

use tracing::debug;

use crate::errors::{CheckrunError, Result};
use crate::job::JobStatus;
use crate::registry::JobDefinition;

/// Live instance of a job within a run.
///
/// Owned by the task executing it; the status only moves forward along the
/// job state machine and never leaves a terminal state.
#[derive(Debug)]
pub struct JobExecution {
    definition: Arc<JobDefinition>,
    status: JobStatus,
}

impl JobExecution {
    pub fn new(definition: Arc<JobDefinition>) -> Self {
        Self {
            definition,
            status: JobStatus::Pending,
        }
    }

    pub fn definition(&self) -> &Arc<JobDefinition> {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Move to `next`, rejecting anything the state machine does not allow.
    pub fn transition(&mut self, next: JobStatus) -> Result<()> {
        if !is_allowed(self.status, next) {
            return Err(CheckrunError::InvalidTransition {
                job: self.definition.name.clone(),
                from: self.status,
                to: next,
            });
        }
        debug!(job = %self.definition.name, from = %self.status, to = %next, "job status change");
        self.status = next;
        Ok(())
    }
}

fn is_allowed(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;

    match (from, to) {
        (Pending, Provisioning) => true,
        (Provisioning, Running) => true,
        (Running, Succeeded) | (Running, Failed) => true,
        // Provisioning failure, or cancellation of any live job.
        (Pending | Provisioning | Running, Errored) => true,
        _ => false,
    }
}
