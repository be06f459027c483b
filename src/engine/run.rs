// src/engine/run.rs

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::errors::{CheckrunError, Result};
use crate::event::Event;
use crate::job::{JobExecution, JobResult};
use crate::registry::JobRegistry;

use super::aggregate::aggregate;

/// Identifier of a run, unique within one orchestrator process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Overall status of a run, derived from its job results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Some jobs have not reported yet.
    Running,
    Success,
    Failure,
    /// The run timeout elapsed before every job reported. Counts as failure.
    Stalled,
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
            RunStatus::Stalled => "stalled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One orchestrated pass of every job in the registry over one event.
///
/// Only ever changes by appending job results (and, at worst, being marked
/// stalled). The status is computed, never stored.
#[derive(Debug)]
pub struct Run {
    id: RunId,
    event: Event,
    registry: Arc<JobRegistry>,
    pending: Vec<JobExecution>,
    results: Vec<JobResult>,
    stalled: bool,
}

impl Run {
    /// A new run with one pending execution per registered job.
    pub fn new(id: RunId, event: Event, registry: Arc<JobRegistry>) -> Self {
        let pending = registry
            .iter()
            .map(|def| JobExecution::new(Arc::clone(def)))
            .collect();
        Self {
            id,
            event,
            registry,
            pending,
            results: Vec::new(),
            stalled: false,
        }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Results in arrival order.
    pub fn results(&self) -> &[JobResult] {
        &self.results
    }

    pub fn result(&self, job: &str) -> Option<&JobResult> {
        self.results.iter().find(|r| r.job == job)
    }

    /// Hand the pending executions to whoever runs them. Empty on a second
    /// call.
    pub fn take_executions(&mut self) -> Vec<JobExecution> {
        std::mem::take(&mut self.pending)
    }

    /// Record a job's result. Unknown jobs and second results for the same
    /// job are rejected.
    pub fn append(&mut self, result: JobResult) -> Result<()> {
        if self.registry.get(&result.job).is_none() || self.result(&result.job).is_some() {
            return Err(CheckrunError::UnexpectedResult(result.job));
        }
        self.results.push(result);
        Ok(())
    }

    /// Every job has reported.
    pub fn is_terminal(&self) -> bool {
        self.results.len() == self.registry.len()
    }

    /// Jobs without a result, in registry order.
    pub fn missing_jobs(&self) -> Vec<&str> {
        self.registry
            .names()
            .filter(|name| self.result(name).is_none())
            .collect()
    }

    pub fn mark_stalled(&mut self) {
        self.stalled = true;
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn status(&self) -> RunStatus {
        aggregate(self)
    }
}
