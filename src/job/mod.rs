// src/job/mod.rs

//! Per-job state and results.
//!
//! - [`execution`] holds the live [`JobExecution`] and its state machine.
//! - [`runner`] drives one execution through provisioning and the check.

pub mod execution;
pub mod runner;

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::errors::ProvisioningError;

pub use execution::JobExecution;
pub use runner::run_job;

/// Status of a job within a run.
///
/// `pending → provisioning → {errored | running} → {succeeded | failed}`;
/// cancellation moves any non-terminal state to `errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Provisioning,
    Running,
    Succeeded,
    Failed,
    Errored,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Errored
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Provisioning => "provisioning",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Errored => "errored",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    /// The tool ran and reported a violation (nonzero exit).
    CheckFailure,
    /// The run command exceeded its wall-clock budget and was killed.
    Timeout { after_ms: u64 },
    /// A setup step failed; the check never ran.
    Provisioning { step: String, message: String },
    /// Superseded by a newer run, or the orchestrator was interrupted.
    Cancelled,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::CheckFailure => f.write_str("check failure"),
            FailureCause::Timeout { after_ms } => write!(f, "timed out after {after_ms}ms"),
            FailureCause::Provisioning { step, message } => {
                write!(f, "provisioning failed at {step}: {message}")
            }
            FailureCause::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Final, immutable outcome of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    pub job: String,
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    /// Combined stdout/stderr of the check (or of the failing setup step).
    pub log: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<FailureCause>,
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

impl JobResult {
    /// Map a finished process: exit 0 succeeds, anything else is a
    /// reported violation.
    pub fn from_exit(job: impl Into<String>, exit_code: i32, log: String, duration: Duration) -> Self {
        let (status, cause) = if exit_code == 0 {
            (JobStatus::Succeeded, None)
        } else {
            (JobStatus::Failed, Some(FailureCause::CheckFailure))
        };
        Self {
            job: job.into(),
            status,
            exit_code: Some(exit_code),
            log,
            duration_ms: millis(duration),
            cause,
        }
    }

    pub fn timed_out(job: impl Into<String>, budget: Duration, log: String, duration: Duration) -> Self {
        Self {
            job: job.into(),
            status: JobStatus::Failed,
            exit_code: None,
            log,
            duration_ms: millis(duration),
            cause: Some(FailureCause::Timeout {
                after_ms: millis(budget),
            }),
        }
    }

    pub fn provisioning_failed(err: ProvisioningError, duration: Duration) -> Self {
        Self {
            job: err.job,
            status: JobStatus::Errored,
            exit_code: None,
            log: err.log,
            duration_ms: millis(duration),
            cause: Some(FailureCause::Provisioning {
                step: err.step,
                message: err.message,
            }),
        }
    }

    pub fn cancelled(job: impl Into<String>, log: String, duration: Duration) -> Self {
        Self {
            job: job.into(),
            status: JobStatus::Errored,
            exit_code: None,
            log,
            duration_ms: millis(duration),
            cause: Some(FailureCause::Cancelled),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = millis(duration);
        self
    }

    pub fn passed(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}
