// src/errors.rs

//! Crate-wide error types.
//!
//! [`CheckrunError`] covers infrastructure problems of the orchestrator
//! itself (bad config, IO, bookkeeping bugs). [`ProvisioningError`] is the
//! per-job failure raised while preparing an environment; it never aborts
//! the run, it only marks its own job `errored`.

use thiserror::Error;

use crate::job::JobStatus;

#[derive(Error, Debug)]
pub enum CheckrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid status transition for job '{job}': {from:?} -> {to:?}")]
    InvalidTransition {
        job: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Unexpected result for job '{0}' (unknown job or duplicate result)")]
    UnexpectedResult(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A setup step failed while provisioning a job's environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{step} failed for job '{job}': {message}")]
pub struct ProvisioningError {
    pub job: String,
    /// Name of the failing step (`checkout`, `install_runtime`, ...).
    pub step: String,
    pub message: String,
    /// Output captured from the failing step, if any.
    pub log: String,
}

impl ProvisioningError {
    pub fn new(job: impl Into<String>, step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            step: step.into(),
            message: message.into(),
            log: String::new(),
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CheckrunError>;
