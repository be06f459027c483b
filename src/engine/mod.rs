// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`run`] holds the [`Run`] value: one event, one pending execution per
//!   job, results appended as jobs finish.
//! - [`aggregate`] is the pure Result Aggregator.
//! - [`orchestrator`] executes a run's jobs concurrently and collects their
//!   results over a channel.
//! - [`supervisor`] tracks in-flight runs and cancels superseded ones.
//! - [`dispatcher`] ties trigger, supervisor and orchestrator together.

use std::time::Duration;

use crate::config::model::Settings;

/// Options shared by every run the orchestrator executes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Stop waiting for job results after this long and report the run as
    /// stalled. `None` waits until every job reports.
    pub run_timeout: Option<Duration>,
}

impl RuntimeOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            run_timeout: settings.run_timeout,
        }
    }
}

pub mod aggregate;
pub mod dispatcher;
pub mod orchestrator;
pub mod run;
pub mod supervisor;

pub use aggregate::{aggregate, verdict};
pub use dispatcher::{Dispatcher, RunCanceller, RunHandle};
pub use orchestrator::{JobFinished, Orchestrator};
pub use run::{Run, RunId, RunStatus};
pub use supervisor::Supervisor;
