// src/exec/mod.rs

//! Check execution layer.
//!
//! - [`backend`] provides the `CheckExecutor` trait; tests replace the
//!   production implementation with a fake.
//! - [`task_runner`] holds `ShellCheckExecutor`, which runs a job's command
//!   with `tokio::process::Command` under its time budget.
//! - [`capability`] starts and stops side-capabilities (virtual display).
//! - [`command`] has the shell/output helpers shared with provisioning.

pub mod backend;
pub mod capability;
pub mod command;
pub mod task_runner;

pub use backend::CheckExecutor;
pub use task_runner::ShellCheckExecutor;
