// src/provision/mod.rs

//! Environment Provisioner.
//!
//! - [`environment`] holds the scoped [`Environment`] handed to the check.
//! - [`backend`] defines the [`Provisioner`] trait the job runner uses.
//! - [`shell`] is the production provisioner, running each typed setup step
//!   as a shell command inside a fresh temporary workspace.

pub mod backend;
pub mod environment;
pub mod shell;

pub use backend::Provisioner;
pub use environment::Environment;
pub use shell::ShellProvisioner;
