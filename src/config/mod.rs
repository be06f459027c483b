// src/config/mod.rs

//! Configuration loading and validation for checkrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into a typed [`ConfigFile`] (`validate.rs`).
//! - Provide the built-in job registry (`builtin.rs`).

pub mod builtin;
pub mod loader;
pub mod model;
pub mod validate;

pub use builtin::builtin_config;
pub use loader::{load_and_validate, load_from_path, parse_and_validate};
pub use model::{
    CapabilitiesSection, CapabilitySettings, ConfigFile, ConfigSection, JobConfig, JobSpec,
    ProvisionSection, ProvisionSettings, RawConfigFile, Settings,
};
