// src/config/model.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{SideCapability, SupersedeBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// tracked_branches = ["master"]
/// superseded_runs = "cancel"
/// default_timeout = "30m"
///
/// [job.mypy]
/// versions = ["3.8", "3.9"]
/// manifests = ["requirements.txt", "requirements-dev.txt"]
/// run = "python -m mypy mantaray"
///
/// [job.pytest]
/// version = "3.9"
/// manifests = ["requirements.txt", "requirements-dev.txt"]
/// run = "python -m pytest"
/// capabilities = ["virtual_display"]
/// timeout = "15m"
/// ```
///
/// This is the unvalidated form; convert it with `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub provision: ProvisionSection,

    #[serde(default)]
    pub capabilities: CapabilitiesSection,

    /// All jobs from `[job.<name>]`, keyed by job name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Glob patterns for branches whose pushes start a run.
    #[serde(default = "default_tracked_branches")]
    pub tracked_branches: Vec<String>,

    /// `"independent"` (default) or `"cancel"`.
    #[serde(default)]
    pub superseded_runs: SupersedeBehaviour,

    /// Wall-clock budget for a job's run command unless the job sets one.
    #[serde(default = "default_timeout")]
    pub default_timeout: String,

    /// Give up waiting for a run after this long and report it stalled.
    #[serde(default)]
    pub run_timeout: Option<String>,

    /// Where job workspaces are created (system temp dir if unset).
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,

    /// Repository to check out; `--repo` overrides it.
    #[serde(default)]
    pub repository: Option<String>,
}

fn default_tracked_branches() -> Vec<String> {
    vec!["master".to_string()]
}

fn default_timeout() -> String {
    "30m".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            tracked_branches: default_tracked_branches(),
            superseded_runs: SupersedeBehaviour::default(),
            default_timeout: default_timeout(),
            run_timeout: None,
            workspace_root: None,
            repository: None,
        }
    }
}

/// `[provision]` section: shell templates for each typed setup step.
///
/// Placeholders: `{repo}`, `{sha}`, `{ref}`, `{job}`, `{runtime}`,
/// `{version}`, `{manifest}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionSection {
    #[serde(default = "default_checkout")]
    pub checkout: String,

    #[serde(default = "default_install_runtime")]
    pub install_runtime: String,

    #[serde(default = "default_install_manifest")]
    pub install_manifest: String,

    /// Workspace-relative directories prepended to `PATH` for the check.
    #[serde(default = "default_bin_dirs")]
    pub bin_dirs: Vec<String>,

    /// Budget for each individual setup step.
    #[serde(default = "default_step_timeout")]
    pub step_timeout: String,
}

fn default_checkout() -> String {
    "git init --quiet . && git fetch --quiet --depth 1 {repo} {sha} && git checkout --quiet FETCH_HEAD"
        .to_string()
}

fn default_install_runtime() -> String {
    "{runtime}{version} -m venv .venv".to_string()
}

fn default_install_manifest() -> String {
    ".venv/bin/python -m pip install --quiet -r {manifest}".to_string()
}

fn default_bin_dirs() -> Vec<String> {
    vec![".venv/bin".to_string()]
}

fn default_step_timeout() -> String {
    "15m".to_string()
}

impl Default for ProvisionSection {
    fn default() -> Self {
        Self {
            checkout: default_checkout(),
            install_runtime: default_install_runtime(),
            install_manifest: default_install_manifest(),
            bin_dirs: default_bin_dirs(),
            step_timeout: default_step_timeout(),
        }
    }
}

/// `[capabilities]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilitiesSection {
    /// Command started for `virtual_display`; `{display}` is replaced by
    /// the display number handed to the job.
    #[serde(default = "default_virtual_display")]
    pub virtual_display: String,

    /// First display number handed out; each job gets its own.
    #[serde(default = "default_display_base")]
    pub display_base: u32,

    /// How long to give the display server before running the check.
    #[serde(default = "default_startup_delay")]
    pub startup_delay: String,
}

fn default_virtual_display() -> String {
    "Xvfb :{display} -screen 0 1280x1024x24 -nolisten tcp".to_string()
}

fn default_display_base() -> u32 {
    99
}

fn default_startup_delay() -> String {
    "500ms".to_string()
}

impl Default for CapabilitiesSection {
    fn default() -> Self {
        Self {
            virtual_display: default_virtual_display(),
            display_base: default_display_base(),
            startup_delay: default_startup_delay(),
        }
    }
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Runtime language, e.g. `"python"`.
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Single pinned runtime version. Mutually exclusive with `versions`.
    #[serde(default)]
    pub version: Option<String>,

    /// Matrix of runtime versions; expands to one job per version.
    #[serde(default)]
    pub versions: Vec<String>,

    /// Dependency manifests installed in this order.
    #[serde(default)]
    pub manifests: Vec<String>,

    /// The check command.
    pub run: String,

    #[serde(default)]
    pub capabilities: BTreeSet<SideCapability>,

    /// Per-job budget for `run`; falls back to `[config].default_timeout`.
    #[serde(default)]
    pub timeout: Option<String>,
}

fn default_runtime() -> String {
    "python".to_string()
}

/// Validated global settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tracked_branches: Vec<String>,
    pub superseded_runs: SupersedeBehaviour,
    pub default_timeout: Duration,
    pub run_timeout: Option<Duration>,
    pub workspace_root: Option<PathBuf>,
    pub repository: Option<String>,
}

/// Validated `[provision]` settings.
#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    pub checkout: String,
    pub install_runtime: String,
    pub install_manifest: String,
    pub bin_dirs: Vec<String>,
    pub step_timeout: Duration,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        let raw = ProvisionSection::default();
        Self {
            checkout: raw.checkout,
            install_runtime: raw.install_runtime,
            install_manifest: raw.install_manifest,
            bin_dirs: raw.bin_dirs,
            step_timeout: Duration::from_secs(15 * 60),
        }
    }
}

/// Validated `[capabilities]` settings.
#[derive(Debug, Clone)]
pub struct CapabilitySettings {
    pub virtual_display: String,
    pub display_base: u32,
    pub startup_delay: Duration,
}

impl Default for CapabilitySettings {
    fn default() -> Self {
        Self {
            virtual_display: default_virtual_display(),
            display_base: default_display_base(),
            startup_delay: Duration::from_millis(500),
        }
    }
}

/// A validated job entry, before matrix expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub runtime: String,
    pub versions: Vec<String>,
    /// True when declared with `versions = [...]`; expanded names then carry
    /// the version suffix.
    pub matrix: bool,
    pub manifests: Vec<String>,
    pub run: String,
    pub capabilities: BTreeSet<SideCapability>,
    pub timeout: Duration,
}

/// Fully validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: Settings,
    pub provision: ProvisionSettings,
    pub capabilities: CapabilitySettings,
    pub jobs: BTreeMap<String, JobSpec>,
}
