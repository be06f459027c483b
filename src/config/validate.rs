// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use std::time::Duration;

use globset::Glob;
use regex::Regex;

use crate::config::model::{
    CapabilitySettings, ConfigFile, JobConfig, JobSpec, ProvisionSettings, RawConfigFile, Settings,
};
use crate::errors::{CheckrunError, Result};
use crate::registry::matrix::expanded_name;
use crate::types::{SideCapability, parse_duration};

static JOB_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid job name regex"));

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)*[A-Za-z0-9.+-]*$").expect("valid version regex"));

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CheckrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_jobs(&raw)?;
        let settings = validate_settings(&raw)?;
        let provision = validate_provision(&raw)?;
        let capabilities = validate_capabilities(&raw)?;

        let mut jobs = BTreeMap::new();
        for (name, job) in raw.job.iter() {
            let spec = validate_job(name, job, settings.default_timeout)?;
            if !spec.capabilities.is_empty() && capabilities.virtual_display.trim().is_empty() {
                return Err(config_error(format!(
                    "job '{}' needs {} but [capabilities].virtual_display is empty",
                    name,
                    SideCapability::VirtualDisplay
                )));
            }
            jobs.insert(name.clone(), spec);
        }
        ensure_unique_expanded_names(&jobs)?;

        Ok(ConfigFile {
            settings,
            provision,
            capabilities,
            jobs,
        })
    }
}

fn config_error(msg: String) -> CheckrunError {
    CheckrunError::ConfigError(msg)
}

fn duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| config_error(format!("{field}: {e}")))
}

fn ensure_has_jobs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(config_error(
            "config must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_settings(cfg: &RawConfigFile) -> Result<Settings> {
    let section = &cfg.config;

    for pattern in section.tracked_branches.iter() {
        Glob::new(pattern).map_err(|e| {
            config_error(format!(
                "[config].tracked_branches: invalid pattern '{pattern}': {e}"
            ))
        })?;
    }

    let default_timeout = duration_field("[config].default_timeout", &section.default_timeout)?;
    let run_timeout = section
        .run_timeout
        .as_deref()
        .map(|s| duration_field("[config].run_timeout", s))
        .transpose()?;

    Ok(Settings {
        tracked_branches: section.tracked_branches.clone(),
        superseded_runs: section.superseded_runs,
        default_timeout,
        run_timeout,
        workspace_root: section.workspace_root.clone(),
        repository: section.repository.clone(),
    })
}

fn validate_provision(cfg: &RawConfigFile) -> Result<ProvisionSettings> {
    let section = &cfg.provision;

    for (field, template) in [
        ("checkout", &section.checkout),
        ("install_runtime", &section.install_runtime),
        ("install_manifest", &section.install_manifest),
    ] {
        if template.trim().is_empty() {
            return Err(config_error(format!("[provision].{field} must not be empty")));
        }
    }

    Ok(ProvisionSettings {
        checkout: section.checkout.clone(),
        install_runtime: section.install_runtime.clone(),
        install_manifest: section.install_manifest.clone(),
        bin_dirs: section.bin_dirs.clone(),
        step_timeout: duration_field("[provision].step_timeout", &section.step_timeout)?,
    })
}

fn validate_capabilities(cfg: &RawConfigFile) -> Result<CapabilitySettings> {
    let section = &cfg.capabilities;
    Ok(CapabilitySettings {
        virtual_display: section.virtual_display.clone(),
        display_base: section.display_base,
        startup_delay: duration_field("[capabilities].startup_delay", &section.startup_delay)?,
    })
}

fn validate_job(name: &str, job: &JobConfig, default_timeout: Duration) -> Result<JobSpec> {
    if !JOB_NAME.is_match(name) {
        return Err(config_error(format!(
            "invalid job name '{name}' (letters, digits, '_', '.', '-' only)"
        )));
    }

    if job.run.trim().is_empty() {
        return Err(config_error(format!("job '{name}' has an empty `run` command")));
    }

    if job.runtime.trim().is_empty() {
        return Err(config_error(format!("job '{name}' has an empty `runtime`")));
    }

    let (versions, matrix) = match (&job.version, job.versions.is_empty()) {
        (Some(_), false) => {
            return Err(config_error(format!(
                "job '{name}' sets both `version` and `versions`"
            )));
        }
        (None, true) => {
            return Err(config_error(format!(
                "job '{name}' must pin a runtime `version` (or a `versions` matrix)"
            )));
        }
        (Some(version), true) => (vec![version.clone()], false),
        (None, false) => (job.versions.clone(), true),
    };

    let mut seen = BTreeSet::new();
    for version in versions.iter() {
        if !VERSION.is_match(version) {
            return Err(config_error(format!(
                "job '{name}' has invalid runtime version '{version}'"
            )));
        }
        if !seen.insert(version.as_str()) {
            return Err(config_error(format!(
                "job '{name}' lists runtime version '{version}' twice"
            )));
        }
    }

    if let Some(manifest) = job.manifests.iter().find(|m| m.trim().is_empty()) {
        return Err(config_error(format!(
            "job '{name}' has an empty manifest entry {manifest:?}"
        )));
    }

    let timeout = match &job.timeout {
        Some(t) => duration_field(&format!("[job.{name}].timeout"), t)?,
        None => default_timeout,
    };

    Ok(JobSpec {
        runtime: job.runtime.clone(),
        versions,
        matrix,
        manifests: job.manifests.clone(),
        run: job.run.clone(),
        capabilities: job.capabilities.clone(),
        timeout,
    })
}

fn ensure_unique_expanded_names(jobs: &BTreeMap<String, JobSpec>) -> Result<()> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for (name, spec) in jobs.iter() {
        for version in spec.versions.iter() {
            let expanded = expanded_name(name, version, spec.matrix);
            if let Some(other) = seen.insert(expanded.clone(), name.as_str()) {
                return Err(config_error(format!(
                    "jobs '{other}' and '{name}' both expand to '{expanded}'"
                )));
            }
        }
    }
    Ok(())
}
