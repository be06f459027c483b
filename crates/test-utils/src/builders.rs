#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use checkrun::config::{
    CapabilitiesSection, ConfigFile, ConfigSection, JobConfig, ProvisionSection, RawConfigFile,
};
use checkrun::registry::{JobDefinition, JobRegistry, RuntimeSpec};
use checkrun::types::{SideCapability, SupersedeBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                provision: ProvisionSection::default(),
                capabilities: CapabilitiesSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.config.job.insert(name.to_string(), job);
        self
    }

    pub fn tracked_branches(mut self, patterns: &[&str]) -> Self {
        self.config.config.tracked_branches = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn superseded_runs(mut self, behaviour: SupersedeBehaviour) -> Self {
        self.config.config.superseded_runs = behaviour;
        self
    }

    pub fn run_timeout(mut self, timeout: &str) -> Self {
        self.config.config.run_timeout = Some(timeout.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `[job.<name>]` entry.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(run: &str) -> Self {
        Self {
            job: JobConfig {
                runtime: "python".to_string(),
                version: Some("3.9".to_string()),
                versions: vec![],
                manifests: vec![],
                run: run.to_string(),
                capabilities: BTreeSet::new(),
                timeout: None,
            },
        }
    }

    pub fn versions(mut self, versions: &[&str]) -> Self {
        self.job.version = None;
        self.job.versions = versions.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn manifest(mut self, path: &str) -> Self {
        self.job.manifests.push(path.to_string());
        self
    }

    pub fn virtual_display(mut self) -> Self {
        self.job.capabilities.insert(SideCapability::VirtualDisplay);
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.job.timeout = Some(timeout.to_string());
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

/// Builder for a single `JobDefinition`.
pub struct JobDefinitionBuilder {
    name: String,
    version: String,
    manifests: Vec<String>,
    run: String,
    capabilities: BTreeSet<SideCapability>,
    timeout: Duration,
}

impl JobDefinitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "3.9".to_string(),
            manifests: vec![],
            run: format!("run-{name}"),
            capabilities: BTreeSet::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn manifest(mut self, path: &str) -> Self {
        self.manifests.push(path.to_string());
        self
    }

    pub fn run(mut self, cmd: &str) -> Self {
        self.run = cmd.to_string();
        self
    }

    pub fn virtual_display(mut self) -> Self {
        self.capabilities.insert(SideCapability::VirtualDisplay);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> JobDefinition {
        JobDefinition::new(
            self.name,
            RuntimeSpec::new("python", self.version),
            &self.manifests,
            self.run,
            self.capabilities,
            self.timeout,
        )
    }
}

/// Builder for a `JobRegistry` made of explicit definitions.
#[derive(Default)]
pub struct RegistryBuilder {
    jobs: Vec<JobDefinition>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four-job set used throughout the run scenarios: license year,
    /// two style checks and the test suite under a virtual display.
    pub fn project_checks() -> Self {
        Self::new()
            .job(JobDefinitionBuilder::new("license-year").build())
            .job(JobDefinitionBuilder::new("black").manifest("requirements-dev.txt").build())
            .job(JobDefinitionBuilder::new("pyflakes").manifest("requirements-dev.txt").build())
            .job(
                JobDefinitionBuilder::new("pytest")
                    .manifest("requirements.txt")
                    .manifest("requirements-dev.txt")
                    .virtual_display()
                    .build(),
            )
    }

    pub fn job(mut self, def: JobDefinition) -> Self {
        self.jobs.push(def);
        self
    }

    pub fn build(self) -> Arc<JobRegistry> {
        Arc::new(JobRegistry::from_definitions(self.jobs).expect("valid registry"))
    }
}
