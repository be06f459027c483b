// src/config/builtin.rs

//! The built-in job registry, used with `--builtin`.
//!
//! It describes the checks run for the project on every push to `master`
//! and every pull request: a license-year check, two style/static-analysis
//! checks, a type-check across a small runtime matrix, and the test suite
//! under a virtual display.

use crate::config::loader::parse_and_validate;
use crate::config::model::ConfigFile;
use crate::errors::Result;

pub const BUILTIN_TOML: &str = r#"
[config]
tracked_branches = ["master"]
superseded_runs = "independent"
default_timeout = "20m"

[job.license-year]
version = "3.9"
run = "grep \"Copyright (c) $(date +%Y)\" LICENSE"
timeout = "1m"

[job.black]
version = "3.9"
manifests = ["requirements-dev.txt"]
run = "black --check $(git ls-files '*.py')"
timeout = "5m"

[job.pyflakes]
version = "3.9"
manifests = ["requirements-dev.txt"]
run = "python -m pyflakes $(git ls-files '*.py')"
timeout = "5m"

[job.mypy]
versions = ["3.8", "3.9"]
manifests = ["requirements.txt", "requirements-dev.txt"]
run = "python -m mypy mantaray"
timeout = "10m"

[job.pytest]
version = "3.9"
manifests = ["requirements.txt", "requirements-dev.txt"]
run = "python -m pytest --verbose"
capabilities = ["virtual_display"]
timeout = "20m"
"#;

/// Parse and validate the built-in registry.
pub fn builtin_config() -> Result<ConfigFile> {
    parse_and_validate(BUILTIN_TOML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SideCapability;

    #[test]
    fn builtin_registry_is_valid() {
        let cfg = builtin_config().unwrap();
        let names: Vec<_> = cfg.jobs.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["black", "license-year", "mypy", "pyflakes", "pytest"]);
        assert!(cfg.jobs["mypy"].matrix);
        assert!(
            cfg.jobs["pytest"]
                .capabilities
                .contains(&SideCapability::VirtualDisplay)
        );
    }
}
