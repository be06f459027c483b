// tests/config_errors.rs

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use checkrun::config::load_and_validate;
use checkrun::errors::CheckrunError;
use checkrun::registry::{JobRegistry, SetupStep};
use checkrun::types::{SideCapability, SupersedeBehaviour};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn expect_config_error(contents: &str, needle: &str) {
    let file = config_file(contents);
    match load_and_validate(file.path()) {
        Err(CheckrunError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} lacks {needle:?}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn full_config_loads_and_expands() {
    let file = config_file(
        r#"
[config]
tracked_branches = ["master", "release/*"]
superseded_runs = "cancel"
default_timeout = "10m"
run_timeout = "1h"
repository = "https://example.org/mantaray.git"

[provision]
install_runtime = "uv venv --python {version} .venv"

[capabilities]
display_base = 120

[job.license-year]
version = "3.9"
run = "grep \"Copyright (c) $(date +%Y)\" LICENSE"
timeout = "1m"

[job.mypy]
versions = ["3.8", "3.9"]
manifests = ["requirements.txt", "requirements-dev.txt"]
run = "python -m mypy mantaray"

[job.pytest]
version = "3.9"
manifests = ["requirements.txt"]
run = "python -m pytest"
capabilities = ["virtual_display"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.settings.superseded_runs, SupersedeBehaviour::Cancel);
    assert_eq!(cfg.settings.run_timeout, Some(Duration::from_secs(3600)));
    assert_eq!(cfg.settings.repository.as_deref(), Some("https://example.org/mantaray.git"));
    assert_eq!(cfg.provision.install_runtime, "uv venv --python {version} .venv");
    assert_eq!(cfg.capabilities.display_base, 120);

    let registry = JobRegistry::from_config(&cfg);
    let names: Vec<&str> = registry.names().collect();
    assert_eq!(names, vec!["license-year", "mypy-3.8", "mypy-3.9", "pytest"]);

    let mypy = registry.get("mypy-3.8").unwrap();
    assert_eq!(mypy.runtime.version, "3.8");
    assert_eq!(mypy.timeout, Duration::from_secs(600));
    assert_eq!(
        mypy.steps[2],
        SetupStep::InstallManifest {
            path: "requirements.txt".to_string()
        }
    );

    let pytest = registry.get("pytest").unwrap();
    assert!(pytest.requires(SideCapability::VirtualDisplay));
    assert_eq!(registry.get("license-year").unwrap().timeout, Duration::from_secs(60));
}

#[test]
fn config_without_jobs_is_rejected() {
    expect_config_error("[config]\ntracked_branches = [\"master\"]\n", "at least one [job.<name>] section");
}

#[test]
fn duplicate_expanded_names_are_rejected() {
    expect_config_error(
        r#"
[job.mypy]
versions = ["3.9"]
run = "mypy ."

[job."mypy-3.9"]
version = "3.9"
run = "mypy ."
"#,
        "both expand to 'mypy-3.9'",
    );
}

#[test]
fn bad_duration_is_rejected() {
    expect_config_error(
        r#"
[job.black]
version = "3.9"
run = "black --check ."
timeout = "soon"
"#,
        "[job.black].timeout",
    );
}

#[test]
fn empty_run_command_is_rejected() {
    expect_config_error(
        r#"
[job.black]
version = "3.9"
run = "   "
"#,
        "empty `run` command",
    );
}

#[test]
fn missing_runtime_version_is_rejected() {
    expect_config_error(
        r#"
[job.black]
run = "black --check ."
"#,
        "must pin a runtime `version`",
    );
}

#[test]
fn unknown_keys_are_toml_errors() {
    let file = config_file(
        r#"
[job.black]
version = "3.9"
run = "black --check ."
after = ["flake8"]
"#,
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(CheckrunError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_and_validate(dir.path().join("Checkrun.toml")),
        Err(CheckrunError::IoError(_))
    ));
}
