use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Generator stand-in: logs its arguments, prints a version, and exits with
/// the status stored in `GENERATE_STATUS` when asked to generate.
fn write_fake_generator(dir: &Path) -> PathBuf {
    let script = dir.join("fake-tuist");
    fs::write(
        &script,
        "#!/bin/sh\n\
         echo \"$*\" >> calls.log\n\
         if [ \"$1\" = version ]; then echo 4.2.0; fi\n\
         if [ \"$1\" = generate ] && [ -e GENERATE_STATUS ]; then echo boom >&2; exit $(cat GENERATE_STATUS); fi\n",
    )
    .unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    }
    script
}

fn workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let generator = write_fake_generator(dir.path());
    let config = dir.path().join("bootstrap.toml");
    fs::write(
        &config,
        format!("generator = \"{}\"\nvcs = \"true\"\n", generator.display()),
    )
    .unwrap();
    (dir, config)
}

fn bootstrap(dir: &TempDir, config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bootstrap").unwrap();
    cmd.current_dir(dir.path()).arg("--config").arg(config);
    cmd
}

#[test]
fn version_prints_generator_version() {
    let (dir, config) = workspace();
    bootstrap(&dir, &config)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("4.2.0"));
}

#[test]
fn generate_runs_the_pipeline() {
    let (dir, config) = workspace();
    bootstrap(&dir, &config)
        .args(["generate", "--name", "App", "--cache-enabled"])
        .assert()
        .success();

    let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
    assert!(calls.contains("cache warm --profile Development --path Projects/App"));
    assert!(calls.contains("generate --profile Development --path Projects/App --no-open"));
}

#[test]
fn failed_generation_propagates_exit_status() {
    let (dir, config) = workspace();
    fs::write(dir.path().join("GENERATE_STATUS"), "3").unwrap();

    bootstrap(&dir, &config)
        .arg("generate")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("boom"));
}

#[test]
fn malformed_provisioning_profile_is_rejected() {
    let (dir, config) = workspace();
    bootstrap(&dir, &config)
        .args(["generate", "--provisioning-profile", "AppOnly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TARGET=PROFILE"));

    assert!(!dir.path().join("calls.log").exists());
}

#[test]
fn name_conflicts_with_path() {
    let (dir, config) = workspace();
    bootstrap(&dir, &config)
        .args(["generate", "--name", "App", "--path", "Other"])
        .assert()
        .failure();
}

#[test]
fn show_prints_configuration() {
    let (dir, config) = workspace();
    bootstrap(&dir, &config)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("Generator:"))
        .stdout(predicate::str::contains("fake-tuist"))
        .stdout(predicate::str::contains("Tuist/Code_Signing"));
}

#[test]
fn invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bootstrap.toml");
    fs::write(&config, "generator = \"\"\n").unwrap();

    bootstrap(&dir, &config)
        .arg("version")
        .assert()
        .failure()
        .stderr(predicate::str::contains("generator must not be empty"));
}
