//! `pwi install`, against a shell script standing in for pip.
//!
//! The script appends its arguments to `pip.log`, keeps the "installed"
//! packages in `frozen.txt` (printed by `pip freeze`) and fails to install the
//! pin named in `fail_on`, if present.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use predicates::prelude::*;

use crate::common::{TestEnv, web_index};

const FAKE_PIP: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
echo "$@" >> "$dir/pip.log"
case "$1" in
  freeze)
    cat "$dir/frozen.txt" 2>/dev/null
    ;;
  install)
    if [ -f "$dir/fail_on" ] && [ "$3" = "$(cat "$dir/fail_on")" ]; then
      echo "ERROR: No matching distribution found for $3" >&2
      exit 1
    fi
    shift 2
    for pin in "$@"; do echo "$pin" >> "$dir/frozen.txt"; done
    ;;
  uninstall)
    shift 2
    for name in "$@"; do
      grep -v "^$name==" "$dir/frozen.txt" > "$dir/frozen.tmp"
      mv "$dir/frozen.tmp" "$dir/frozen.txt"
    done
    ;;
esac
exit 0
"#;

/// Create `venv/bin/pip` and return the `bin` directory.
fn fake_venv(root: &Path) -> PathBuf {
    let bin = root.join("venv").join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let pip = bin.join("pip");
    std::fs::write(&pip, FAKE_PIP).unwrap();
    std::fs::set_permissions(&pip, std::fs::Permissions::from_mode(0o755)).unwrap();
    bin
}

fn log(bin: &Path) -> Vec<String> {
    std::fs::read_to_string(bin.join("pip.log")).unwrap().lines().map(str::to_string).collect()
}

#[test]
fn test_install_runs_pip_in_plan_order() {
    let env = TestEnv::new(&web_index());
    let bin = fake_venv(env.path());

    env.pwi_with_index("install")
        .args(["flask", "--venv"])
        .arg(env.path().join("venv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed 5 package(s)"));

    assert_eq!(
        log(&bin),
        vec![
            "freeze",
            "install --no-deps click==8.1.7",
            "install --no-deps markupsafe==2.1.3",
            "install --no-deps jinja2==3.1.2",
            "install --no-deps werkzeug==3.0.1",
            "install --no-deps flask==3.0.0",
        ]
    );
}

#[test]
fn test_venv_flag_beats_configured_pip() {
    let env = TestEnv::new(&web_index());
    let bin = fake_venv(env.path());
    let config = env.write("config.toml", "pip = \"/nonexistent/config-pip\"\n");

    env.pwi_with_index("install")
        .args(["click", "--venv"])
        .arg(env.path().join("venv"))
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed 1 package(s)"));

    assert_eq!(log(&bin), vec!["freeze", "install --no-deps click==8.1.7"]);
}

#[test]
fn test_missing_pip_executable_is_named() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("install")
        .args(["click", "--pip", "/nonexistent/pip"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("/nonexistent/pip"));
}

#[test]
fn test_failed_install_restores_environment() {
    let env = TestEnv::new(&web_index());
    let bin = fake_venv(env.path());
    std::fs::write(bin.join("frozen.txt"), "gunicorn==21.2.0\n").unwrap();
    std::fs::write(bin.join("fail_on"), "jinja2==3.1.2").unwrap();

    env.pwi_with_index("install")
        .args(["flask", "--pip"])
        .arg(bin.join("pip"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to install 'jinja2==3.1.2'"))
        .stderr(predicate::str::contains("No matching distribution"));

    let log = log(&bin);
    assert_eq!(log[..3], ["freeze", "install --no-deps click==8.1.7", "install --no-deps markupsafe==2.1.3"]);
    assert_eq!(log[4..], ["freeze", "uninstall -y click markupsafe"]);
    assert_eq!(std::fs::read_to_string(bin.join("frozen.txt")).unwrap(), "gunicorn==21.2.0\n");
}

#[test]
fn test_install_requires_pip_in_venv() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("install")
        .args(["flask", "--venv"])
        .arg(env.path().join("missing-venv"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no pip found in virtual environment"));
}
