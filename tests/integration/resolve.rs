//! `pwi resolve`

use predicates::prelude::*;
use pwi_cli::test_utils::IndexFixture;

use crate::common::{TestEnv, web_index};

#[test]
fn test_resolve_prints_plan_in_install_order() {
    let env = TestEnv::new(&web_index());

    let output = env.pwi_with_index("resolve").arg("Flask>=2.0").assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();

    let order: Vec<usize> = ["click==8.1.7", "markupsafe==2.1.3", "jinja2==3.1.2", "werkzeug==3.0.1", "flask==3.0.0"]
        .iter()
        .map(|pin| stdout.find(pin).unwrap_or_else(|| panic!("{pin} missing from:\n{stdout}")))
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]), "unexpected order:\n{stdout}");
    assert!(stdout.contains("Resolved 5 package(s)"));
    assert!(stdout.contains("sha256:"));
}

#[test]
fn test_resolve_from_requirements_file_writes_pins() {
    let env = TestEnv::new(&web_index());
    env.write("base.txt", "click<8 # old cli\n");
    let requirements = env.write("requirements.txt", "-r base.txt\nflask \\\n  >=2.0\n");

    env.pwi_with_index("resolve").arg("-r").arg(&requirements).args(["--output", "pinned.txt"]).assert().success();

    let pinned = std::fs::read_to_string(env.path().join("pinned.txt")).unwrap();
    let pins: Vec<&str> = pinned.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(pins, vec!["click==7.1.2", "markupsafe==2.1.3", "jinja2==3.1.2", "werkzeug==3.0.1", "flask==2.0.3"]);
}

#[test]
fn test_resolve_json_output_is_deterministic() {
    let env = TestEnv::new(&web_index());

    let run = || {
        let output = env.pwi_with_index("resolve").args(["flask", "jinja2<3.1", "--format", "json"]).assert().success();
        serde_json::from_slice::<serde_json::Value>(&output.get_output().stdout).unwrap()
    };
    let first = run();
    assert_eq!(first, run());

    let packages = first["packages"].as_array().unwrap();
    let flask = packages.iter().find(|p| p["name"] == "flask").unwrap();
    assert_eq!(flask["version"], "2.0.3");
    assert_eq!(first["roots"], serde_json::json!(["flask", "jinja2"]));
    assert!(first["fingerprint"].as_str().unwrap().starts_with("sha256:"));
}

#[test]
fn test_resolve_strategy_flag() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("resolve")
        .args(["click>=7", "--strategy", "lowest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("click==7.1.2"));
}

#[test]
fn test_unresolvable_requirements_exit_with_conflicts() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("resolve")
        .args(["flask>=3.0", "click<8"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot resolve dependencies"))
        .stderr(predicate::str::contains("click"));
}

#[test]
fn test_dry_run_reports_conflicts_without_resolving() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("resolve")
        .args(["flask", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No conflicts"));

    env.pwi_with_index("resolve")
        .args(["click>=8", "click<8", "--dry-run", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"package\": \"click\""));
}

#[test]
fn test_dry_run_shows_how_a_transitive_conflict_is_reached() {
    let env = TestEnv::new(
        &IndexFixture::new()
            .package("app", "1.0", &["lib>=2", "util"])
            .package("util", "1.0", &["lib<2"])
            .package("lib", "1.0", &[])
            .package("lib", "2.0", &[]),
    );

    env.pwi_with_index("resolve")
        .args(["app", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 potential conflict(s) among 3 package(s)"))
        .stdout(predicate::str::contains("reached via app -> lib"));
}

#[test]
fn test_unknown_package_suggests_similar_names() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("resolve")
        .arg("flsk")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("flsk"))
        .stderr(predicate::str::contains("flask"));
}

#[test]
fn test_malformed_requirement_is_reported() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("resolve")
        .arg("flask>>2")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Malformed requirement 'flask>>2'"));
}

#[test]
fn test_missing_requirements_and_index() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("resolve").assert().code(1).stderr(predicate::str::contains("No requirements given"));
    env.pwi().args(["resolve", "flask"]).assert().code(1).stderr(predicate::str::contains("no package index"));
}

#[test]
fn test_selected_cycle_fails() {
    let fixture = IndexFixture::new().package("a", "1.0", &["b"]).package("b", "1.0", &["a>=1.0"]);
    let env = TestEnv::new(&fixture);

    env.pwi_with_index("resolve")
        .arg("a")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Circular dependency detected: a -> b -> a"));
}
