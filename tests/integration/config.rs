//! Configuration discovery and precedence.

use predicates::prelude::*;

use crate::common::{TestEnv, web_index};

fn index_line(env: &TestEnv) -> String {
    format!("index = {:?}\n", env.index.to_str().unwrap())
}

#[test]
fn test_default_config_in_home_directory() {
    let env = TestEnv::new(&web_index());
    let dir = env.path().join(".pwi");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), format!("{}strategy = \"lowest\"\n", index_line(&env))).unwrap();

    env.pwi().args(["resolve", "click"]).assert().success().stdout(predicate::str::contains("click==7.1.2"));
}

#[test]
fn test_environment_variable_names_config() {
    let env = TestEnv::new(&web_index());
    let config = env.write("pwi.toml", &format!("{}strategy = \"lowest\"\n", index_line(&env)));

    env.pwi()
        .env("PWI_CONFIG", &config)
        .args(["resolve", "click>=8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("click==8.1.3"));
}

#[test]
fn test_flags_override_config_file() {
    let env = TestEnv::new(&web_index());
    let config = env.write("pwi.toml", &format!("{}strategy = \"lowest\"\n", index_line(&env)));

    env.pwi()
        .arg("--config")
        .arg(&config)
        .args(["resolve", "click", "--strategy", "highest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("click==8.1.7"));
}

#[test]
fn test_invalid_config_is_reported() {
    let env = TestEnv::new(&web_index());
    let config = env.write("pwi.toml", "max_parallel_queries = 0\n");

    env.pwi()
        .arg("--config")
        .arg(&config)
        .args(["resolve", "flask"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("max_parallel_queries"));

    env.pwi()
        .args(["--config", "does-not-exist.toml", "resolve", "flask"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}
