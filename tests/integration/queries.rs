//! `pwi tree`, `pwi why` and `pwi cycles`

use predicates::prelude::*;
use pwi_cli::test_utils::IndexFixture;

use crate::common::{TestEnv, web_index};

fn cyclic_index() -> IndexFixture {
    IndexFixture::new()
        .package("a", "1.0", &["b"])
        .package("b", "1.0", &["c"])
        .package("c", "1.0", &["a"])
        .package("d", "1.0", &["d"])
}

#[test]
fn test_tree_marks_repeated_packages() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("tree").arg("flask").assert().success().stdout(
        "\
flask==3.0.0
├── click==8.1.7
├── jinja2==3.1.2
│   └── markupsafe==2.1.3
└── werkzeug==3.0.1
    └── markupsafe==2.1.3 (*)

(*) = already shown above
",
    );
}

#[test]
fn test_tree_with_several_roots() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("tree")
        .args(["click<8", "markupsafe<2.1"])
        .assert()
        .success()
        .stdout("click==7.1.2\nmarkupsafe==2.0.1\n");
}

#[test]
fn test_why_prints_shortest_chain() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("why")
        .args(["flask", "MarkupSafe", "flask"])
        .assert()
        .success()
        .stdout("flask==3.0.0 -> jinja2==3.1.2 -> markupsafe==2.1.3\n");
}

#[test]
fn test_why_without_a_chain() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("why")
        .args(["click", "markupsafe", "flask"])
        .assert()
        .success()
        .stdout(predicate::str::contains("'click' does not depend on 'markupsafe'"));

    env.pwi_with_index("why")
        .args(["django", "click", "flask"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("'django' is not part of the resolved packages"));
}

#[test]
fn test_cycles_lists_every_cycle() {
    let env = TestEnv::new(&cyclic_index());

    env.pwi_with_index("cycles")
        .args(["b", "d"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 circular dependency chain(s)"))
        .stdout(predicate::str::contains("  a -> b -> c -> a\n"))
        .stdout(predicate::str::contains("  d -> d\n"));

    let output = env.pwi_with_index("cycles").args(["b", "d", "--format", "json"]).assert().success();
    let cycles: Vec<Vec<String>> = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(cycles, vec![vec!["a", "b", "c", "a"], vec!["d", "d"]]);
}

#[test]
fn test_cycles_on_acyclic_graph() {
    let env = TestEnv::new(&web_index());

    env.pwi_with_index("cycles")
        .arg("flask")
        .assert()
        .success()
        .stdout(predicate::str::contains("No circular dependencies among 5 package(s)"));
}
