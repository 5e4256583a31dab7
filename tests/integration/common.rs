//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use pwi_cli::test_utils::IndexFixture;
use tempfile::TempDir;

/// The Flask stack used across the suite.
pub fn web_index() -> IndexFixture {
    IndexFixture::new()
        .package("flask", "2.0.3", &["werkzeug>=2.0", "jinja2>=3.0", "click>=7.1.2"])
        .package("flask", "3.0.0", &["werkzeug>=3.0", "jinja2>=3.1.2", "click>=8.1.3"])
        .package("werkzeug", "2.0.3", &[])
        .package("werkzeug", "3.0.1", &["MarkupSafe>=2.1.1"])
        .package("jinja2", "3.0.3", &["markupsafe>=2.0"])
        .package("jinja2", "3.1.2", &["markupsafe>=2.0"])
        .package("click", "7.1.2", &[])
        .package("click", "8.1.3", &[])
        .package("click", "8.1.7", &[])
        .package("markupsafe", "2.0.1", &[])
        .package("markupsafe", "2.1.3", &[])
}

/// A temporary home directory holding a package index.
pub struct TestEnv {
    pub temp: TempDir,
    pub index: PathBuf,
}

impl TestEnv {
    pub fn new(fixture: &IndexFixture) -> Self {
        pwi_cli::test_utils::init_test_logging(None);
        let temp = TempDir::new().unwrap();
        let index = fixture.write_to(temp.path());
        Self {
            temp,
            index,
        }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write `content` to a file in the temporary directory.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// `pwi` isolated from the user's configuration and environment.
    pub fn pwi(&self) -> Command {
        let mut cmd = Command::cargo_bin("pwi").unwrap();
        cmd.current_dir(self.temp.path())
            .env("HOME", self.temp.path())
            .env("LOCALAPPDATA", self.temp.path())
            .env("NO_COLOR", "1")
            .env_remove("PWI_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--no-progress");
        cmd
    }

    /// `pwi <command> --index <index>`
    pub fn pwi_with_index(&self, command: &str) -> Command {
        let mut cmd = self.pwi();
        cmd.arg(command).arg("--index").arg(&self.index);
        cmd
    }
}
