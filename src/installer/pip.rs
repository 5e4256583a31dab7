//! pip-backed installation and rollback.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::{DateTime, Utc};
use tokio::process::Command;

use super::{InstallerExecutor, RollbackManager};
use crate::core::PwiError;
use crate::requirement::PackageName;
use crate::resolver::PlannedPackage;

/// Path of the pip executable inside a virtual environment.
#[must_use]
pub fn pip_executable(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("pip.exe")
    } else {
        venv.join("bin").join("pip")
    }
}

/// Find the pip to use: an explicit path wins, then the virtual environment,
/// then `pip` on `PATH`.
///
/// # Errors
///
/// [`PwiError::ConfigError`] when the virtual environment has no pip or no
/// pip is on `PATH`.
pub fn locate_pip(explicit: Option<&Path>, venv: Option<&Path>) -> Result<PathBuf, PwiError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(venv) = venv {
        let pip = pip_executable(venv);
        if pip.exists() {
            return Ok(pip);
        }
        return Err(PwiError::ConfigError {
            message: format!("no pip found in virtual environment {} (expected {})", venv.display(), pip.display()),
        });
    }
    which::which("pip").map_err(|e| PwiError::ConfigError {
        message: format!("pip not found on PATH: {e}"),
    })
}

/// Run pip with `args` and return its standard output.
async fn run_pip(pip: &Path, args: &[String]) -> Result<String, PwiError> {
    tracing::debug!(target: "pip", "Executing command: {} {}", pip.display(), args.join(" "));
    let output = Command::new(pip)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| PwiError::Other {
            message: format!("Failed to execute {} {}: {e}", pip.display(), args.join(" ")),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(target: "pip", "Command failed with exit code: {:?}", output.status.code());
        return Err(PwiError::Other {
            message: format!("pip {} failed: {}", args.first().map_or("", String::as_str), stderr.trim()),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Installs plan entries with `pip install --no-deps`.
#[derive(Debug, Clone)]
pub struct PipInstaller {
    pip: PathBuf,
}

impl PipInstaller {
    /// Use the given pip executable
    pub const fn new(pip: PathBuf) -> Self {
        Self {
            pip,
        }
    }

    /// Arguments installing exactly `package`
    #[must_use]
    pub fn install_args(package: &PlannedPackage) -> Vec<String> {
        vec!["install".to_string(), "--no-deps".to_string(), package.pin()]
    }
}

impl InstallerExecutor for PipInstaller {
    async fn install(&self, package: &PlannedPackage) -> Result<(), PwiError> {
        run_pip(&self.pip, &Self::install_args(package)).await.map(|_| ()).map_err(|e| PwiError::InstallFailed {
            package: package.pin(),
            reason: e.to_string(),
        })
    }
}

/// State captured by [`FreezeRollback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeSnapshot {
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Normalized name → `pip freeze` line
    pub pins: BTreeMap<PackageName, String>,
}

/// Rollback based on `pip freeze`.
///
/// Restoring uninstalls every package added since the snapshot, then
/// reinstalls each frozen pin that changed or disappeared.
#[derive(Debug, Clone)]
pub struct FreezeRollback {
    pip: PathBuf,
}

impl FreezeRollback {
    /// Use the given pip executable
    pub const fn new(pip: PathBuf) -> Self {
        Self {
            pip,
        }
    }

    async fn freeze(&self) -> Result<BTreeMap<PackageName, String>, PwiError> {
        Ok(parse_freeze(&run_pip(&self.pip, &["freeze".to_string()]).await?))
    }
}

impl RollbackManager for FreezeRollback {
    type Handle = FreezeSnapshot;

    async fn snapshot(&self) -> Result<FreezeSnapshot, PwiError> {
        let pins = self.freeze().await?;
        tracing::debug!("snapshot of {} installed package(s)", pins.len());
        Ok(FreezeSnapshot {
            taken_at: Utc::now(),
            pins,
        })
    }

    async fn restore(&self, handle: FreezeSnapshot) -> Result<(), PwiError> {
        let current = self.freeze().await?;

        let added = added_packages(&handle.pins, &current);
        if !added.is_empty() {
            tracing::info!("removing {} package(s) installed since {}", added.len(), handle.taken_at.to_rfc3339());
            let mut args = vec!["uninstall".to_string(), "-y".to_string()];
            args.extend(added.iter().map(ToString::to_string));
            run_pip(&self.pip, &args).await?;
        }

        let changed = changed_pins(&handle.pins, &current);
        if !changed.is_empty() {
            tracing::info!("reinstalling {} previously installed package(s)", changed.len());
            let mut args = vec!["install".to_string(), "--no-deps".to_string()];
            args.extend(changed);
            run_pip(&self.pip, &args).await?;
        }
        Ok(())
    }
}

/// Parse `pip freeze` output into normalized name → line.
///
/// Comments, blank lines and editable installs are skipped.
#[must_use]
pub fn parse_freeze(output: &str) -> BTreeMap<PackageName, String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .filter_map(|line| {
            let end = line.find(['=', ' ', '@', '<', '>', '~', '!']).unwrap_or(line.len());
            PackageName::parse(line[..end].trim()).ok().map(|name| (name, line.to_string()))
        })
        .collect()
}

/// Packages present in `current` but not in `before`.
#[must_use]
pub fn added_packages(before: &BTreeMap<PackageName, String>, current: &BTreeMap<PackageName, String>) -> Vec<PackageName> {
    current.keys().filter(|name| !before.contains_key(*name)).cloned().collect()
}

/// Lines of `before` that are missing from or different in `current`.
#[must_use]
pub fn changed_pins(before: &BTreeMap<PackageName, String>, current: &BTreeMap<PackageName, String>) -> Vec<String> {
    before
        .iter()
        .filter(|(name, line)| current.get(*name) != Some(*line))
        .map(|(_, line)| line.clone())
        .collect()
}
