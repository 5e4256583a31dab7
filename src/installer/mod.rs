//! Executing an installation plan.
//!
//! The resolver produces a complete plan or none at all; partial failures
//! during installation are this module's concern. Execution is guarded by a
//! [`RollbackManager`]:
//!
//! 1. **Snapshot**: capture the environment before anything changes
//! 2. **Install**: hand each plan entry to the [`InstallerExecutor`], in plan
//!    order, checking for cancellation between entries
//! 3. **Restore**: on the first failure (or cancellation) restore the
//!    snapshot and report what went wrong
//!
//! [`pip`] provides implementations of both traits backed by a pip
//! executable.

pub mod pip;

use std::future::Future;

use crate::core::{CancellationSignal, PwiError};
use crate::resolver::{PlannedPackage, ResolutionPlan};

pub use pip::{FreezeRollback, FreezeSnapshot, PipInstaller, locate_pip, pip_executable};

/// Installs one package.
pub trait InstallerExecutor: Send + Sync {
    /// Install `package` at its planned version, without its dependencies.
    fn install(&self, package: &PlannedPackage) -> impl Future<Output = Result<(), PwiError>> + Send;
}

/// Captures and restores environment state around an installation.
pub trait RollbackManager: Send + Sync {
    /// Opaque snapshot
    type Handle: Send;

    /// Capture the current state.
    fn snapshot(&self) -> impl Future<Output = Result<Self::Handle, PwiError>> + Send;

    /// Return the environment to the captured state.
    fn restore(&self, handle: Self::Handle) -> impl Future<Output = Result<(), PwiError>> + Send;
}

/// Install every package of `plan` in order, restoring the snapshot taken
/// beforehand if any step fails or `cancel` is raised.
///
/// `on_installed` is called after each successful step. Returns the number
/// of packages installed.
///
/// # Errors
///
/// - [`PwiError::InstallFailed`] when a step failed and the environment was
///   restored
/// - [`PwiError::RollbackFailed`] when restoring failed as well; both causes
///   are kept
/// - [`PwiError::OperationCancelled`] when cancelled; the environment was
///   restored
/// - any error of [`RollbackManager::snapshot`], before anything changed
pub async fn execute_plan<E, R, F>(
    plan: &ResolutionPlan,
    executor: &E,
    rollback: &R,
    cancel: &CancellationSignal,
    mut on_installed: F,
) -> Result<usize, PwiError>
where
    E: InstallerExecutor,
    R: RollbackManager,
    F: FnMut(&PlannedPackage),
{
    cancel.check()?;
    let handle = rollback.snapshot().await?;
    tracing::debug!("snapshot taken, installing {} package(s)", plan.len());

    let mut installed = 0;
    for package in &plan.packages {
        let outcome = if cancel.is_cancelled() {
            Err(PwiError::OperationCancelled)
        } else {
            tracing::debug!("installing {}", package.pin());
            executor.install(package).await
        };

        let Err(error) = outcome else {
            installed += 1;
            on_installed(package);
            continue;
        };

        tracing::warn!("restoring environment after: {error}");
        let pin = package.pin();
        return Err(match rollback.restore(handle).await {
            Ok(()) => match error {
                PwiError::OperationCancelled | PwiError::InstallFailed { .. } => error,
                other => PwiError::InstallFailed {
                    package: pin,
                    reason: other.to_string(),
                },
            },
            Err(restore_error) => PwiError::RollbackFailed {
                package: pin,
                install_error: error.to_string(),
                reason: restore_error.to_string(),
            },
        });
    }

    tracing::info!("installed {installed} package(s)");
    Ok(installed)
}
