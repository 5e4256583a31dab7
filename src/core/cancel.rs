//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::PwiError;

/// Shared stop flag.
///
/// Long-running operations call [`CancellationSignal::check`] at their
/// checkpoints and bail out with [`PwiError::OperationCancelled`] once the
/// flag is raised. Raising it is idempotent and cannot be undone.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSignal {
    /// A fresh, un-raised signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag for every clone of this signal.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checkpoint: `Err(OperationCancelled)` once the flag is raised.
    pub fn check(&self) -> Result<(), PwiError> {
        if self.is_cancelled() {
            tracing::debug!("cancellation observed");
            Err(PwiError::OperationCancelled)
        } else {
            Ok(())
        }
    }

    /// Raise the flag when the process receives Ctrl-C.
    ///
    /// Must be called from within a tokio runtime.
    pub fn cancel_on_ctrl_c(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping at the next checkpoint");
                signal.cancel();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_flag() {
        let signal = CancellationSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_cancelled());

        signal.cancel();
        assert!(observer.is_cancelled());
        assert!(matches!(observer.check(), Err(PwiError::OperationCancelled)));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let signal = CancellationSignal::new();
        signal.cancel();
        signal.cancel();
        assert!(signal.is_cancelled());
    }
}
