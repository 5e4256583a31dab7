//! Test utilities for the resolver.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration test suite.
//!
//! - [`IndexFixture`] - builds an [`IndexProvider`](crate::provider::IndexProvider)
//!   in code or writes the equivalent TOML index file
//! - [`CountingProvider`] - wraps a provider and counts the calls it receives
//! - [`init_test_logging`] - tracing output inside tests
//!
//! # Example
//!
//! ```rust,no_run
//! use pwi_cli::test_utils::IndexFixture;
//!
//! let provider = IndexFixture::new()
//!     .package("flask", "2.0.3", &["werkzeug>=2.0"])
//!     .package("werkzeug", "2.0.3", &[])
//!     .build();
//! ```

pub mod fixtures;

pub use fixtures::{CountingProvider, IndexFixture};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; does nothing when neither
/// is set. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=pwi_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
