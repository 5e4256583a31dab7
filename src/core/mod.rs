//! Core types shared by every layer of the resolver.
//!
//! # Error Management
//!
//! - [`PwiError`] - every failure mode of parsing, resolution and installation
//! - [`ErrorContext`] - an error plus suggestion and details for the terminal
//! - [`user_friendly_error`] - turn an [`anyhow::Error`] into an [`ErrorContext`]
//!
//! # Cancellation
//!
//! [`CancellationSignal`] is the cooperative stop flag observed by the graph
//! builder, the resolver and the installer. It is cheap to clone; every clone
//! observes the same flag.
//!
//! # Examples
//!
//! ```rust
//! use pwi_cli::core::{CancellationSignal, PwiError};
//!
//! let signal = CancellationSignal::new();
//! assert!(signal.check().is_ok());
//!
//! signal.cancel();
//! assert!(matches!(signal.check(), Err(PwiError::OperationCancelled)));
//! ```

pub mod cancel;
pub mod error;

pub use cancel::CancellationSignal;
pub use error::{ErrorContext, PwiError, user_friendly_error};
