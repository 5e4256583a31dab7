//! Integration test suite for pwi
//!
//! End-to-end tests that run the `pwi` binary against package indexes
//! written to temporary directories.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolve**: plans, pinned output, dry runs and resolution failures
//! - **queries**: `tree`, `why` and `cycles`
//! - **install**: pip execution and rollback, against a stand-in pip script
//! - **config**: configuration file discovery and flag precedence

mod common;

mod config;
mod install;
mod queries;
mod resolve;
