//! pwi - dependency resolution for Python web deployments
//!
//! Turns a set of requirement strings into an ordered, conflict-free
//! installation plan, or explains why none exists.
//!
//! # Architecture Overview
//!
//! ```text
//! requirement strings
//!   -> requirement::Requirement::parse
//!   -> resolver::DependencyGraphBuilder   (queries a provider::PackageMetadataProvider)
//!   -> version::conflict::ConflictDetector
//!   -> resolver::Resolver                 (bounded backtracking)
//!   -> resolver::InstallationPlanner      (topological order)
//!   -> installer::execute_plan            (snapshot, install, restore on failure)
//! ```
//!
//! The resolver only knows packages through a metadata provider and only
//! produces a plan; executing the plan is left to an
//! [`installer::InstallerExecutor`] guarded by an
//! [`installer::RollbackManager`].
//!
//! # Modules
//!
//! ## Core Functionality
//! - [`requirement`] - requirement parsing and requirements files
//! - [`version`] - versions, constraints and conflict detection
//! - [`resolver`] - graph construction, version selection and planning
//! - [`provider`] - package metadata sources and wrappers
//! - [`installer`] - plan execution with rollback
//!
//! ## Supporting Modules
//! - [`cli`] - the `pwi` command-line interface
//! - [`config`] - user configuration (`~/.pwi/config.toml`)
//! - [`core`] - errors and cancellation
//! - [`constants`] - shared defaults
//! - [`utils`] - terminal progress helpers
//!
//! # Package Index Format
//!
//! The CLI reads package metadata from a TOML file mapping each package to
//! its published versions and their requirements:
//!
//! ```toml
//! [packages.flask]
//! "2.0.3" = ["werkzeug>=2.0", "jinja2>=3.0", "click>=7.1.2"]
//! "3.0.0" = ["werkzeug>=3.0", "jinja2>=3.1.2"]
//!
//! [packages.click]
//! "8.1.7" = []
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! pwi resolve "flask>=2.0" --index index.toml
//! pwi resolve -r requirements.txt --output requirements.lock.txt
//! pwi install -r requirements.txt --venv .venv
//! pwi tree -r requirements.txt
//! pwi why flask markupsafe -r requirements.txt
//! pwi cycles -r requirements.txt
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod installer;
pub mod provider;
pub mod requirement;
pub mod resolver;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
