//! Gantry - a meta-build dependency graph and target evaluation engine
//!
//! This crate loads declarative build description units, expands their
//! variables and conditions, links targets into a dependency graph and
//! resolves every target once per build configuration. The resulting
//! [`BuildPlan`] is what emitters (makefile, ninja, IDE writers) consume.

pub mod builder;
pub mod core;
pub mod error;
pub mod expr;
pub mod graph;
pub mod loader;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and fixtures for Gantry unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildPlan, Configuration, ConfigurationSet, ResolvedTarget};
pub use core::{Scope, TargetDefinition, TargetId, TargetKind, Value};
pub use error::{Error, LoadErrorKind, Result};
pub use graph::BuildGraph;
pub use ops::{generate, GenerateOptions};
pub use sources::{FsSource, MemorySource, UnitSource};
pub use util::config::GantryConfig;
