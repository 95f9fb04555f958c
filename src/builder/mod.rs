//! Configuration resolution and build plans.
//!
//! This module instantiates the linked target graph once per requested
//! configuration and produces the [`BuildPlan`] handed to emitters.

pub mod configuration;
pub mod plan;
pub mod resolver;

pub use configuration::{Configuration, ConfigurationSet};
pub use plan::{BuildPlan, ResolvedDependency, ResolvedTarget};
pub use resolver::ConfigurationResolver;
