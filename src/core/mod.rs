//! Core data structures for Gantry.
//!
//! This module contains the foundational types used throughout the engine:
//! - Tagged values and layered variable scopes
//! - Target identifiers and definitions
//! - Build settings
//! - Description units

pub mod scope;
pub mod settings;
pub mod target;
pub mod target_id;
pub mod unit;
pub mod value;

pub use scope::{Lookup, Scope, ScopeBuilder};
pub use settings::{split_key, MergePolicy, Settings};
pub use target::{DependencyRef, EdgeKind, TargetDefinition, TargetKind};
pub use target_id::{TargetId, TargetRef};
pub use unit::DescriptionUnit;
pub use value::Value;
