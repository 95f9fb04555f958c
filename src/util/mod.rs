//! Shared utilities

pub mod config;
pub mod hash;
pub mod paths;

pub use config::{load_project_config, GantryConfig};
