//! High-level operations.
//!
//! This module contains the generation pipeline entry point.

pub mod generate;

pub use generate::{generate, GenerateOptions};
