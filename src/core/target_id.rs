//! Target identification - WHICH target (owning unit + name).
//!
//! Target names are only unique within their description unit, so a
//! TargetId pairs the normalized unit path with the name. The display form
//! `path/to/unit.toml:name` is also the fully-qualified reference syntax.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

/// Separator between the unit path and the target name.
pub const QUALIFIER: char = ':';

/// A globally unique target identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId {
    unit: PathBuf,
    name: String,
}

impl TargetId {
    /// Create a new target ID.
    pub fn new(unit: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        TargetId {
            unit: unit.into(),
            name: name.into(),
        }
    }

    /// Path of the unit that owns the target.
    pub fn unit(&self) -> &Path {
        &self.unit
    }

    /// Target name within its unit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully-qualified reference string.
    pub fn qualified(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Forward slashes keep the display form identical across hosts.
        let unit = self.unit.to_string_lossy().replace('\\', "/");
        write!(f, "{}{}{}", unit, QUALIFIER, self.name)
    }
}

impl Serialize for TargetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A parsed dependency reference, before resolution against loaded units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef<'a> {
    /// `name` - a target in the referencing unit
    Local(&'a str),
    /// `path:name` - a target in another unit, path relative to the referrer
    Qualified { unit: &'a str, name: &'a str },
}

impl<'a> TargetRef<'a> {
    /// Parse a reference string.
    ///
    /// The last `:` separates unit and name so Windows drive prefixes in the
    /// unit part survive.
    pub fn parse(reference: &'a str) -> Self {
        match reference.rsplit_once(QUALIFIER) {
            Some((unit, name)) if !unit.is_empty() && !name.is_empty() => {
                TargetRef::Qualified { unit, name }
            }
            _ => TargetRef::Local(reference),
        }
    }

    /// The referenced target name.
    pub fn name(&self) -> &'a str {
        match self {
            TargetRef::Local(name) => name,
            TargetRef::Qualified { name, .. } => name,
        }
    }
}
