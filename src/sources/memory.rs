//! In-memory source - unit text held by the caller.

use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::sources::UnitSource;
use crate::util::paths::normalize;

/// A source backed by a map of unit path to text.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    units: IndexMap<PathBuf, String>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        MemorySource::default()
    }

    /// Add or replace a unit.
    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.units.insert(normalize(path.as_ref()), text.into());
    }

    /// Builder-style insert.
    pub fn with_unit(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Unit paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.units.keys().map(PathBuf::as_path)
    }
}

impl UnitSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        self.units.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no unit at {}", path.display()),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.units.contains_key(&normalize(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_normalized() {
        let source = MemorySource::new().with_unit("a/b.toml", "x = 1");
        assert!(source.exists(Path::new("a/./b.toml")));
        assert_eq!(source.read(Path::new("a/c/../b.toml")).unwrap(), "x = 1");
        assert_eq!(
            source.read(Path::new("missing.toml")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
