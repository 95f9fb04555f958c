//! Unit source trait - where description text comes from.

use std::io;
use std::path::{Path, PathBuf};

use crate::util::paths::normalize;

/// A place description units are read from.
///
/// Sources are shared between loader threads, so implementations must be
/// `Send + Sync` and reads must not require exclusive access.
pub trait UnitSource: Send + Sync {
    /// Get the source name for display.
    fn name(&self) -> &str;

    /// Read the text of a unit.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Check whether a unit exists.
    fn exists(&self, path: &Path) -> bool;

    /// Canonical identity of a unit path.
    ///
    /// Two spellings of the same unit must map to the same key, since the
    /// key becomes part of every target identifier in the unit.
    fn unit_key(&self, path: &Path) -> PathBuf {
        normalize(path)
    }
}
