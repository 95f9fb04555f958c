//! Filesystem source - units read from disk.

use std::io;
use std::path::{Path, PathBuf};

use crate::sources::UnitSource;
use crate::util::paths::normalize;

/// Reads units from the filesystem.
///
/// Relative unit paths are resolved against `root`. Absolute paths under
/// `root` are keyed relative to it so target identifiers don't depend on
/// where the project lives.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsSource { root: root.into() }
    }

    /// Create a source rooted at the current directory.
    pub fn cwd() -> io::Result<Self> {
        Ok(FsSource::new(std::env::current_dir()?))
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl UnitSource for FsSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(self.full_path(path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.full_path(path).is_file()
    }

    fn unit_key(&self, path: &Path) -> PathBuf {
        let path = normalize(path);
        if path.is_absolute() {
            let root = normalize(&self.root);
            if path.starts_with(&root) {
                if let Some(relative) = pathdiff::diff_paths(&path, &root) {
                    return relative;
                }
            }
        }
        path
    }
}
