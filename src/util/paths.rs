//! Lexical path handling for unit paths.
//!
//! Unit paths are identities (they end up in every `TargetId`), so they are
//! normalized without touching the filesystem: `.` components are dropped
//! and `..` pops the previous component where one exists.

use std::path::{Component, Path, PathBuf};

/// Normalize a path lexically.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Resolve `reference` relative to the directory containing `unit`.
pub fn relative_to_unit(unit: &Path, reference: &Path) -> PathBuf {
    if reference.is_absolute() {
        return normalize(reference);
    }
    let dir = unit.parent().unwrap_or_else(|| Path::new(""));
    normalize(&dir.join(reference))
}
