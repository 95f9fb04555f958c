//! Description units - one loaded project-description document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::scope::Scope;
use crate::core::target::TargetDefinition;

/// A loaded description unit with its targets.
///
/// Included units are merged into the unit that includes them, so `includes`
/// is informational: it records every unit pulled in, in include order.
#[derive(Debug, Clone)]
pub struct DescriptionUnit {
    path: PathBuf,
    targets: Vec<TargetDefinition>,
    includes: Vec<PathBuf>,
    scope: Arc<Scope>,
}

impl DescriptionUnit {
    /// Create a unit.
    pub fn new(
        path: impl Into<PathBuf>,
        targets: Vec<TargetDefinition>,
        includes: Vec<PathBuf>,
        scope: Arc<Scope>,
    ) -> Self {
        DescriptionUnit {
            path: path.into(),
            targets,
            includes,
            scope,
        }
    }

    /// Normalized path of the unit.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Targets in declaration order.
    pub fn targets(&self) -> &[TargetDefinition] {
        &self.targets
    }

    /// Get a target by name.
    pub fn target(&self, name: &str) -> Option<&TargetDefinition> {
        self.targets.iter().find(|t| t.name() == name)
    }

    /// Units merged in through includes.
    pub fn includes(&self) -> &[PathBuf] {
        &self.includes
    }

    /// Variables visible at unit level.
    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    /// Give up ownership of the targets (used when linking).
    pub fn into_targets(self) -> Vec<TargetDefinition> {
        self.targets
    }
}
