//! Target definitions - what gets built.
//!
//! A target is a named build output (executable, static library, shared
//! library, or a logical group) with its sources, dependency references and
//! settings, exactly as loaded from its description unit.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::settings::Settings;
use crate::core::target_id::TargetId;

/// The kind of target being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Executable binary
    #[serde(alias = "exe", alias = "bin")]
    Executable,

    /// Static library (.a / .lib)
    #[serde(alias = "lib", alias = "static", alias = "staticlib")]
    StaticLibrary,

    /// Shared/dynamic library (.so / .dylib / .dll)
    #[serde(alias = "dylib", alias = "shared", alias = "sharedlib")]
    SharedLibrary,

    /// Logical group with no output of its own
    #[default]
    #[serde(alias = "group")]
    None,
}

impl TargetKind {
    /// Name as written in description units.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Executable => "executable",
            TargetKind::StaticLibrary => "static_library",
            TargetKind::SharedLibrary => "shared_library",
            TargetKind::None => "none",
        }
    }

    /// Check if this is a library (static or shared).
    pub fn is_library(&self) -> bool {
        matches!(self, TargetKind::StaticLibrary | TargetKind::SharedLibrary)
    }

    /// Check if this target performs a final link of its dependencies.
    pub fn is_final_link(&self) -> bool {
        matches!(self, TargetKind::Executable | TargetKind::SharedLibrary)
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "executable" | "exe" | "bin" => Ok(TargetKind::Executable),
            "static_library" | "lib" | "static" | "staticlib" => Ok(TargetKind::StaticLibrary),
            "shared_library" | "dylib" | "shared" | "sharedlib" => Ok(TargetKind::SharedLibrary),
            "none" | "group" => Ok(TargetKind::None),
            other => Err(format!(
                "unknown target type `{}` (expected executable, static_library, shared_library or none)",
                other
            )),
        }
    }
}

/// How a dependency edge behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Link against the dependency and inherit its exported settings
    #[default]
    Propagate,

    /// Link against the dependency, settings stay private
    #[serde(alias = "link")]
    LinkOnly,

    /// Only build the dependency first
    Order,
}

impl EdgeKind {
    /// Check if exported settings flow along this edge.
    pub fn propagates(&self) -> bool {
        matches!(self, EdgeKind::Propagate)
    }

    /// Check if the dependent links the dependency's output.
    pub fn links(&self) -> bool {
        matches!(self, EdgeKind::Propagate | EdgeKind::LinkOnly)
    }
}

impl FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "propagate" => Ok(EdgeKind::Propagate),
            "link" | "link_only" | "link-only" => Ok(EdgeKind::LinkOnly),
            "order" => Ok(EdgeKind::Order),
            other => Err(format!(
                "unknown dependency kind `{}` (expected propagate, link or order)",
                other
            )),
        }
    }
}

/// A dependency reference as declared, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    /// `name` or `path/to/unit:name`
    pub reference: String,
    /// Edge kind
    pub kind: EdgeKind,
}

impl DependencyRef {
    /// Create a propagating reference.
    pub fn new(reference: impl Into<String>) -> Self {
        DependencyRef {
            reference: reference.into(),
            kind: EdgeKind::Propagate,
        }
    }

    /// Set the edge kind.
    pub fn with_kind(mut self, kind: EdgeKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A target as loaded from its description unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDefinition {
    /// Owning unit + name
    pub id: TargetId,

    /// What kind of artifact to produce
    pub kind: TargetKind,

    /// Source files, in declaration order
    pub sources: Vec<String>,

    /// Dependency references, in declaration order
    pub dependencies: Vec<DependencyRef>,

    /// Settings private to this target
    pub settings: Settings,

    /// Settings applied to this target and propagated to all dependents
    pub export: Settings,

    /// Settings propagated to direct dependents only
    pub direct_export: Settings,

    /// Per-configuration overrides, keyed `Name` or `Name|arch`.
    /// Setting keys keep their merge suffixes (`defines=`).
    pub configurations: IndexMap<String, Settings>,
}

impl TargetDefinition {
    /// Create a new target with the given ID and kind.
    pub fn new(id: TargetId, kind: TargetKind) -> Self {
        TargetDefinition {
            id,
            kind,
            sources: Vec::new(),
            dependencies: Vec::new(),
            settings: Settings::new(),
            export: Settings::new(),
            direct_export: Settings::new(),
            configurations: IndexMap::new(),
        }
    }

    /// Target name.
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Add source files.
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sources = sources.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Add a dependency reference.
    pub fn with_dependency(mut self, dep: DependencyRef) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// Replace private settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace exported settings.
    pub fn with_export(mut self, export: Settings) -> Self {
        self.export = export;
        self
    }

    /// Add a configuration override block.
    pub fn with_configuration(mut self, key: impl Into<String>, settings: Settings) -> Self {
        self.configurations.insert(key.into(), settings);
        self
    }
}
