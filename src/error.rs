//! Engine error taxonomy.
//!
//! Every failure is fatal to the current generation request and is reported
//! as a single [`Error`] value. Each variant carries the context a caller
//! needs to print an actionable diagnostic (unit path, include chain, cycle
//! path, target identifier); formatting beyond `Display` is left to callers,
//! which can render the `miette::Diagnostic` impl however they like.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::core::TargetId;

/// Result alias for engine operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Terminal error of a generation request.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// A `$(NAME)` reference or condition identifier named an unknown variable.
    #[error("undefined variable `{name}` in `{field}` of {}", .unit.display())]
    #[diagnostic(
        code(gantry::unresolved_variable),
        help("define it in a `variables` block, pass it as a binding, or write `$(NAME:-default)`")
    )]
    UnresolvedVariable {
        name: String,
        unit: PathBuf,
        field: String,
    },

    /// A unit could not be read or is structurally invalid.
    #[error("failed to load {}: {kind}{}", .unit.display(), include_note(.include_chain))]
    #[diagnostic(code(gantry::load))]
    Load {
        unit: PathBuf,
        include_chain: Vec<PathBuf>,
        #[source]
        kind: LoadErrorKind,
    },

    /// An include chain revisited a unit already being loaded.
    #[error("circular include: {}", display_paths(.cycle))]
    #[diagnostic(
        code(gantry::circular_include),
        help("remove one of the includes in the chain")
    )]
    CircularInclude { cycle: Vec<PathBuf> },

    /// A dependency reference named no loaded target.
    #[error("in target `{target}`: dependency `{reference}` not found")]
    #[diagnostic(
        code(gantry::unresolved_dependency),
        help("qualify the reference as `path/to/unit:name` or load the unit that defines it")
    )]
    UnresolvedDependency { target: TargetId, reference: String },

    /// The dependency graph contains a cycle.
    #[error("cycle detected in dependency graph: {}", display_ids(.cycle))]
    #[diagnostic(
        code(gantry::cyclic_dependency),
        help("break the cycle by removing or restructuring dependencies")
    )]
    CyclicDependency { cycle: Vec<TargetId> },

    /// A configuration override names a configuration that was not requested.
    #[error("in target `{target}`: unknown configuration `{configuration}` (declared: {})", .declared.join(", "))]
    #[diagnostic(code(gantry::unknown_configuration))]
    UnknownConfiguration {
        target: TargetId,
        configuration: String,
        declared: Vec<String>,
    },

    /// A resolved target still holds an unexpanded reference.
    #[error("internal error: `{field}` of `{target}` ({configuration}) still contains `{value}`")]
    #[diagnostic(code(gantry::internal_resolution))]
    InternalResolution {
        target: TargetId,
        configuration: String,
        field: String,
        value: String,
    },
}

/// Why a unit failed to load.
#[derive(Debug, Error)]
pub enum LoadErrorKind {
    /// The unit source could not be read.
    #[error("cannot read unit")]
    Read(#[source] std::io::Error),

    /// The unit is not valid for the front-end parser or violates the schema.
    #[error("malformed unit: {0}")]
    Malformed(String),

    /// An include names a unit that does not exist.
    #[error("include `{}` not found", .0.display())]
    MissingInclude(PathBuf),

    /// Two targets in one unit share a name.
    #[error("duplicate target `{0}`")]
    DuplicateTarget(String),

    /// A condition expression failed to parse.
    #[error("invalid condition `{expr}`: {message}")]
    InvalidCondition { expr: String, message: String },

    /// A `$(...)` reference failed to parse.
    #[error("invalid expression `{expr}`: {message}")]
    InvalidExpression { expr: String, message: String },
}

impl Error {
    /// Build a load error.
    pub fn load(unit: &Path, include_chain: &[PathBuf], kind: LoadErrorKind) -> Self {
        Error::Load {
            unit: unit.to_path_buf(),
            include_chain: include_chain.to_vec(),
            kind,
        }
    }

    /// Short, stable name of the error kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::UnresolvedVariable { .. } => "UnresolvedVariableError",
            Error::Load { .. } => "LoadError",
            Error::CircularInclude { .. } => "CircularIncludeError",
            Error::UnresolvedDependency { .. } => "UnresolvedDependencyError",
            Error::CyclicDependency { .. } => "CyclicDependencyError",
            Error::UnknownConfiguration { .. } => "UnknownConfigurationError",
            Error::InternalResolution { .. } => "InternalResolutionError",
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn display_ids(ids: &[TargetId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn include_note(chain: &[PathBuf]) -> String {
    if chain.is_empty() {
        String::new()
    } else {
        format!(" (included from {})", display_paths(chain))
    }
}
