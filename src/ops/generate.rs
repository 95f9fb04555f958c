//! Implementation of the generation pipeline.
//!
//! load units -> link targets -> resolve configurations -> build plan

use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::{info, info_span};

use crate::builder::{BuildPlan, ConfigurationResolver, ConfigurationSet};
use crate::core::{Scope, Value};
use crate::error::Result;
use crate::expr::escape_literal;
use crate::graph::GraphBuilder;
use crate::loader::{load_units, LoadOptions};
use crate::sources::UnitSource;

/// Options for a generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Top-level units to load
    pub inputs: Vec<PathBuf>,

    /// Root variable bindings, visible to every unit
    pub bindings: IndexMap<String, Value>,

    /// Configurations to resolve
    pub configurations: ConfigurationSet,

    /// Load top-level inputs in parallel
    pub parallel: bool,

    /// Load units named by unit-qualified dependency references
    pub follow_dependencies: bool,
}

impl GenerateOptions {
    /// Options for the given inputs with everything else defaulted.
    pub fn new(inputs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        GenerateOptions {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Add a root binding.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Set the configurations.
    pub fn with_configurations(mut self, configurations: ConfigurationSet) -> Self {
        self.configurations = configurations;
        self
    }
}

/// Run a full generation request.
///
/// Any failure aborts the request; no partial plan is returned.
pub fn generate(source: &dyn UnitSource, opts: &GenerateOptions) -> Result<BuildPlan> {
    // Bindings are literals: a `$` in a binding never starts a reference.
    let root = Scope::from_bindings(
        opts.bindings
            .iter()
            .map(|(name, value)| (name.clone(), value.map_strings(&escape_literal))),
    );

    let units = {
        let _span = info_span!("load", source = source.name()).entered();
        load_units(
            source,
            &opts.inputs,
            root,
            LoadOptions {
                parallel: opts.parallel,
                follow_dependencies: opts.follow_dependencies,
            },
        )?
    };

    let graph = {
        let _span = info_span!("link").entered();
        GraphBuilder::new(units).build()?
    };

    let plan = {
        let _span = info_span!("resolve").entered();
        ConfigurationResolver::new(&graph, &opts.configurations).resolve()?
    };

    info!(
        targets = graph.len(),
        configurations = plan.configurations.len(),
        "generated build plan"
    );

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::DEFINES;
    use crate::core::TargetId;
    use crate::error::Error;
    use crate::test_support::assertions::assert_error_kind;
    use crate::test_support::fixtures;
    use crate::test_support::memory_units;

    #[test]
    fn test_generate_propagates_and_orders() {
        let source = memory_units(&[
            ("base/base.toml", &fixtures::library_unit("base", &["FOO=1"])),
            ("app/app.toml", &fixtures::executable_unit("app", &["../base/base.toml:base"])),
        ]);
        let opts = GenerateOptions::new(["app/app.toml", "base/base.toml"])
            .with_configurations(ConfigurationSet::new(["Debug", "Release"]));
        let plan = generate(&source, &opts).unwrap();

        let order: Vec<String> = plan.build_order.iter().map(|id| id.to_string()).collect();
        assert_eq!(order, vec!["base/base.toml:base", "app/app.toml:app"]);

        let app = plan
            .target(&TargetId::new("app/app.toml", "app"), "Debug")
            .unwrap();
        assert_eq!(app.settings.strings(DEFINES), vec!["FOO=1"]);
        assert_eq!(app.link_dependencies, vec![TargetId::new("base/base.toml", "base")]);
    }

    #[test]
    fn test_follow_dependencies_loads_referenced_units() {
        let source = memory_units(&[
            ("base/base.toml", &fixtures::library_unit("base", &["FOO=1"])),
            ("app/app.toml", &fixtures::executable_unit("app", &["../base/base.toml:base"])),
        ]);
        let mut opts = GenerateOptions::new(["app/app.toml"]);
        opts.follow_dependencies = true;
        let plan = generate(&source, &opts).unwrap();
        assert_eq!(plan.build_order.len(), 2);

        opts.follow_dependencies = false;
        assert_error_kind(generate(&source, &opts), "UnresolvedDependencyError");
    }

    #[test]
    fn test_bindings_are_literal() {
        let source = memory_units(&[(
            "u.toml",
            r#"
            [[targets]]
            name = "app"
            type = "executable"
            defines = ["PREFIX=$(PREFIX)"]
            "#,
        )]);
        let opts = GenerateOptions::new(["u.toml"]).bind("PREFIX", "$(HOME)/opt");
        let plan = generate(&source, &opts).unwrap();
        let app = plan.target_named("app", "Default").unwrap();
        assert_eq!(app.settings.strings(DEFINES), vec!["PREFIX=$(HOME)/opt"]);
    }

    #[test]
    fn test_parallel_load_matches_sequential() {
        let source = memory_units(&[
            ("base/base.toml", &fixtures::library_unit("base", &["FOO=1"])),
            ("app/app.toml", &fixtures::executable_unit("app", &["../base/base.toml:base"])),
        ]);
        let mut opts = GenerateOptions::new(["app/app.toml", "base/base.toml"]);
        let sequential = generate(&source, &opts).unwrap();
        opts.parallel = true;
        let parallel = generate(&source, &opts).unwrap();
        assert_eq!(sequential.fingerprint(), parallel.fingerprint());
    }

    #[test]
    fn test_long_dependency_chain() {
        const DEPTH: usize = 5_000;
        let mut unit = String::new();
        for i in 0..DEPTH {
            unit.push_str(&format!(
                "[[targets]]\nname = \"t{}\"\ntype = \"static_library\"\n",
                i
            ));
            if i + 1 < DEPTH {
                unit.push_str(&format!("dependencies = [\"t{}\"]\n", i + 1));
            }
        }
        let source = memory_units(&[("chain.toml", unit.as_str())]);
        let plan = generate(&source, &GenerateOptions::new(["chain.toml"])).unwrap();

        assert_eq!(plan.build_order.len(), DEPTH);
        assert_eq!(plan.build_order[0].name(), format!("t{}", DEPTH - 1));
        assert_eq!(plan.build_order[DEPTH - 1].name(), "t0");
    }

    #[test]
    fn test_cycle_aborts_request() {
        let source = memory_units(&fixtures::cycle_units());
        let opts = GenerateOptions::new(["a.toml", "b.toml", "c.toml"]);
        match generate(&source, &opts).unwrap_err() {
            Error::CyclicDependency { cycle } => {
                let names: Vec<&str> = cycle.iter().map(|id| id.name()).collect();
                assert_eq!(names, vec!["A", "B", "C", "A"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
