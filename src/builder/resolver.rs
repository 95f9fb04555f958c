//! Per-configuration resolution.
//!
//! Turns a linked [`BuildGraph`] into a [`BuildPlan`]: every target is
//! instantiated once per configuration by layering the matching override
//! blocks over its flattened settings.

use tracing::{debug, trace};

use crate::builder::configuration::{Configuration, ConfigurationSet};
use crate::builder::plan::{BuildPlan, ResolvedDependency, ResolvedTarget};
use crate::core::{Settings, TargetDefinition};
use crate::error::{Error, Result};
use crate::expr::{contains_reference, unescape};
use crate::graph::BuildGraph;

/// Resolves a graph against a set of configurations.
pub struct ConfigurationResolver<'a> {
    graph: &'a BuildGraph,
    configurations: &'a ConfigurationSet,
}

impl<'a> ConfigurationResolver<'a> {
    /// Create a resolver.
    pub fn new(graph: &'a BuildGraph, configurations: &'a ConfigurationSet) -> Self {
        ConfigurationResolver {
            graph,
            configurations,
        }
    }

    /// Produce the build plan.
    ///
    /// Override keys are validated up front, so an unknown configuration
    /// fails the request before any target is resolved.
    pub fn resolve(&self) -> Result<BuildPlan> {
        for target in self.graph.targets() {
            self.validate_overrides(target)?;
        }

        let instances = self.configurations.instances();
        let mut targets = Vec::with_capacity(self.graph.len() * instances.len());

        for target in self.graph.ordered_targets() {
            for configuration in &instances {
                targets.push(self.resolve_target(target, configuration)?);
            }
        }

        debug!(
            targets = self.graph.len(),
            configurations = instances.len(),
            "resolved build plan"
        );

        Ok(BuildPlan {
            configurations: instances,
            build_order: self.graph.build_order().into_iter().cloned().collect(),
            targets,
        })
    }

    fn validate_overrides(&self, target: &TargetDefinition) -> Result<()> {
        for key in target.configurations.keys() {
            if !self.configurations.declares(key) {
                return Err(Error::UnknownConfiguration {
                    target: target.id.clone(),
                    configuration: key.clone(),
                    declared: self.configurations.declared_keys(),
                });
            }
        }
        Ok(())
    }

    fn resolve_target(
        &self,
        target: &TargetDefinition,
        configuration: &Configuration,
    ) -> Result<ResolvedTarget> {
        let mut settings = self
            .graph
            .effective_settings(&target.id)
            .cloned()
            .unwrap_or_default();

        // `Name` first, then the more specific `Name|arch`. Block keys may
        // carry merge suffixes, which `merge` applies here.
        if let Some(block) = target.configurations.get(configuration.name()) {
            settings.merge(block);
        }
        if configuration.arch().is_some() {
            if let Some(block) = target.configurations.get(&configuration.key()) {
                settings.merge(block);
            }
        }
        trace!(id = %target.id, configuration = %configuration, "merged overrides");

        let dependencies = self
            .graph
            .dependencies(&target.id)
            .into_iter()
            .map(|(id, kind)| ResolvedDependency {
                id: id.clone(),
                kind,
            })
            .collect();
        let link_dependencies = self
            .graph
            .link_dependencies(&target.id)
            .into_iter()
            .cloned()
            .collect();

        let (sources, settings) = finalize(target, configuration, &target.sources, &settings)?;

        Ok(ResolvedTarget {
            id: target.id.clone(),
            kind: target.kind,
            configuration: configuration.clone(),
            sources,
            settings,
            dependencies,
            link_dependencies,
        })
    }
}

/// Check nothing unexpanded survived, then turn `$$` escapes into `$`.
fn finalize(
    target: &TargetDefinition,
    configuration: &Configuration,
    sources: &[String],
    settings: &Settings,
) -> Result<(Vec<String>, Settings)> {
    let leftover = sources
        .iter()
        .map(|s| ("sources", s.as_str()))
        .chain(settings.strings_with_keys())
        .find(|(_, s)| contains_reference(s));

    if let Some((field, value)) = leftover {
        return Err(Error::InternalResolution {
            target: target.id.clone(),
            configuration: configuration.key(),
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    let sources = sources.iter().map(|s| unescape(s)).collect();
    Ok((sources, settings.map_strings(unescape)))
}
