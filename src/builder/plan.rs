//! Build plan - the engine's output.
//!
//! A BuildPlan holds one [`ResolvedTarget`] per (target, configuration) in
//! build order, then configuration order. Emitters walk it front to back;
//! nothing in it refers back to the graph or to unexpanded text.

use serde::Serialize;

use crate::builder::configuration::Configuration;
use crate::core::{EdgeKind, Settings, TargetId, TargetKind};
use crate::util::hash::Fingerprint;

/// A direct dependency of a resolved target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
    /// Dependency target
    pub id: TargetId,
    /// How the edge behaves
    pub kind: EdgeKind,
}

/// One target expanded for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTarget {
    /// Target identifier
    pub id: TargetId,

    /// Artifact kind
    pub kind: TargetKind,

    /// Configuration instance
    pub configuration: Configuration,

    /// Source files
    pub sources: Vec<String>,

    /// Fully merged settings
    pub settings: Settings,

    /// Direct dependencies, in declaration order
    pub dependencies: Vec<ResolvedDependency>,

    /// Libraries to link, dependents before dependencies
    pub link_dependencies: Vec<TargetId>,
}

impl ResolvedTarget {
    /// Target name.
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Configuration key (`Name` or `Name|arch`).
    pub fn configuration_key(&self) -> String {
        self.configuration.key()
    }
}

/// A complete build plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildPlan {
    /// Configuration instances, name-major
    pub configurations: Vec<Configuration>,

    /// Target IDs, every dependency before its dependents
    pub build_order: Vec<TargetId>,

    /// Resolved targets in build order, then configuration order
    pub targets: Vec<ResolvedTarget>,
}

impl BuildPlan {
    /// Find the instance of `id` for a configuration key.
    pub fn target(&self, id: &TargetId, configuration: &str) -> Option<&ResolvedTarget> {
        self.targets
            .iter()
            .find(|t| &t.id == id && t.configuration.key() == configuration)
    }

    /// Find an instance by target name (first unit wins) and configuration key.
    pub fn target_named(&self, name: &str, configuration: &str) -> Option<&ResolvedTarget> {
        self.targets
            .iter()
            .find(|t| t.name() == name && t.configuration.key() == configuration)
    }

    /// Every instance of one configuration, in build order.
    pub fn for_configuration<'a>(
        &'a self,
        configuration: &'a str,
    ) -> impl Iterator<Item = &'a ResolvedTarget> + 'a {
        self.targets
            .iter()
            .filter(move |t| t.configuration.key() == configuration)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// SHA256 over the whole plan.
    ///
    /// Equal inputs give equal fingerprints, so emitters can skip rewriting
    /// unchanged output.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();

        for configuration in &self.configurations {
            fp.update_str(configuration.name())
                .update_opt(configuration.arch());
        }
        for id in &self.build_order {
            fp.update_str(&id.to_string());
        }

        for target in &self.targets {
            fp.update_str(&target.id.to_string())
                .update_str(target.kind.as_str())
                .update_str(&target.configuration.key());
            fp.update_strs(target.sources.iter().map(String::as_str));
            for (key, value) in target.settings.iter() {
                fp.update_str(key).update_value(value);
            }
            for dep in &target.dependencies {
                fp.update_str(&dep.id.to_string())
                    .update_str(&format!("{:?}", dep.kind));
            }
            for link in &target.link_dependencies {
                fp.update_str(&link.to_string());
            }
        }

        fp.finish()
    }
}
