//! Build configurations.
//!
//! A configuration set is the list of configuration names requested by the
//! caller (`Debug`, `Release`, ...) optionally crossed with a list of
//! architectures. Each instance is addressed by its key: `Name`, or
//! `Name|arch` when architectures are in play.

use std::fmt;

use serde::{Serialize, Serializer};

/// Separator between configuration name and architecture in keys.
pub const ARCH_SEPARATOR: char = '|';

/// Name used when the caller requests no configuration.
pub const DEFAULT_CONFIGURATION: &str = "Default";

/// One configuration instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
    name: String,
    arch: Option<String>,
}

impl Configuration {
    /// Create a configuration without an architecture.
    pub fn new(name: impl Into<String>) -> Self {
        Configuration {
            name: name.into(),
            arch: None,
        }
    }

    /// Set the architecture.
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    /// Configuration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Architecture, if any.
    pub fn arch(&self) -> Option<&str> {
        self.arch.as_deref()
    }

    /// `Name` or `Name|arch`.
    pub fn key(&self) -> String {
        match &self.arch {
            Some(arch) => format!("{}{}{}", self.name, ARCH_SEPARATOR, arch),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The configurations to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationSet {
    names: Vec<String>,
    archs: Vec<String>,
}

impl ConfigurationSet {
    /// Create a set from configuration names.
    ///
    /// Duplicate names are dropped. An empty list yields the single
    /// configuration `Default`.
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        if unique.is_empty() {
            unique.push(DEFAULT_CONFIGURATION.to_string());
        }
        ConfigurationSet {
            names: unique,
            archs: Vec::new(),
        }
    }

    /// Cross every configuration with these architectures.
    pub fn with_archs(mut self, archs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.archs.clear();
        for arch in archs {
            let arch = arch.into();
            if !self.archs.contains(&arch) {
                self.archs.push(arch);
            }
        }
        self
    }

    /// Configuration names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Architectures.
    pub fn archs(&self) -> &[String] {
        &self.archs
    }

    /// Every instance, name-major.
    pub fn instances(&self) -> Vec<Configuration> {
        if self.archs.is_empty() {
            return self.names.iter().map(Configuration::new).collect();
        }
        self.names
            .iter()
            .flat_map(|name| {
                self.archs
                    .iter()
                    .map(move |arch| Configuration::new(name).with_arch(arch))
            })
            .collect()
    }

    /// Check whether an override key names a declared configuration.
    ///
    /// `Name` is valid when the name is declared; `Name|arch` additionally
    /// needs the architecture to be declared.
    pub fn declares(&self, key: &str) -> bool {
        match key.split_once(ARCH_SEPARATOR) {
            Some((name, arch)) => {
                self.names.iter().any(|n| n == name) && self.archs.iter().any(|a| a == arch)
            }
            None => self.names.iter().any(|n| n == key),
        }
    }

    /// Every key an override block may use.
    pub fn declared_keys(&self) -> Vec<String> {
        let mut keys = self.names.clone();
        keys.extend(self.instances().iter().filter(|c| c.arch().is_some()).map(Configuration::key));
        keys
    }
}

impl Default for ConfigurationSet {
    fn default() -> Self {
        ConfigurationSet::new(Vec::<String>::new())
    }
}
