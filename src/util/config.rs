//! Configuration file support for Gantry.
//!
//! Gantry supports two configuration file locations:
//! - Global: `~/.gantry/config.toml` - User-wide defaults
//! - Project: `gantry.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::builder::ConfigurationSet;
use crate::core::Value;
use crate::ops::GenerateOptions;

/// Name of the project configuration file.
pub const PROJECT_CONFIG_FILE: &str = "gantry.toml";

/// Gantry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GantryConfig {
    /// Generator settings
    pub generator: GeneratorConfig,

    /// Root variable bindings
    pub variables: IndexMap<String, toml::Value>,
}

/// Generator-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeneratorConfig {
    /// Configuration names to generate (empty = `Default`)
    pub configurations: Vec<String>,

    /// Architectures crossed with every configuration
    pub archs: Vec<String>,

    /// Load top-level units in parallel
    pub parallel: Option<bool>,

    /// Load units named by qualified dependency references
    pub follow_dependencies: Option<bool>,
}

impl GantryConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration, or defaults if the file doesn't exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_if_exists(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no config file at {}", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Lists are replaced, not concatenated; variables merge by name.
    pub fn merge(&mut self, other: GantryConfig) {
        if !other.generator.configurations.is_empty() {
            self.generator.configurations = other.generator.configurations;
        }
        if !other.generator.archs.is_empty() {
            self.generator.archs = other.generator.archs;
        }
        if other.generator.parallel.is_some() {
            self.generator.parallel = other.generator.parallel;
        }
        if other.generator.follow_dependencies.is_some() {
            self.generator.follow_dependencies = other.generator.follow_dependencies;
        }

        self.variables.extend(other.variables);
    }

    /// The requested configurations.
    pub fn configuration_set(&self) -> ConfigurationSet {
        ConfigurationSet::new(self.generator.configurations.iter().cloned())
            .with_archs(self.generator.archs.iter().cloned())
    }

    /// Build generation options for the given inputs.
    pub fn into_options(
        self,
        inputs: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> Result<GenerateOptions> {
        let mut bindings = IndexMap::with_capacity(self.variables.len());
        for (name, raw) in &self.variables {
            let value =
                to_value(raw).with_context(|| format!("invalid value for variable `{}`", name))?;
            bindings.insert(name.clone(), value);
        }

        Ok(GenerateOptions {
            inputs: inputs.into_iter().map(Into::into).collect(),
            bindings,
            configurations: self.configuration_set(),
            parallel: self.generator.parallel.unwrap_or(false),
            follow_dependencies: self.generator.follow_dependencies.unwrap_or(false),
        })
    }
}

fn to_value(raw: &toml::Value) -> Result<Value> {
    Ok(match raw {
        toml::Value::String(s) => Value::scalar(s.as_str()),
        toml::Value::Integer(i) => Value::scalar(i.to_string()),
        toml::Value::Float(f) => Value::scalar(f.to_string()),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Array(items) => {
            Value::List(items.iter().map(to_value).collect::<Result<Vec<_>>>()?)
        }
        toml::Value::Datetime(d) => Value::scalar(d.to_string()),
        toml::Value::Table(_) => bail!("tables cannot be bound to variables"),
    })
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (gantry.toml)
/// 2. Global config (~/.gantry/config.toml)
/// 3. Defaults
///
/// Missing files are skipped; a malformed one fails the load.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<GantryConfig> {
    let mut config = GantryConfig::default();

    // Load global config first
    if let Some(global_path) = global_path {
        config.merge(GantryConfig::load_if_exists(global_path)?);
    }

    // Project config overrides global
    config.merge(GantryConfig::load_if_exists(project_path)?);

    Ok(config)
}

/// Load the configuration for the project rooted at `project_root`.
pub fn load_project_config(project_root: &Path) -> Result<GantryConfig> {
    load_config(
        global_config_path().as_deref(),
        &project_config_path(project_root),
    )
}

/// Get the global gantry config directory (~/.gantry).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".gantry"))
}

/// Get the global config path (~/.gantry/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (gantry.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = GantryConfig::default();
        assert!(config.generator.configurations.is_empty());
        assert!(config.generator.parallel.is_none());
        assert!(config.variables.is_empty());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("gantry.toml");

        std::fs::write(
            &config_path,
            r#"
[generator]
configurations = ["Debug", "Release"]
archs = ["x64"]
follow-dependencies = true

[variables]
OS = "linux"
JOBS = 8
FLAGS = ["-Wall", "-Wextra"]
"#,
        )
        .unwrap();

        let config = GantryConfig::load(&config_path).unwrap();
        assert_eq!(config.generator.configurations, vec!["Debug", "Release"]);
        assert_eq!(config.generator.follow_dependencies, Some(true));

        let opts = config.into_options(["app.toml"]).unwrap();
        assert_eq!(opts.inputs, vec![PathBuf::from("app.toml")]);
        assert!(opts.follow_dependencies);
        assert!(!opts.parallel);
        assert_eq!(opts.bindings["OS"], Value::scalar("linux"));
        assert_eq!(opts.bindings["JOBS"], Value::scalar("8"));
        assert_eq!(opts.bindings["FLAGS"], Value::list(["-Wall", "-Wextra"]));
        assert!(opts.configurations.declares("Release|x64"));
    }

    #[test]
    fn test_table_variable_is_rejected() {
        let config: GantryConfig = toml::from_str(
            r#"
[variables.NESTED]
a = "b"
"#,
        )
        .unwrap();
        let err = config.into_options(["app.toml"]).unwrap_err();
        assert!(err.to_string().contains("NESTED"));
    }

    #[test]
    fn test_config_merge() {
        let mut base = GantryConfig::default();
        base.generator.configurations = vec!["Debug".to_string()];
        base.generator.parallel = Some(true);
        base.variables.insert("OS".to_string(), toml::Value::from("linux"));

        let mut override_cfg = GantryConfig::default();
        override_cfg.generator.configurations = vec!["Release".to_string()];
        override_cfg
            .variables
            .insert("OS".to_string(), toml::Value::from("mac"));

        base.merge(override_cfg);

        assert_eq!(base.generator.configurations, vec!["Release"]);
        assert_eq!(base.generator.parallel, Some(true)); // Not overridden
        assert_eq!(base.variables["OS"], toml::Value::from("mac"));
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("gantry.toml");

        std::fs::write(
            &global_path,
            r#"
[generator]
configurations = ["Debug"]
parallel = true

[variables]
OS = "linux"
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[generator]
configurations = ["Debug", "Release"]
"#,
        )
        .unwrap();

        let config = load_config(Some(&global_path), &project_path).unwrap();
        assert_eq!(config.generator.configurations, vec!["Debug", "Release"]);
        assert_eq!(config.generator.parallel, Some(true));
        assert_eq!(config.variables["OS"], toml::Value::from("linux"));
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(
            Some(&tmp.path().join("global.toml")),
            &project_config_path(tmp.path()),
        )
        .unwrap();
        assert!(config.generator.configurations.is_empty());
        assert!(config.variables.is_empty());
    }

    #[test]
    fn test_malformed_project_config_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = project_config_path(tmp.path());
        std::fs::write(&path, "[generator\n").unwrap();

        let err = load_config(None, &path).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse config file"));
    }
}
