//! Target loader.
//!
//! Turns description units into [`DescriptionUnit`]s:
//!
//! 1. Read the unit and every unit it includes, merging them into one raw
//!    tree (includes first, in include order, the unit's own body last)
//! 2. Evaluate unit-level variables and conditions
//! 3. Merge each target over `target_defaults` and extract it
//!
//! [`load_units`] loads a set of top-level inputs, optionally on rayon
//! worker threads, and follows unit-qualified dependency references to the
//! units that define them.

pub mod extract;
pub mod merge;
pub mod node;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::Value as Raw;
use tracing::{debug, trace};

use crate::core::{DescriptionUnit, Scope, TargetRef};
use crate::error::{Error, LoadErrorKind, Result};
use crate::loader::merge::merge_into;
use crate::loader::node::malformed;
use crate::sources::{RawMap, UnitFormat, UnitSource};
use crate::util::paths::relative_to_unit;

/// Key listing the units a unit includes.
pub const INCLUDES: &str = "includes";
/// Key holding settings merged under every target of a unit.
pub const TARGET_DEFAULTS: &str = "target_defaults";
/// Key holding a unit's targets.
pub const TARGETS: &str = "targets";

/// Loads description units from a [`UnitSource`].
///
/// A loader holds no per-load state: each call to [`load`](Self::load) owns
/// its include stack, so one loader can serve several threads.
pub struct Loader<'s> {
    source: &'s dyn UnitSource,
    root: Arc<Scope>,
}

impl<'s> Loader<'s> {
    /// Create a loader whose units see `root` as their enclosing scope.
    pub fn new(source: &'s dyn UnitSource, root: Arc<Scope>) -> Self {
        Loader { source, root }
    }

    /// Load one unit and everything it includes.
    pub fn load(&self, path: &Path) -> Result<DescriptionUnit> {
        let key = self.source.unit_key(path);
        debug!(unit = %key.display(), source = self.source.name(), "loading unit");

        let mut stack = Vec::new();
        let mut includes = Vec::new();
        let raw = self.load_raw(&key, &mut stack, &mut includes)?;

        let (mut body, scope) = node::process(raw, self.root.clone(), &key, "")?;

        let defaults = match body.shift_remove(TARGET_DEFAULTS) {
            Some(Raw::Object(map)) => map,
            Some(_) => return Err(malformed(&key, format!("`{}` must be a table", TARGET_DEFAULTS))),
            None => RawMap::new(),
        };

        let raw_targets = match body.shift_remove(TARGETS) {
            Some(Raw::Array(items)) => items,
            Some(_) => return Err(malformed(&key, format!("`{}` must be a list", TARGETS))),
            None => Vec::new(),
        };

        for ignored in body.keys() {
            trace!(unit = %key.display(), key = %ignored, "ignoring unknown unit key");
        }

        let mut targets = Vec::with_capacity(raw_targets.len());
        let mut seen = HashSet::new();
        for raw in raw_targets {
            let Raw::Object(table) = raw else {
                return Err(malformed(&key, "each target must be a table".to_string()));
            };
            let mut merged = defaults.clone();
            merge_into(&mut merged, &table).map_err(|m| malformed(&key, m))?;

            let target = extract::target(merged, &scope, &key)?;
            if !seen.insert(target.name().to_string()) {
                return Err(Error::load(
                    &key,
                    &[],
                    LoadErrorKind::DuplicateTarget(target.name().to_string()),
                ));
            }
            trace!(id = %target.id, kind = target.kind.as_str(), "loaded target");
            targets.push(target);
        }

        debug!(
            unit = %key.display(),
            targets = targets.len(),
            includes = includes.len(),
            "loaded unit"
        );
        Ok(DescriptionUnit::new(key, targets, includes, scope))
    }

    /// Read `key` and its includes into one merged raw tree.
    ///
    /// `stack` holds the units currently being loaded, outermost first.
    fn load_raw(
        &self,
        key: &Path,
        stack: &mut Vec<PathBuf>,
        includes: &mut Vec<PathBuf>,
    ) -> Result<RawMap> {
        if let Some(pos) = stack.iter().position(|p| p == key) {
            let mut cycle = stack[pos..].to_vec();
            cycle.push(key.to_path_buf());
            return Err(Error::CircularInclude { cycle });
        }

        let chain = stack.clone();
        let text = self
            .source
            .read(key)
            .map_err(|e| Error::load(key, &chain, LoadErrorKind::Read(e)))?;
        let mut body = UnitFormat::for_path(key)
            .parse(&text)
            .map_err(|m| Error::load(key, &chain, LoadErrorKind::Malformed(m)))?;

        let declared = match body.shift_remove(INCLUDES) {
            Some(Raw::Array(items)) => items,
            Some(_) => {
                return Err(Error::load(
                    key,
                    &chain,
                    LoadErrorKind::Malformed(format!("`{}` must be a list", INCLUDES)),
                ))
            }
            None => Vec::new(),
        };

        stack.push(key.to_path_buf());
        let mut merged = RawMap::new();
        for raw in &declared {
            let Some(reference) = raw.as_str() else {
                return Err(Error::load(
                    key,
                    &chain,
                    LoadErrorKind::Malformed(format!(
                        "include entries must be strings, found `{}`",
                        raw
                    )),
                ));
            };
            let include = self
                .source
                .unit_key(&relative_to_unit(key, Path::new(reference)));

            if !stack.contains(&include) && !self.source.exists(&include) {
                return Err(Error::load(
                    key,
                    &chain,
                    LoadErrorKind::MissingInclude(include),
                ));
            }

            debug!(unit = %key.display(), include = %include.display(), "including unit");
            if !includes.contains(&include) {
                includes.push(include.clone());
            }
            let included = self.load_raw(&include, stack, includes)?;
            merge_into(&mut merged, &included)
                .map_err(|m| Error::load(key, &chain, LoadErrorKind::Malformed(m)))?;
        }
        stack.pop();

        merge_into(&mut merged, &body)
            .map_err(|m| Error::load(key, &chain, LoadErrorKind::Malformed(m)))?;
        Ok(merged)
    }
}

/// Options for [`load_units`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Load top-level inputs on rayon worker threads
    pub parallel: bool,

    /// Load units named by unit-qualified dependency references
    pub follow_dependencies: bool,
}

/// Load a set of top-level units.
///
/// Results are in input order with duplicates removed, followed by units
/// discovered through dependency references in discovery order. The first
/// failing input (in input order) aborts the whole load.
pub fn load_units(
    source: &dyn UnitSource,
    inputs: &[PathBuf],
    root: Arc<Scope>,
    options: LoadOptions,
) -> Result<Vec<DescriptionUnit>> {
    let loader = Loader::new(source, root);

    let mut known = HashSet::new();
    let mut pending: Vec<PathBuf> = inputs
        .iter()
        .map(|p| source.unit_key(p))
        .filter(|key| known.insert(key.clone()))
        .collect();

    let mut units: Vec<DescriptionUnit> = Vec::new();
    while !pending.is_empty() {
        let batch = std::mem::take(&mut pending);
        let start = units.len();
        units.extend(load_batch(&loader, &batch, options.parallel)?);

        if !options.follow_dependencies {
            break;
        }

        for unit in &units[start..] {
            for reference in referenced_units(unit) {
                let key = source.unit_key(&relative_to_unit(unit.path(), Path::new(reference)));
                if !known.contains(&key) && source.exists(&key) {
                    debug!(unit = %key.display(), from = %unit.path().display(), "following dependency");
                    known.insert(key.clone());
                    pending.push(key);
                }
            }
        }
    }

    Ok(units)
}

fn load_batch(loader: &Loader<'_>, batch: &[PathBuf], parallel: bool) -> Result<Vec<DescriptionUnit>> {
    if parallel && batch.len() > 1 {
        // Collect every result first so the reported error is the first in
        // input order, not the first to finish.
        let results: Vec<Result<DescriptionUnit>> =
            batch.par_iter().map(|key| loader.load(key)).collect();
        results.into_iter().collect()
    } else {
        batch.iter().map(|key| loader.load(key)).collect()
    }
}

fn referenced_units(unit: &DescriptionUnit) -> impl Iterator<Item = &str> {
    unit.targets()
        .iter()
        .flat_map(|t| t.dependencies.iter())
        .filter_map(|dep| match TargetRef::parse(&dep.reference) {
            TargetRef::Qualified { unit, .. } => Some(unit),
            TargetRef::Local(_) => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TargetId, TargetKind, Value};
    use crate::sources::MemorySource;

    fn root() -> Arc<Scope> {
        Scope::from_bindings([("OS".to_string(), Value::scalar("linux"))])
    }

    #[test]
    fn test_includes_merge_before_body() {
        let source = MemorySource::new()
            .with_unit(
                "common.toml",
                r#"
                [variables]
                opt = "2"
                [target_defaults]
                defines = ["COMMON"]
                "#,
            )
            .with_unit(
                "app/app.toml",
                r#"
                includes = ["../common.toml"]
                [variables]
                opt = "3"
                [[targets]]
                name = "app"
                type = "executable"
                defines = ["APP"]
                cflags = ["-O$(opt)"]
                "#,
            );

        let unit = Loader::new(&source, root()).load(Path::new("app/app.toml")).unwrap();
        let app = unit.target("app").unwrap();

        assert_eq!(app.id, TargetId::new("app/app.toml", "app"));
        assert_eq!(app.kind, TargetKind::Executable);
        assert_eq!(app.settings.strings("defines"), vec!["COMMON", "APP"]);
        assert_eq!(app.settings.strings("cflags"), vec!["-O3"]);
        assert_eq!(unit.includes(), &[PathBuf::from("common.toml")]);
    }

    #[test]
    fn test_target_defaults_suffixes() {
        let source = MemorySource::new().with_unit(
            "u.toml",
            r#"
            [target_defaults]
            defines = ["A"]
            cflags = ["-g"]
            [[targets]]
            name = "x"
            "defines=" = ["B"]
            "cflags+" = ["-O2"]
            "#,
        );
        let unit = Loader::new(&source, root()).load(Path::new("u.toml")).unwrap();
        let x = unit.target("x").unwrap();
        assert_eq!(x.settings.strings("defines"), vec!["B"]);
        assert_eq!(x.settings.strings("cflags"), vec!["-O2", "-g"]);
    }

    #[test]
    fn test_circular_include() {
        let source = MemorySource::new()
            .with_unit("a.toml", r#"includes = ["b.toml"]"#)
            .with_unit("b.toml", r#"includes = ["a.toml"]"#);
        let err = Loader::new(&source, root()).load(Path::new("a.toml")).unwrap_err();
        match err {
            Error::CircularInclude { cycle } => assert_eq!(
                cycle,
                vec![
                    PathBuf::from("a.toml"),
                    PathBuf::from("b.toml"),
                    PathBuf::from("a.toml")
                ]
            ),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_include_reports_chain() {
        let source = MemorySource::new()
            .with_unit("app.toml", r#"includes = ["mid.toml"]"#)
            .with_unit("mid.toml", r#"includes = ["gone.toml"]"#);
        let err = Loader::new(&source, root()).load(Path::new("app.toml")).unwrap_err();
        match err {
            Error::Load {
                unit,
                include_chain,
                kind: LoadErrorKind::MissingInclude(missing),
            } => {
                assert_eq!(unit, PathBuf::from("mid.toml"));
                assert_eq!(include_chain, vec![PathBuf::from("app.toml")]);
                assert_eq!(missing, PathBuf::from("gone.toml"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_duplicate_target() {
        let source = MemorySource::new().with_unit(
            "u.toml",
            r#"
            [[targets]]
            name = "x"
            [[targets]]
            name = "x"
            "#,
        );
        let err = Loader::new(&source, root()).load(Path::new("u.toml")).unwrap_err();
        assert!(matches!(
            err,
            Error::Load {
                kind: LoadErrorKind::DuplicateTarget(_),
                ..
            }
        ));
    }

    #[test]
    fn test_json_unit() {
        let source = MemorySource::new().with_unit(
            "u.json",
            r#"{"targets": [{"name": "x", "type": "static_library", "sources": ["$(OS).c"]}]}"#,
        );
        let unit = Loader::new(&source, root()).load(Path::new("u.json")).unwrap();
        assert_eq!(unit.targets()[0].sources, vec!["linux.c"]);
    }

    #[test]
    fn test_unit_level_conditions_add_targets() {
        let source = MemorySource::new().with_unit(
            "u.toml",
            r#"
            conditions = [
                ["OS == 'linux'", { targets = [{ name = "linux_only" }] }],
                ["OS == 'win'", { targets = [{ name = "win_only" }] }],
            ]
            [[targets]]
            name = "always"
            "#,
        );
        let unit = Loader::new(&source, root()).load(Path::new("u.toml")).unwrap();
        let names: Vec<&str> = unit.targets().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["always", "linux_only"]);
    }

    #[test]
    fn test_load_units_follows_references() {
        let source = MemorySource::new()
            .with_unit(
                "app.toml",
                r#"
                [[targets]]
                name = "app"
                dependencies = ["lib/lib.toml:lib"]
                "#,
            )
            .with_unit(
                "lib/lib.toml",
                r#"
                [[targets]]
                name = "lib"
                "#,
            );
        let inputs = vec![PathBuf::from("app.toml"), PathBuf::from("./app.toml")];

        let units = load_units(
            &source,
            &inputs,
            root(),
            LoadOptions {
                parallel: true,
                follow_dependencies: true,
            },
        )
        .unwrap();
        let paths: Vec<&Path> = units.iter().map(|u| u.path()).collect();
        assert_eq!(paths, vec![Path::new("app.toml"), Path::new("lib/lib.toml")]);

        let units = load_units(&source, &inputs, root(), LoadOptions::default()).unwrap();
        assert_eq!(units.len(), 1);
    }
}
