//! Raw target tables to [`TargetDefinition`]s.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value as Raw;

use crate::core::{DependencyRef, EdgeKind, Scope, Settings, TargetDefinition, TargetId, TargetKind};
use crate::error::Result;
use crate::loader::merge::CONFIGURATIONS;
use crate::loader::node::{self, expand_scalar, expand_value, join_field, malformed};
use crate::sources::RawMap;

const NAME: &str = "name";
const TYPE: &str = "type";
const SOURCES: &str = "sources";
const DEPENDENCIES: &str = "dependencies";
const EXPORT: &str = "export";
const DIRECT_EXPORT: &str = "direct_export";

/// Build a target from its table, already merged over `target_defaults`.
pub fn target(raw: RawMap, unit_scope: &Arc<Scope>, unit: &Path) -> Result<TargetDefinition> {
    let label = raw
        .get(NAME)
        .and_then(Raw::as_str)
        .unwrap_or("<unnamed>")
        .to_string();
    let (mut map, scope) = node::process(raw, unit_scope.clone(), unit, &label)?;

    let name = match map.shift_remove(NAME) {
        Some(raw) => expand_scalar(&raw, &scope, unit, &join_field(&label, NAME))?,
        None => return Err(malformed(unit, "target without a `name`".to_string())),
    };
    if name.is_empty() {
        return Err(malformed(unit, "target name is empty".to_string()));
    }

    let kind = match map.shift_remove(TYPE) {
        Some(raw) => expand_scalar(&raw, &scope, unit, &join_field(&name, TYPE))?
            .parse::<TargetKind>()
            .map_err(|m| malformed(unit, format!("target `{}`: {}", name, m)))?,
        None => TargetKind::default(),
    };

    let mut target = TargetDefinition::new(TargetId::new(unit, name.as_str()), kind);

    if let Some(raw) = map.shift_remove(SOURCES) {
        target.sources = expand_value(&raw, &scope, unit, &join_field(&name, SOURCES))?.flatten();
    }

    if let Some(raw) = map.shift_remove(DEPENDENCIES) {
        target.dependencies = dependencies(&raw, &scope, unit, &join_field(&name, DEPENDENCIES))?;
    }

    if let Some(raw) = map.shift_remove(EXPORT) {
        target.export = settings_node(raw, &scope, unit, &join_field(&name, EXPORT))?;
    }

    if let Some(raw) = map.shift_remove(DIRECT_EXPORT) {
        target.direct_export = settings_node(raw, &scope, unit, &join_field(&name, DIRECT_EXPORT))?;
    }

    if let Some(raw) = map.shift_remove(CONFIGURATIONS) {
        let field = join_field(&name, CONFIGURATIONS);
        let Raw::Object(blocks) = raw else {
            return Err(malformed(unit, format!("`{}` must be a table", field)));
        };
        for (key, block) in blocks {
            let settings = override_node(block, &scope, unit, &join_field(&field, &key))?;
            target.configurations.insert(key, settings);
        }
    }

    for (key, raw) in &map {
        let value = expand_value(raw, &scope, unit, &join_field(&name, key))?;
        target.settings.insert(key.clone(), value);
    }

    Ok(target)
}

/// A nested settings block with its own variables and conditions.
fn settings_node(raw: Raw, scope: &Arc<Scope>, unit: &Path, field: &str) -> Result<Settings> {
    let (map, scope) = node::process(table(raw, unit, field)?, scope.clone(), unit, field)?;
    expand_settings(&map, &scope, unit, field)
}

/// A configuration override block. Keys keep their merge suffixes.
fn override_node(raw: Raw, scope: &Arc<Scope>, unit: &Path, field: &str) -> Result<Settings> {
    let (map, scope) =
        node::process_override(table(raw, unit, field)?, scope.clone(), unit, field)?;
    expand_settings(&map, &scope, unit, field)
}

fn table(raw: Raw, unit: &Path, field: &str) -> Result<RawMap> {
    match raw {
        Raw::Object(map) => Ok(map),
        _ => Err(malformed(unit, format!("`{}` must be a table", field))),
    }
}

fn expand_settings(map: &RawMap, scope: &Arc<Scope>, unit: &Path, field: &str) -> Result<Settings> {
    let mut settings = Settings::new();
    for (key, raw) in map {
        let value = expand_value(raw, scope, unit, &join_field(field, key))?;
        settings.insert(key.clone(), value);
    }
    Ok(settings)
}

fn dependencies(
    raw: &Raw,
    scope: &Arc<Scope>,
    unit: &Path,
    field: &str,
) -> Result<Vec<DependencyRef>> {
    let Raw::Array(items) = raw else {
        return Err(malformed(unit, format!("`{}` must be a list", field)));
    };

    let mut deps = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Raw::String(_) => {
                // `$(DEPS)` may expand to several references.
                for reference in expand_value(item, scope, unit, field)?.flatten() {
                    deps.push(DependencyRef::new(reference));
                }
            }
            Raw::Object(spec) => {
                let reference = spec
                    .get("target")
                    .ok_or_else(|| {
                        malformed(unit, format!("`{}` entry needs a `target` key", field))
                    })?;
                let reference = expand_scalar(reference, scope, unit, field)?;
                let kind = match spec.get("kind") {
                    Some(raw) => expand_scalar(raw, scope, unit, field)?
                        .parse::<EdgeKind>()
                        .map_err(|m| malformed(unit, format!("`{}`: {}", field, m)))?,
                    None => EdgeKind::default(),
                };
                deps.push(DependencyRef::new(reference).with_kind(kind));
            }
            other => {
                return Err(malformed(
                    unit,
                    format!("`{}` entries must be strings or tables, found `{}`", field, other),
                ))
            }
        }
    }
    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::error::{Error, LoadErrorKind};
    use serde_json::json;

    fn map(value: Raw) -> RawMap {
        match value {
            Raw::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn scope() -> Arc<Scope> {
        Scope::from_bindings([
            ("OS".to_string(), Value::scalar("linux")),
            ("DEPS".to_string(), Value::list(["a", "b"])),
        ])
    }

    #[test]
    fn test_extracts_fields() {
        let raw = map(json!({
            "name": "app",
            "type": "exe",
            "sources": ["main.c", "os_$(OS).c"],
            "dependencies": ["$(DEPS)", {"target": "gen", "kind": "order"}],
            "export": {"include_dirs": ["include"]},
            "configurations": {"Debug": {"defines": ["DEBUG"]}},
            "cflags": ["-Wall"],
        }));
        let target = target(raw, &scope(), Path::new("app.toml")).unwrap();

        assert_eq!(target.id, TargetId::new("app.toml", "app"));
        assert_eq!(target.kind, TargetKind::Executable);
        assert_eq!(target.sources, vec!["main.c", "os_linux.c"]);
        assert_eq!(
            target.dependencies,
            vec![
                DependencyRef::new("a"),
                DependencyRef::new("b"),
                DependencyRef::new("gen").with_kind(EdgeKind::Order),
            ]
        );
        assert_eq!(target.export.include_dirs(), vec!["include"]);
        assert_eq!(target.configurations["Debug"].strings("defines"), vec!["DEBUG"]);
        assert_eq!(target.settings.strings("cflags"), vec!["-Wall"]);
    }

    #[test]
    fn test_export_block_has_own_conditions() {
        let raw = map(json!({
            "name": "lib",
            "export": {
                "defines": ["LIB"],
                "conditions": [["OS == \"linux\"", {"libraries": ["pthread"]}]],
            },
        }));
        let target = target(raw, &scope(), Path::new("lib.toml")).unwrap();
        assert_eq!(target.export.libraries(), vec!["pthread"]);
        assert!(target.export.get("conditions").is_none());
    }

    #[test]
    fn test_override_block_keeps_suffixed_keys() {
        let raw = map(json!({
            "name": "app",
            "defines": ["DEBUG_BUILD"],
            "configurations": {"Release": {"defines=": ["NDEBUG"]}},
        }));
        let target = target(raw, &scope(), Path::new("app.toml")).unwrap();
        let release = &target.configurations["Release"];
        assert_eq!(release.strings("defines="), vec!["NDEBUG"]);
        assert!(release.get("defines").is_none());
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let err = target(map(json!({"type": "exe"})), &scope(), Path::new("u.toml")).unwrap_err();
        assert!(matches!(
            err,
            Error::Load {
                kind: LoadErrorKind::Malformed(_),
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let err = target(
            map(json!({"name": "x", "type": "program"})),
            &scope(),
            Path::new("u.toml"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown target type"));
    }
}
