//! Node evaluation.
//!
//! A node is any map that may carry its own `variables` and `conditions`:
//! a unit body, a target, an `export` block, a configuration block. Nodes
//! are evaluated in rounds: variables are bound, then every condition is
//! evaluated against that scope and the chosen branches are merged in.
//! Branches may bring more variables and conditions, so the round repeats
//! until no conditions remain.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value as Raw;
use tracing::{debug, trace};

use crate::core::{Lookup, Scope, ScopeBuilder, Value};
use crate::error::{Error, LoadErrorKind, Result};
use crate::expr::{expand_list, expand_str, Condition, ExprError};
use crate::loader::merge::{merge_into, merge_verbatim};
use crate::sources::RawMap;

/// Key holding a node's variable bindings.
pub const VARIABLES: &str = "variables";
/// Key holding a node's conditional blocks.
pub const CONDITIONS: &str = "conditions";

/// Suffix marking a variable as a default.
const DEFAULT_MARKER: char = '%';

type Merge = fn(&mut RawMap, &RawMap) -> std::result::Result<(), String>;

/// Evaluate a node's variables and conditions.
///
/// Returns the node with `variables` and `conditions` consumed and the
/// scope its remaining fields expand in.
pub fn process(
    map: RawMap,
    parent: Arc<Scope>,
    unit: &Path,
    field: &str,
) -> Result<(RawMap, Arc<Scope>)> {
    evaluate(map, parent, unit, field, merge_into)
}

/// Like [`process`], for a configuration override block: chosen branches
/// merge with their keys as written, so merge suffixes survive until the
/// block is layered over a target's settings.
pub fn process_override(
    map: RawMap,
    parent: Arc<Scope>,
    unit: &Path,
    field: &str,
) -> Result<(RawMap, Arc<Scope>)> {
    evaluate(map, parent, unit, field, merge_verbatim)
}

fn evaluate(
    mut map: RawMap,
    parent: Arc<Scope>,
    unit: &Path,
    field: &str,
    merge: Merge,
) -> Result<(RawMap, Arc<Scope>)> {
    let mut scope = ScopeBuilder::new(parent);

    loop {
        if let Some(vars) = map.shift_remove(VARIABLES) {
            bind_variables(&vars, &mut scope, unit, field)?;
        }

        let Some(conditions) = map.shift_remove(CONDITIONS) else {
            break;
        };
        let Raw::Array(entries) = conditions else {
            return Err(malformed(
                unit,
                format!("`{}` must be a list", join_field(field, CONDITIONS)),
            ));
        };

        for entry in &entries {
            if let Some(branch) = select_branch(entry, &scope, unit, field)? {
                merge(&mut map, branch).map_err(|m| malformed(unit, m))?;
            }
        }
    }

    Ok((map, scope.build()))
}

fn bind_variables(vars: &Raw, scope: &mut ScopeBuilder, unit: &Path, field: &str) -> Result<()> {
    let Raw::Object(vars) = vars else {
        return Err(malformed(
            unit,
            format!("`{}` must be a table", join_field(field, VARIABLES)),
        ));
    };

    for (key, raw) in vars {
        let (name, is_default) = match key.strip_suffix(DEFAULT_MARKER) {
            Some(name) => (name, true),
            None => (key.as_str(), false),
        };
        let var_field = join_field(&join_field(field, VARIABLES), name);

        if is_default && scope.get(name).is_some() {
            trace!(variable = name, "default shadowed by enclosing binding");
            continue;
        }

        let value = expand_value(raw, &*scope, unit, &var_field)?;
        if is_default {
            debug!(variable = name, %value, "applied variable default");
            scope.set_default(name, value);
        } else {
            scope.set(name, value);
        }
    }
    Ok(())
}

/// Pick the branch of one conditions entry.
///
/// Entries are `[expr, then]`, `[expr, then, else]`, chains of
/// `[expr1, then1, expr2, then2, ..., else]`, or `{ if, then, else }`.
fn select_branch<'a>(
    entry: &'a Raw,
    scope: &ScopeBuilder,
    unit: &Path,
    field: &str,
) -> Result<Option<&'a RawMap>> {
    match entry {
        Raw::Array(items) => {
            if items.len() < 2 {
                return Err(malformed(
                    unit,
                    "a condition needs an expression and a branch".to_string(),
                ));
            }
            let mut pairs = items.chunks_exact(2);
            for pair in pairs.by_ref() {
                let expr = condition_text(&pair[0], unit)?;
                if test(expr, scope, unit, field)? {
                    return branch_map(&pair[1], unit).map(Some);
                }
            }
            match pairs.remainder() {
                [otherwise] => branch_map(otherwise, unit).map(Some),
                _ => Ok(None),
            }
        }
        Raw::Object(block) => {
            let expr = block.get("if").ok_or_else(|| {
                malformed(unit, "a condition table needs an `if` key".to_string())
            })?;
            let expr = condition_text(expr, unit)?;
            let chosen = if test(expr, scope, unit, field)? {
                block.get("then")
            } else {
                block.get("else")
            };
            chosen.map(|b| branch_map(b, unit)).transpose()
        }
        _ => Err(malformed(
            unit,
            "a condition must be a list or a table".to_string(),
        )),
    }
}

fn test(expr: &str, scope: &ScopeBuilder, unit: &Path, field: &str) -> Result<bool> {
    let invalid = |err: ExprError| match err {
        ExprError::Syntax { expr, message } => Error::load(
            unit,
            &[],
            LoadErrorKind::InvalidCondition { expr, message },
        ),
        other => expr_error(other, unit, &join_field(field, CONDITIONS)),
    };

    let condition = Condition::parse(expr).map_err(invalid)?;
    let taken = condition.evaluate(scope).map_err(invalid)?;
    trace!(condition = condition.source(), taken, "evaluated condition");
    Ok(taken)
}

fn condition_text<'a>(raw: &'a Raw, unit: &Path) -> Result<&'a str> {
    raw.as_str().ok_or_else(|| {
        malformed(
            unit,
            format!("condition expression must be a string, found `{}`", raw),
        )
    })
}

fn branch_map<'a>(raw: &'a Raw, unit: &Path) -> Result<&'a RawMap> {
    raw.as_object()
        .ok_or_else(|| malformed(unit, "a condition branch must be a table".to_string()))
}

/// Expand a raw field value.
///
/// Strings are expanded; a string made of a single reference keeps the
/// variable's own variant. Lists are expanded in list context, splicing
/// anything that expands to a list. Numbers become their decimal text.
pub fn expand_value(raw: &Raw, scope: &impl Lookup, unit: &Path, field: &str) -> Result<Value> {
    match raw {
        Raw::String(s) => expand_str(s, scope).map_err(|e| expr_error(e, unit, field)),
        Raw::Bool(b) => Ok(Value::Bool(*b)),
        Raw::Number(n) => Ok(Value::Scalar(n.to_string())),
        Raw::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Raw::String(s) => out.extend(
                        expand_list([s.as_str()], scope).map_err(|e| expr_error(e, unit, field))?,
                    ),
                    other => match expand_value(other, scope, unit, field)? {
                        Value::List(spliced) => out.extend(spliced),
                        value => out.push(value),
                    },
                }
            }
            Ok(Value::List(out))
        }
        Raw::Object(_) => Err(malformed(
            unit,
            format!("`{}` must be a string, list or bool, found a table", field),
        )),
        Raw::Null => Err(malformed(unit, format!("`{}` is null", field))),
    }
}

/// Expand a field that must produce one string.
pub fn expand_scalar(raw: &Raw, scope: &impl Lookup, unit: &Path, field: &str) -> Result<String> {
    match expand_value(raw, scope, unit, field)? {
        Value::List(_) => Err(malformed(
            unit,
            format!("`{}` must be a single string", field),
        )),
        value => Ok(value.to_scalar_string()),
    }
}

/// Map an expression error onto the engine error for `field`.
pub fn expr_error(err: ExprError, unit: &Path, field: &str) -> Error {
    match err {
        ExprError::UnresolvedVariable { name } => Error::UnresolvedVariable {
            name,
            unit: unit.to_path_buf(),
            field: field.to_string(),
        },
        ExprError::Syntax { expr, message } => Error::load(
            unit,
            &[],
            LoadErrorKind::InvalidExpression { expr, message },
        ),
    }
}

/// Structural error in `unit`.
pub fn malformed(unit: &Path, message: String) -> Error {
    Error::load(unit, &[], LoadErrorKind::Malformed(message))
}

/// Dotted field path used in diagnostics.
pub fn join_field(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}
