//! Build settings - what a target compiles and links with.
//!
//! Settings are an ordered map of setting name to [`Value`]. A handful of
//! names carry meaning for propagation (`defines`, `include_dirs`,
//! `libraries`); the rest are passed through to emitters untouched.
//!
//! Key principle: exported settings propagate to dependents, plain settings
//! don't.
//!
//! A key may end in a merge suffix (`key=`, `key+`, `key?`). Override blocks
//! keep the suffix until they are merged, so the policy applies against the
//! settings they override.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::value::Value;

/// Preprocessor defines.
pub const DEFINES: &str = "defines";
/// Header search directories.
pub const INCLUDE_DIRS: &str = "include_dirs";
/// Libraries to link.
pub const LIBRARIES: &str = "libraries";

/// How an incoming key combines with an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Recursive merge / append / replace by type
    Merge,
    /// `key=`
    Replace,
    /// `key+`
    Prepend,
    /// `key?`
    IfAbsent,
}

/// Split a key into its base name and merge policy.
///
/// A key made of the suffix alone has no base name and merges normally.
pub fn split_key(key: &str) -> (&str, MergePolicy) {
    let policy = match key.chars().next_back() {
        Some('=') => MergePolicy::Replace,
        Some('+') => MergePolicy::Prepend,
        Some('?') => MergePolicy::IfAbsent,
        _ => return (key, MergePolicy::Merge),
    };
    // The suffix is one ASCII byte.
    match &key[..key.len() - 1] {
        "" => (key, MergePolicy::Merge),
        base => (base, policy),
    }
}

/// An ordered set of build settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: IndexMap<String, Value>,
}

impl Settings {
    /// Create empty settings.
    pub fn new() -> Self {
        Settings::default()
    }

    /// Get a setting.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set a setting, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Setting names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of settings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Flattened string items of a list setting (empty when absent).
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.values.get(key).map(Value::flatten).unwrap_or_default()
    }

    /// Header search directories.
    pub fn include_dirs(&self) -> Vec<String> {
        self.strings(INCLUDE_DIRS)
    }

    /// Libraries to link.
    pub fn libraries(&self) -> Vec<String> {
        self.strings(LIBRARIES)
    }

    /// Merge another set of settings into this one.
    ///
    /// Lists append, scalars and booleans are replaced by the incoming
    /// value. When a list meets a scalar the scalar is promoted to a
    /// one-element list and the two are concatenated in merge order.
    ///
    /// Incoming keys with a merge suffix replace, prepend or fill in the
    /// base key instead.
    pub fn merge(&mut self, other: &Settings) {
        self.merge_with(other, false);
    }

    /// Like [`merge`](Self::merge), but list items already present are
    /// skipped. Used for settings contributed by dependencies, where the same
    /// export can arrive along more than one path.
    pub fn merge_unique(&mut self, other: &Settings) {
        self.merge_with(other, true);
    }

    fn merge_with(&mut self, other: &Settings, unique: bool) {
        for (key, incoming) in &other.values {
            let (base, policy) = split_key(key);
            match self.values.entry(base.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(incoming.clone());
                }
                Entry::Occupied(mut slot) => {
                    let current = slot.get_mut();
                    match policy {
                        MergePolicy::Replace => *current = incoming.clone(),
                        MergePolicy::IfAbsent => {}
                        MergePolicy::Prepend => prepend_list(current, incoming),
                        MergePolicy::Merge => {
                            if current.is_list() || incoming.is_list() {
                                append_list(current, incoming, unique);
                            } else {
                                *current = incoming.clone();
                            }
                        }
                    }
                }
            }
        }
    }

    /// Rewrite every string held by these settings.
    pub fn map_strings(&self, f: impl Fn(&str) -> String) -> Settings {
        Settings {
            values: self
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.map_strings(&f)))
                .collect(),
        }
    }

    /// Visit every string held by these settings, with its setting name.
    pub fn strings_with_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .flat_map(|(k, v)| v.strings().into_iter().map(move |s| (k.as_str(), s)))
    }
}

fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        scalar => vec![scalar],
    }
}

fn append_list(current: &mut Value, incoming: &Value, unique: bool) {
    let mut items = into_items(std::mem::replace(current, Value::List(Vec::new())));
    let additions = into_items(incoming.clone());
    for item in additions {
        if unique && items.contains(&item) {
            continue;
        }
        items.push(item);
    }
    *current = Value::List(items);
}

fn prepend_list(current: &mut Value, incoming: &Value) {
    let mut items = into_items(incoming.clone());
    items.extend(into_items(std::mem::replace(current, Value::List(Vec::new()))));
    *current = Value::List(items);
}

impl FromIterator<(String, Value)> for Settings {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Settings {
            values: iter.into_iter().collect(),
        }
    }
}
