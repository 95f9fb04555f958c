//! Loosely-typed field values.
//!
//! Description units mix strings, lists and booleans freely. Everything the
//! loader keeps is normalized into [`Value`], and each consumer picks an
//! explicit coercion instead of relying on runtime conversions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A variable or build-setting value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean flag
    Bool(bool),
    /// Plain string
    Scalar(String),
    /// Ordered list of values
    List(Vec<Value>),
}

impl Value {
    /// Create a scalar value.
    pub fn scalar(s: impl Into<String>) -> Self {
        Value::Scalar(s.into())
    }

    /// Create a list of scalars.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::Scalar(s.into())).collect())
    }

    /// Get the scalar string, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Get the list items, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Check if this is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Coerce to a string for use inside a larger string.
    ///
    /// Lists are flattened and joined with a single space, booleans become
    /// `"true"` / `"false"`.
    pub fn to_scalar_string(&self) -> String {
        match self {
            Value::Scalar(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::List(_) => self.flatten().join(" "),
        }
    }

    /// Coerce to a flat list of strings.
    ///
    /// A list splices its (recursively flattened) items; anything else
    /// becomes a single element.
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<String>) {
        match self {
            Value::List(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
            other => out.push(other.to_scalar_string()),
        }
    }

    /// Truthiness used by conditional expressions.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Scalar(s) => !(s.is_empty() || s == "0" || s == "false"),
            Value::List(items) => !items.is_empty(),
        }
    }

    /// Rewrite every string contained in this value.
    pub fn map_strings(&self, f: &impl Fn(&str) -> String) -> Value {
        match self {
            Value::Scalar(s) => Value::Scalar(f(s)),
            Value::Bool(b) => Value::Bool(*b),
            Value::List(items) => Value::List(items.iter().map(|v| v.map_strings(f)).collect()),
        }
    }

    /// Visit every string contained in this value.
    pub fn strings(&self) -> Vec<&str> {
        match self {
            Value::Scalar(s) => vec![s.as_str()],
            Value::Bool(_) => Vec::new(),
            Value::List(items) => items.iter().flat_map(|v| v.strings()).collect(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::List(_) => write!(f, "[{}]", self.flatten().join(", ")),
            other => write!(f, "{}", other.to_scalar_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}
