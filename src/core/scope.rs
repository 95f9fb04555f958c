//! Layered variable scopes.
//!
//! A scope is an ordered map of variable bindings with an optional parent.
//! Lookups walk from the innermost scope outward, so local bindings shadow
//! inherited ones. Scopes are immutable once built and shared through `Arc`,
//! which lets every target of a unit hang off the same unit scope without
//! copying it.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::core::value::Value;

/// An immutable variable scope.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: IndexMap<String, Value>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// Create an empty root scope.
    pub fn root() -> Arc<Self> {
        Arc::new(Scope::default())
    }

    /// Create a root scope from caller-supplied bindings.
    pub fn from_bindings(bindings: impl IntoIterator<Item = (String, Value)>) -> Arc<Self> {
        Arc::new(Scope {
            vars: bindings.into_iter().collect(),
            parent: None,
        })
    }

    /// Look up a variable, walking parent scopes.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(value) = scope.vars.get(name) {
                return Some(value);
            }
            current = scope.parent.as_deref();
        }
        None
    }

    /// Check if a variable is visible from this scope.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bindings declared directly in this scope, in declaration order.
    pub fn locals(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The enclosing scope, if any.
    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    /// Number of scopes in the chain, including this one.
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }
}

/// Builder for a child scope.
///
/// Bindings become visible to later lookups on the builder immediately, so a
/// variables block can refer to entries declared earlier in the same block.
#[derive(Debug)]
pub struct ScopeBuilder {
    vars: IndexMap<String, Value>,
    parent: Arc<Scope>,
}

impl ScopeBuilder {
    /// Start a child scope of `parent`.
    pub fn new(parent: Arc<Scope>) -> Self {
        ScopeBuilder {
            vars: IndexMap::new(),
            parent,
        }
    }

    /// Bind a variable, replacing an earlier binding in this scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.vars.insert(name.into(), value);
        self
    }

    /// Bind a variable only if it is not visible yet (a `%` default).
    ///
    /// Returns `true` if the default was applied.
    pub fn set_default(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if self.get(&name).is_some() {
            return false;
        }
        self.vars.insert(name, value);
        true
    }

    /// Look up a variable through the partially built scope.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name).or_else(|| self.parent.get(name))
    }

    /// Check whether nothing was bound.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Freeze the scope.
    ///
    /// An empty builder returns the parent itself instead of adding an empty
    /// layer to the chain.
    pub fn build(self) -> Arc<Scope> {
        if self.vars.is_empty() {
            return self.parent;
        }
        Arc::new(Scope {
            vars: self.vars,
            parent: Some(self.parent),
        })
    }
}

/// Read-only variable lookup.
///
/// Implemented by both finished scopes and scopes under construction so the
/// expression evaluator works against either.
pub trait Lookup {
    /// Look up a variable by name.
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl Lookup for Scope {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl Lookup for ScopeBuilder {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl<T: Lookup + ?Sized> Lookup for Arc<T> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        (**self).lookup(name)
    }
}
