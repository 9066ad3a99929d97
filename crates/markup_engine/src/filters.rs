//! # Filter registry
//!
//! Filters are named value transformations invoked from a directive's
//! pipe chain, e.g. `{{ name | upcase | chop>2 }}`. Each receives the
//! current value and the raw string arguments that followed its name.
//!
//! Any `Fn(&Value, &[String]) -> Result<Value, FilterError>` closure or
//! function is a [`Filter`]; types with state can implement the trait
//! directly.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::FilterError;
use crate::value::Value;

#[cfg(test)]
#[path = "filters_tests.rs"]
mod tests;

/// A named transformation applied to a value in a pipeline.
pub trait Filter: Send + Sync {
    /// Transforms `value`. Arguments arrive untrimmed and uncoerced.
    fn apply(&self, value: &Value, args: &[String]) -> Result<Value, FilterError>;
}

impl<F> Filter for F
where
    F: Fn(&Value, &[String]) -> Result<Value, FilterError> + Send + Sync,
{
    fn apply(&self, value: &Value, args: &[String]) -> Result<Value, FilterError> {
        self(value, args)
    }
}

/// Mapping from filter name to implementation.
///
/// Registration is accretive: registering an existing name replaces that
/// entry only, and [`FilterRegistry::extend`] merges another registry in.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in filter library.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_builtins(&mut registry);
        registry
    }

    /// Registers `filter` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Filter + 'static,
    {
        self.filters.insert(name.into(), Arc::new(filter));
    }

    /// Registers an already shared filter.
    pub fn register_shared(&mut self, name: impl Into<String>, filter: Arc<dyn Filter>) {
        self.filters.insert(name.into(), filter);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Filter>> {
        self.filters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Merges every entry of `other` into this registry.
    pub fn extend(&mut self, other: FilterRegistry) {
        self.filters.extend(other.filters);
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}
