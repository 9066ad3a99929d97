//! # Context resolution
//!
//! Resolves dotted paths such as `sisters.0.name` against the current
//! context. The first segment picks a root: the local context if it has the
//! name, otherwise a captured value, otherwise a global. Remaining segments
//! are walked from that root only; a miss anywhere yields `None`.

use std::borrow::Cow;

use tracing::trace;

use crate::value::{Map, Value};

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

/// Path resolution over a local context with registry fallbacks.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    captures: &'a Map,
    globals: &'a Map,
}

impl<'a> Resolver<'a> {
    pub fn new(captures: &'a Map, globals: &'a Map) -> Self {
        Self { captures, globals }
    }

    /// Resolves `path` against `context`.
    ///
    /// `.` resolves to the context itself. Absent segments short-circuit to
    /// `None`; nothing here fails.
    pub fn resolve(&self, path: &str, context: &Value) -> Option<Value> {
        if path == "." {
            return Some(context.clone());
        }

        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty())?;
        let mut current = self.root(first, context)?;

        for segment in segments {
            current = match current {
                Cow::Borrowed(value) => value.child(segment)?,
                Cow::Owned(value) => Cow::Owned(value.child(segment)?.into_owned()),
            };
        }

        Some(current.into_owned())
    }

    /// Picks the root value for the first path segment.
    fn root<'v>(&self, name: &str, context: &'v Value) -> Option<Cow<'v, Value>>
    where
        'a: 'v,
    {
        if let Some(local) = context.child(name) {
            return Some(local);
        }

        if let Some(captured) = self.captures.get(name) {
            trace!(name, "Resolving path from captured value");
            return Some(Cow::Borrowed(captured));
        }

        if let Some(global) = self.globals.get(name) {
            trace!(name, "Resolving path from global");
            return Some(Cow::Borrowed(global));
        }

        None
    }
}
