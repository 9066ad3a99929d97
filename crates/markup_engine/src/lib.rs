//! Markup Engine
//!
//! A micro-templating engine. Directives embedded in text as `{{...}}` are
//! replaced with values drawn from a hierarchical context, with support for
//! conditionals, iteration, filter pipelines, includes, globals and
//! captured values.
//!
//! ```rust
//! use serde_json::json;
//!
//! let context = json!({
//!     "name": {"first": "John", "last": "Doe"},
//!     "brothers": ["Jack", "Joe", "Jim"]
//! });
//!
//! let out = markup_engine::render(
//!     "{{name.last|upcase}}: {{brothers}}{{if #|first}}{{else}}, {{/if}}{{.}}{{/brothers}}",
//!     &context.into(),
//! )
//! .unwrap();
//! assert_eq!(out, "DOE: Jack, Joe, Jim");
//! ```
//!
//! Unresolved paths render as `???` and failing filters pass their input
//! through, so a render only fails on a resource guard or when filter
//! errors are configured to propagate. See [`Engine`] for the registries
//! and [`EngineConfig`] for file-based configuration.

mod block;
mod builtins;
mod config;
mod directive;
mod engine;
mod errors;
mod filters;
mod parser;
mod pipeline;
mod resolver;
mod value;

pub use config::{EngineConfig, DEFAULT_DELIMITER, DEFAULT_MAX_DEPTH, DEFAULT_MAX_TEMPLATE_SIZE};
pub use engine::{Engine, Include, RenderOptions, PLACEHOLDER};
pub use errors::{ConfigError, FilterError, RenderError};
pub use filters::{Filter, FilterRegistry};
pub use pipeline::{FilterErrorPolicy, CAPTURE_FILTER};
pub use value::{Iteration, Map, MethodTable, Value};

/// Renders `template` against `context` with a fresh default [`Engine`].
pub fn render(template: &str, context: &Value) -> Result<String, RenderError> {
    Engine::new().render(template, context)
}
