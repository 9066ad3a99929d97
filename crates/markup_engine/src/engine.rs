//! # Tag-resolution engine
//!
//! The [`Engine`] owns the named registries (filters, includes, globals and
//! captured values) and renders templates against a context by walking the
//! parsed template tree.
//!
//! Each directive is dispatched in a fixed order of precedence:
//!
//! 1. a value captured earlier with `set>name`
//! 2. an include, rendered against the current context
//! 3. the loop counter `#` / `##`
//! 4. the current context `.`
//! 5. a dotted path through the context, captures and globals
//!
//! The resolved value then runs through the directive's filter chain and is
//! substituted. Conditionals select a branch, sequences with a block iterate
//! it once per element, and other values with a block render it with the
//! value as the new context.
//!
//! ## Examples
//!
//! ```rust
//! use markup_engine::{Engine, RenderOptions};
//! use serde_json::json;
//!
//! let mut engine = Engine::new();
//! engine.configure(
//!     RenderOptions::new()
//!         .with_global("site", "example.com")
//!         .with_include("signature", "-- {{name}}, {{site}}"),
//! );
//!
//! let context = json!({"name": "Ann", "pets": ["cat", "dog"]}).into();
//! let out = engine
//!     .render("{{pets}}{{##}}. {{.|upcase}} {{/pets}}{{signature}}", &context)
//!     .unwrap();
//! assert_eq!(out, "1. CAT 2. DOG -- Ann, example.com");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::directive::{expand_backticks, Directive, PathKind};
use crate::errors::{ConfigError, RenderError};
use crate::filters::{Filter, FilterRegistry};
use crate::parser::{self, BlockNode, DirectiveNode, Node};
use crate::pipeline::{FilterErrorPolicy, Pipeline};
use crate::resolver::Resolver;
use crate::value::{Iteration, Map, Value};

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

/// Text substituted for a directive that resolves to nothing.
pub const PLACEHOLDER: &str = "???";

static INTER_TAG_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("compaction pattern is valid"));

/// A named sub-template.
///
/// Producers are called each time the include is referenced, so their text
/// can change between renders.
#[derive(Clone)]
pub enum Include {
    Text(String),
    Producer(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Include {
    /// Wraps a zero-argument function producing template text.
    pub fn producer<F>(producer: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Include::Producer(Arc::new(producer))
    }

    /// Current template text of the include.
    pub fn source(&self) -> String {
        match self {
            Include::Text(text) => text.clone(),
            Include::Producer(producer) => producer(),
        }
    }
}

impl fmt::Debug for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Include::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Include::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl From<&str> for Include {
    fn from(text: &str) -> Self {
        Include::Text(text.to_string())
    }
}

impl From<String> for Include {
    fn from(text: String) -> Self {
        Include::Text(text)
    }
}

/// Registry additions and setting overrides merged into an [`Engine`].
///
/// Merging is accretive: entries are added or replaced by name, nothing is
/// removed. Settings left as `None` keep the engine's current value.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub filters: FilterRegistry,
    pub includes: HashMap<String, Include>,
    pub globals: Map,
    pub delimiter: Option<String>,
    pub compact: Option<bool>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Filter + 'static,
    {
        self.filters.register(name, filter);
        self
    }

    pub fn with_include(mut self, name: impl Into<String>, include: impl Into<Include>) -> Self {
        self.includes.insert(name.into(), include.into());
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = Some(compact);
        self
    }
}

/// Rendering behavior that is not a registry.
#[derive(Debug, Clone)]
struct Settings {
    delimiter: String,
    compact: bool,
    on_filter_error: FilterErrorPolicy,
    max_depth: usize,
    max_template_size: usize,
}

/// A template engine and its registries.
///
/// Registries persist across render calls: globals, includes and filters
/// stay registered, and values captured with `set>name` remain visible to
/// later renders until [`Engine::clear_captures`] is called. Give each
/// concurrent render its own engine, or clone one configured engine.
#[derive(Debug, Clone)]
pub struct Engine {
    filters: FilterRegistry,
    includes: HashMap<String, Include>,
    globals: Map,
    captures: Map,
    settings: Settings,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the built-in filters and default settings.
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    /// Creates an engine from a configuration, seeding its globals and
    /// includes.
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        Self {
            filters: FilterRegistry::with_builtins(),
            includes: config
                .includes
                .into_iter()
                .map(|(name, text)| (name, Include::Text(text)))
                .collect(),
            globals: config.globals,
            captures: Map::new(),
            settings: Settings {
                delimiter: config.delimiter,
                compact: config.compact,
                on_filter_error: config.on_filter_error,
                max_depth: config.max_depth,
                max_template_size: config.max_template_size,
            },
        }
    }

    /// Merges registry entries and setting overrides into this engine.
    pub fn configure(&mut self, options: RenderOptions) {
        self.filters.extend(options.filters);
        self.includes.extend(options.includes);
        self.globals.extend(options.globals);
        if let Some(delimiter) = options.delimiter.filter(|d| !d.is_empty()) {
            self.settings.delimiter = delimiter;
        }
        if let Some(compact) = options.compact {
            self.settings.compact = compact;
        }
    }

    pub fn register_filter<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Filter + 'static,
    {
        self.filters.register(name, filter);
    }

    pub fn register_include(&mut self, name: impl Into<String>, include: impl Into<Include>) {
        self.includes.insert(name.into(), include.into());
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.globals.insert(name.into(), value.into());
    }

    pub fn set_filter_error_policy(&mut self, policy: FilterErrorPolicy) {
        self.settings.on_filter_error = policy;
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn globals(&self) -> &Map {
        &self.globals
    }

    /// Values stored by `set>name` steps so far.
    pub fn captures(&self) -> &Map {
        &self.captures
    }

    pub fn clear_captures(&mut self) {
        self.captures.clear();
    }

    /// Renders `template` against `context`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::TemplateTooLarge`] or [`RenderError::DepthLimit`]
    /// when a resource guard trips, and [`RenderError::Filter`] for a failing
    /// filter when the engine propagates filter errors. Unresolved paths and
    /// unknown filters are never errors.
    pub fn render(&mut self, template: &str, context: &Value) -> Result<String, RenderError> {
        if template.len() > self.settings.max_template_size {
            return Err(RenderError::TemplateTooLarge {
                size: template.len(),
                limit: self.settings.max_template_size,
            });
        }

        let nodes = parser::parse(template);
        debug!(size = template.len(), nodes = nodes.len(), "Rendering template");

        let mut renderer = Renderer {
            filters: &self.filters,
            includes: &self.includes,
            globals: &self.globals,
            captures: &mut self.captures,
            settings: &self.settings,
            depth: 0,
        };
        let output = renderer.render_nodes(&nodes, context, None)?;

        if self.settings.compact {
            Ok(INTER_TAG_WHITESPACE.replace_all(&output, "><").into_owned())
        } else {
            Ok(output)
        }
    }

    /// Merges `options` into the engine, then renders.
    pub fn render_with(
        &mut self,
        template: &str,
        context: &Value,
        options: RenderOptions,
    ) -> Result<String, RenderError> {
        self.configure(options);
        self.render(template, context)
    }
}

/// Where a directive's value came from.
enum Target {
    /// Rendered include text; a block attached to the tag is ignored.
    Include(Value),
    /// A sequence from the context or registries; the chain may reshape it.
    Sequence(Value),
    Value(Value),
    Missing,
}

/// State of one top-level render.
struct Renderer<'e> {
    filters: &'e FilterRegistry,
    includes: &'e HashMap<String, Include>,
    globals: &'e Map,
    captures: &'e mut Map,
    settings: &'e Settings,
    depth: usize,
}

impl Renderer<'_> {
    fn render_text(
        &mut self,
        text: &str,
        context: &Value,
        iter: Option<Iteration>,
    ) -> Result<String, RenderError> {
        let nodes = parser::parse(text);
        self.render_nodes(&nodes, context, iter)
    }

    fn render_nodes(
        &mut self,
        nodes: &[Node<'_>],
        context: &Value,
        iter: Option<Iteration>,
    ) -> Result<String, RenderError> {
        self.depth += 1;
        if self.depth > self.settings.max_depth {
            return Err(RenderError::DepthLimit {
                limit: self.settings.max_depth,
            });
        }

        let mut output = String::new();
        for node in nodes {
            match node {
                Node::Literal(text) | Node::Else(text) => output.push_str(text),
                Node::Directive(open) => {
                    output.push_str(&self.render_directive(open, None, context, iter)?)
                }
                Node::Block(block) => {
                    output.push_str(&self.render_directive(&block.open, Some(block), context, iter)?)
                }
            }
        }

        self.depth -= 1;
        Ok(output)
    }

    fn render_directive(
        &mut self,
        open: &DirectiveNode<'_>,
        block: Option<&BlockNode<'_>>,
        context: &Value,
        iter: Option<Iteration>,
    ) -> Result<String, RenderError> {
        let body = expand_backticks(open.body, |expression| {
            self.render_text(&format!("{{{{{expression}}}}}"), context, iter)
        })?;
        let directive = Directive::parse(&body, &self.settings.delimiter, open.self_closing);
        trace!(
            tag = open.raw,
            path = %directive.path,
            filters = directive.filters.len(),
            block = block.map_or("", |b| b.token.as_str()),
            self_closing = directive.self_closing,
            "Dispatching directive"
        );
        let target = self.target(&directive, context, iter)?;

        if directive.conditional {
            return self.render_conditional(&directive, target, block, context, iter);
        }

        match target {
            Target::Include(value) => Ok(display(&self.pipe(value, &directive)?)),
            Target::Sequence(value) => match self.pipe(value, &directive)? {
                Value::Array(items) => self.render_sequence(&items, block),
                other => Ok(display(&other)),
            },
            Target::Value(value) => {
                let value = self.pipe(value, &directive)?;
                self.render_value(value, block, iter)
            }
            Target::Missing => {
                let value = self.pipe(Value::Undefined, &directive)?;
                match block {
                    Some(_) => Ok(PLACEHOLDER.to_string()),
                    None => Ok(display(&value)),
                }
            }
        }
    }

    fn target(
        &mut self,
        directive: &Directive,
        context: &Value,
        iter: Option<Iteration>,
    ) -> Result<Target, RenderError> {
        let path = directive.path.as_str();

        if let Some(captured) = self.captures.get(path) {
            trace!(path, "Directive resolved from captured value");
            return Ok(classify(captured.clone()));
        }

        let includes = self.includes;
        if let Some(include) = includes.get(path) {
            trace!(path, "Directive resolved from include");
            let text = self.render_text(&include.source(), context, iter)?;
            return Ok(Target::Include(Value::String(text)));
        }

        let value = match directive.path_kind() {
            PathKind::LoopCounter => iter.map(|i| Value::Iter(i.with_sign(path))),
            PathKind::SelfReference => Some(context.clone()),
            PathKind::Property => Resolver::new(self.captures, self.globals).resolve(path, context),
        };

        Ok(match value {
            Some(value) => classify(value),
            None => {
                trace!(path, "Directive did not resolve");
                Target::Missing
            }
        })
    }

    fn render_conditional(
        &mut self,
        directive: &Directive,
        target: Target,
        block: Option<&BlockNode<'_>>,
        context: &Value,
        iter: Option<Iteration>,
    ) -> Result<String, RenderError> {
        let value = match target {
            Target::Include(value) | Target::Sequence(value) | Target::Value(value) => value,
            Target::Missing => Value::Undefined,
        };

        let truth = if directive.filters.is_empty() {
            value.is_truthy()
        } else {
            !self.pipe(value, directive)?.is_false()
        };
        trace!(path = %directive.path, truth, "Conditional evaluated");

        match block {
            Some(block) if truth => self.render_nodes(block.then_branch(), context, iter),
            Some(block) => self.render_nodes(block.else_branch(), context, iter),
            None => Ok(String::new()),
        }
    }

    fn render_sequence(
        &mut self,
        items: &[Value],
        block: Option<&BlockNode<'_>>,
    ) -> Result<String, RenderError> {
        let Some(block) = block else {
            return Ok(items.iter().map(display).collect());
        };

        let mut output = String::new();
        for (index, item) in items.iter().enumerate() {
            let element_iter = Iteration::new(index, items.len());
            output.push_str(&self.render_nodes(&block.children, item, Some(element_iter))?);
        }
        trace!(elements = items.len(), "Sequence iterated");
        Ok(output)
    }

    fn render_value(
        &mut self,
        value: Value,
        block: Option<&BlockNode<'_>>,
        iter: Option<Iteration>,
    ) -> Result<String, RenderError> {
        if let Value::Array(items) = &value {
            return self.render_sequence(items, block);
        }

        let Some(block) = block else {
            return Ok(display(&value));
        };

        if value.is_truthy() {
            self.render_nodes(&block.children, &value, iter)
        } else {
            Ok(PLACEHOLDER.to_string())
        }
    }

    fn pipe(&mut self, value: Value, directive: &Directive) -> Result<Value, RenderError> {
        if directive.filters.is_empty() {
            return Ok(value);
        }
        Pipeline::new(self.filters, self.settings.on_filter_error).apply(
            value,
            &directive.filters,
            self.captures,
        )
    }
}

fn classify(value: Value) -> Target {
    match value {
        Value::Array(_) => Target::Sequence(value),
        Value::Undefined => Target::Missing,
        other => Target::Value(other),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Undefined => PLACEHOLDER.to_string(),
        other => other.to_string(),
    }
}
