//! # Directive classification
//!
//! Scans a template for `{{...}}` tags and parses the expression inside a
//! tag into a [`Directive`]: conditional flag, property path and filter chain.
//!
//! ```text
//! {{if name.first|equals>John}}
//!   ^^ ^^^^^^^^^^ ^^^^^^ ^^^^
//!   |  path       filter args (split on the delimiter)
//!   conditional
//! ```
//!
//! The path and filter names are trimmed. Filter arguments are kept
//! verbatim, so `{{list|join> - }}` joins with `" - "`. Tags may span
//! several lines.

use std::sync::LazyLock;

use regex::Regex;

#[cfg(test)]
#[path = "directive_tests.rs"]
mod tests;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.+?)\}\}").expect("tag pattern is valid"));

static BACKTICK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`(.+?)`").expect("backtick pattern is valid"));

/// Token shared by every conditional for block matching.
pub const CONDITIONAL_TOKEN: &str = "if";

/// One `{{...}}` occurrence in a template, with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'t> {
    /// The full tag text including braces.
    pub text: &'t str,
    /// Byte offset of the opening `{{`.
    pub start: usize,
    /// Byte offset just past the closing `}}`.
    pub end: usize,
}

/// Structural role of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind<'t> {
    /// `{{else}}`, the conditional branch separator.
    Else,
    /// `{{/name}}`, closing the block opened under `name`.
    Close(&'t str),
    /// Anything else: an expression, possibly self-closing (`{{expr/}}`).
    Expression { body: &'t str, self_closing: bool },
}

impl<'t> Tag<'t> {
    /// Classifies the tag by its syntax alone.
    pub fn kind(&self) -> TagKind<'t> {
        let inner = &self.text[2..self.text.len() - 2];
        let trimmed = inner.trim();

        if trimmed == "else" {
            TagKind::Else
        } else if let Some(name) = trimmed.strip_prefix('/') {
            TagKind::Close(name.trim())
        } else if let Some(body) = inner.strip_suffix('/') {
            TagKind::Expression {
                body,
                self_closing: true,
            }
        } else {
            TagKind::Expression {
                body: inner,
                self_closing: false,
            }
        }
    }

    /// The token under which this tag opens a block, if it can open one.
    pub fn opening_token(&self) -> Option<String> {
        match self.kind() {
            TagKind::Expression {
                body,
                self_closing: false,
            } => Some(block_token(body)),
            _ => None,
        }
    }
}

/// Finds every tag in `template`, in document order.
pub fn scan_tags(template: &str) -> Vec<Tag<'_>> {
    TAG_PATTERN
        .find_iter(template)
        .map(|m| Tag {
            text: m.as_str(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Whether an expression is a conditional (`if ...`).
pub fn is_conditional(body: &str) -> bool {
    body.trim_start()
        .strip_prefix("if")
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

/// The block-matching token of an expression.
///
/// Conditionals share the token `if`; everything else is keyed by its full
/// path expression, so `{{cousin.name}}` closes with `{{/cousin.name}}`.
pub fn block_token(body: &str) -> String {
    if is_conditional(body) {
        CONDITIONAL_TOKEN.to_string()
    } else {
        body.split('|').next().unwrap_or_default().trim().to_string()
    }
}

/// Replaces every backtick segment with the result of `evaluate`.
///
/// `evaluate` receives the inner expression, e.g. `base.n|times>100` for
/// `` `base.n|times>100` ``.
pub fn expand_backticks<E>(
    body: &str,
    mut evaluate: impl FnMut(&str) -> Result<String, E>,
) -> Result<String, E> {
    if !body.contains('`') {
        return Ok(body.to_string());
    }

    let mut expanded = String::with_capacity(body.len());
    let mut last = 0;
    for captures in BACKTICK_PATTERN.captures_iter(body) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        expanded.push_str(&body[last..whole.start()]);
        expanded.push_str(&evaluate(inner.as_str())?);
        last = whole.end();
    }
    expanded.push_str(&body[last..]);
    Ok(expanded)
}

/// One step of a filter chain: `name>arg1>arg2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCall {
    pub name: String,
    /// Raw argument text. Arguments are not trimmed.
    pub args: Vec<String>,
}

/// What a directive's path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// `#` or `##`
    LoopCounter,
    /// `.`
    SelfReference,
    /// A name or dotted path.
    Property,
}

/// A parsed directive expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub conditional: bool,
    pub path: String,
    pub filters: Vec<FilterCall>,
    pub self_closing: bool,
}

impl Directive {
    /// Parses an expression body, splitting filter arguments on `delimiter`.
    ///
    /// Malformed paths are not rejected; they simply fail to resolve later.
    pub fn parse(body: &str, delimiter: &str, self_closing: bool) -> Self {
        let body = body.replace("&gt;", ">");
        let conditional = is_conditional(&body);
        let expression = if conditional {
            &body.trim_start()[2..]
        } else {
            body.as_str()
        };

        let mut parts = expression.split('|');
        let path = parts.next().unwrap_or_default().trim().to_string();
        let filters = parts
            .filter_map(|part| {
                let mut pieces = part.split(delimiter);
                let name = pieces.next()?.trim();
                (!name.is_empty()).then(|| FilterCall {
                    name: name.to_string(),
                    args: pieces.map(str::to_string).collect(),
                })
            })
            .collect();

        Self {
            conditional,
            path,
            filters,
            self_closing,
        }
    }

    pub fn path_kind(&self) -> PathKind {
        match self.path.as_str() {
            "." => PathKind::SelfReference,
            "#" | "##" => PathKind::LoopCounter,
            _ => PathKind::Property,
        }
    }
}
