//! # Template tree
//!
//! Splits a template into literal text, directive tags and blocks. A block
//! owns the parsed nodes of its inner text, so a conditional knows exactly
//! which `{{else}}` belongs to it: else markers of nested conditionals are
//! buried inside nested [`Node::Block`]s and never appear at its top level.
//!
//! The template is scanned for tags once; blocks are matched over slices of
//! that tag list rather than by rescanning their text.
//!
//! Directive expressions are kept as raw text. Backtick sub-expressions can
//! only be expanded against a context, which happens at render time.

use std::collections::HashMap;
use std::ops::Range;

use crate::block::match_block;
use crate::directive::{block_token, is_conditional, scan_tags, Tag, TagKind};

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;

/// A single directive tag, unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveNode<'t> {
    /// The full tag text including braces.
    pub raw: &'t str,
    /// The expression between the braces, without a self-closing slash.
    pub body: &'t str,
    pub self_closing: bool,
}

/// A directive with a matching closer and its parsed inner text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode<'t> {
    pub open: DirectiveNode<'t>,
    pub token: String,
    pub children: Vec<Node<'t>>,
    /// Index into `children` of the `{{else}}` that splits a conditional.
    pub else_split: Option<usize>,
}

impl<'t> BlockNode<'t> {
    /// The branch rendered when a conditional holds.
    pub fn then_branch(&self) -> &[Node<'t>] {
        match self.else_split {
            Some(split) => &self.children[..split],
            None => &self.children,
        }
    }

    /// The branch rendered when a conditional fails; empty without an else.
    pub fn else_branch(&self) -> &[Node<'t>] {
        let Some(split) = self.else_split else {
            return &[];
        };
        let rest = &self.children[split + 1..];
        let end = rest
            .iter()
            .position(|node| matches!(node, Node::Else(_)))
            .unwrap_or(rest.len());
        &rest[..end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'t> {
    Literal(&'t str),
    /// An `{{else}}` marker. Outside a conditional it renders as-is.
    Else(&'t str),
    Directive(DirectiveNode<'t>),
    Block(BlockNode<'t>),
}

/// Parses `text` into a sequence of nodes.
///
/// Openers without a balanced closer become plain directives.
pub fn parse(text: &str) -> Vec<Node<'_>> {
    let tags = scan_tags(text);
    let mut last_close = HashMap::new();
    for (index, tag) in tags.iter().enumerate() {
        if let TagKind::Close(name) = tag.kind() {
            last_close.insert(name, index);
        }
    }

    let scan = Scan {
        text,
        tags,
        last_close,
    };
    scan.nodes(0..scan.tags.len(), 0..text.len())
}

/// The tags of one template with the index of the last closer per name.
struct Scan<'t> {
    text: &'t str,
    tags: Vec<Tag<'t>>,
    last_close: HashMap<&'t str, usize>,
}

impl<'t> Scan<'t> {
    /// Builds the nodes for the tags at `tags`, which lie in the bytes `span`.
    fn nodes(&self, tags: Range<usize>, span: Range<usize>) -> Vec<Node<'t>> {
        let mut nodes = Vec::new();
        let mut cursor = span.start;
        let mut index = tags.start;

        while index < tags.end {
            let tag = self.tags[index];
            if tag.start > cursor {
                nodes.push(Node::Literal(&self.text[cursor..tag.start]));
            }
            cursor = tag.end;

            match tag.kind() {
                TagKind::Else => nodes.push(Node::Else(tag.text)),
                TagKind::Close(_) => nodes.push(Node::Directive(DirectiveNode {
                    raw: tag.text,
                    body: &tag.text[2..tag.text.len() - 2],
                    self_closing: false,
                })),
                TagKind::Expression { body, self_closing } => {
                    let open = DirectiveNode {
                        raw: tag.text,
                        body,
                        self_closing,
                    };
                    if let Some((block, close)) = self.block(index, tags.end, open.clone()) {
                        nodes.push(Node::Block(block));
                        cursor = self.tags[close].end;
                        index = close;
                    } else {
                        nodes.push(Node::Directive(open));
                    }
                }
            }
            index += 1;
        }

        if cursor < span.end {
            nodes.push(Node::Literal(&self.text[cursor..span.end]));
        }

        nodes
    }

    /// Parses the block opened by the tag at `start`, looking for its closer
    /// before the tag index `end`. Returns the block and the closer's index.
    fn block(
        &self,
        start: usize,
        end: usize,
        open: DirectiveNode<'t>,
    ) -> Option<(BlockNode<'t>, usize)> {
        if open.self_closing {
            return None;
        }

        let token = block_token(open.body);
        let last = *self.last_close.get(token.as_str())?;
        if last <= start {
            return None;
        }

        let extent = match_block(&self.tags[start..end.min(last + 1)], &token)?;
        let (opener, close) = (start + extent.open, start + extent.close);
        let children = self.nodes(
            opener + 1..close,
            self.tags[opener].end..self.tags[close].start,
        );
        let else_split = if is_conditional(open.body) {
            children.iter().position(|node| matches!(node, Node::Else(_)))
        } else {
            None
        };

        Some((
            BlockNode {
                open,
                token,
                children,
                else_split,
            },
            close,
        ))
    }
}
