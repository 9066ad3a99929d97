//! # Block extent matching
//!
//! Given the tags of a template, finds the closing tag that pairs with the
//! first opener of a token. Same-named blocks may nest, so the matcher counts
//! every opener and closer for the token and stops at the first point where
//! the two counts are equal:
//!
//! ```text
//! {{friend}}{{friend}}{{name}}{{/friend}}{{/friend}}
//! opens:  1         2                  2          2
//! closes: 0         0                  1          2  <- match
//! ```
//!
//! When the counts never meet, the first opener is paired with the last
//! closer, so `{{.|reverse}}{{.|upcase}}{{/.}}` is one block whose body is
//! `{{.|upcase}}`. Without any closer there is no block.

use crate::directive::{Tag, TagKind};

#[cfg(test)]
#[path = "block_tests.rs"]
mod tests;

/// Positions of a matched block's opening and closing tags within the
/// searched tag slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockExtent {
    pub open: usize,
    pub close: usize,
}

/// Finds the block opened by the first `token` opener in `tags`.
///
/// Returns `None` when there is no opener for `token`, or no closer after
/// it (the caller then treats the opener as a plain tag).
pub fn match_block(tags: &[Tag<'_>], token: &str) -> Option<BlockExtent> {
    let mut opens = 0usize;
    let mut closes = 0usize;
    let mut first_open: Option<usize> = None;
    let mut last_close: Option<usize> = None;

    for (index, tag) in tags.iter().enumerate() {
        match tag.kind() {
            TagKind::Close(name) if name == token => {
                if first_open.is_none() {
                    continue;
                }
                closes += 1;
                last_close = Some(index);
            }
            TagKind::Expression {
                self_closing: false,
                ..
            } if tag.opening_token().as_deref() == Some(token) => {
                if first_open.is_none() {
                    first_open = Some(index);
                }
                opens += 1;
            }
            _ => continue,
        }

        if opens == closes {
            return Some(BlockExtent {
                open: first_open?,
                close: index,
            });
        }
    }

    // More openers than closers: the first opener takes the last closer.
    let (open, close) = first_open.zip(last_close)?;
    Some(BlockExtent { open, close })
}
