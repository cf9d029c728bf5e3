//! Syntax collaborator: locating the element at an offset
//!
//! Real language support plugs in its own parser through [`SyntaxLayer`]. The
//! engine only needs "parse this (possibly synthetic) text" and "what element
//! sits at this offset". [`WordSyntax`] is the plain-text fallback: elements are
//! runs of identifier characters.

use std::ops::Range;
use std::sync::Arc;

use ropey::Rope;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementKind {
    Identifier,
    Number,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxElement {
    pub kind: ElementKind,
    pub range: Range<usize>,
    pub text: String,
}

/// A parsed view of one buffer
pub trait SyntaxTree: Send + Sync {
    /// Element whose range touches `offset`
    ///
    /// When two elements touch the offset, the one ending at it wins: the
    /// caret sits right after the expression the user just typed.
    fn element_at(&self, offset: usize) -> Option<SyntaxElement>;
}

/// Parser front-end for one or more languages
pub trait SyntaxLayer: Send + Sync {
    fn parse(&self, language: &str, text: &Rope) -> Arc<dyn SyntaxTree>;

    fn is_identifier_char(&self, c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }
}

/// Plain-text syntax: identifier and number runs
#[derive(Debug, Default, Clone, Copy)]
pub struct WordSyntax;

struct WordTree {
    text: Rope,
}

impl SyntaxLayer for WordSyntax {
    fn parse(&self, _language: &str, text: &Rope) -> Arc<dyn SyntaxTree> {
        Arc::new(WordTree { text: text.clone() })
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl SyntaxTree for WordTree {
    fn element_at(&self, offset: usize) -> Option<SyntaxElement> {
        let len = self.text.len_chars();
        if offset > len {
            return None;
        }

        let anchor = if offset > 0 && is_word(self.text.char(offset - 1)) {
            offset - 1
        } else if offset < len && is_word(self.text.char(offset)) {
            offset
        } else {
            return None;
        };

        let mut start = anchor;
        while start > 0 && is_word(self.text.char(start - 1)) {
            start -= 1;
        }
        let mut end = anchor + 1;
        while end < len && is_word(self.text.char(end)) {
            end += 1;
        }

        let text = self.text.slice(start..end).to_string();
        let kind = if text.chars().all(|c| c.is_ascii_digit()) {
            ElementKind::Number
        } else if text.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_') {
            ElementKind::Identifier
        } else {
            ElementKind::Other
        };

        Some(SyntaxElement {
            kind,
            range: start..end,
            text,
        })
    }
}
