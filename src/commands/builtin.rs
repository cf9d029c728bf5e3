//! Language-independent providers for plain text buffers

use std::ops::Range;
use std::sync::Arc;

use ropey::Rope;
use tracing::{debug, warn};

use super::descriptor::{CommandDescriptor, HighlightSpec};
use super::provider::{CommandProvider, ProviderContext, ProviderError};
use super::registry::CommandProviderRegistry;
use crate::editor::{Editor, ElementKind, FileContext};

/// Style key for the element a built-in command will act on
pub const TARGET_STYLE: &str = "command.target";

/// Registry with every built-in provider, in display order
pub fn default_providers(comment_token: &str) -> CommandProviderRegistry {
    let mut registry = CommandProviderRegistry::new();
    registry.register(Arc::new(SurroundWithProvider));
    registry.register(Arc::new(UpperCaseProvider));
    registry.register(Arc::new(CommentLineProvider::new(comment_token)));
    registry
}

/// Identifier run ending at `offset` in the live buffer
fn word_before(text: &Rope, offset: usize) -> Range<usize> {
    let offset = offset.min(text.len_chars());
    let mut start = offset;
    while start > 0 {
        let c = text.char(start - 1);
        if !(c.is_alphanumeric() || c == '_') {
            break;
        }
        start -= 1;
    }
    start..offset
}

/// Wraps the expression before the trigger in parentheses
pub struct SurroundWithProvider;

impl CommandProvider for SurroundWithProvider {
    fn name(&self) -> &str {
        "surround-with"
    }

    fn commands(&self, ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError> {
        let Some(element) = ctx.element_at_caret() else {
            return Ok(vec![]);
        };
        if element.kind == ElementKind::Other || element.range.end != ctx.derived_offset() {
            return Ok(vec![]);
        }

        let command = CommandDescriptor::from_fn("surroundWith", surround_with)
            .with_icon("surround")
            .with_priority(10)
            .with_highlight(HighlightSpec::new(element.range, TARGET_STYLE, 10));
        Ok(vec![command])
    }
}

fn surround_with(offset: usize, _file: &FileContext, editor: &mut Editor) {
    let word = word_before(editor.text(), offset);
    if word.is_empty() {
        debug!("surroundWith: nothing to wrap at {}", offset);
        return;
    }
    let wrapped = editor
        .insert(word.end, ")")
        .and_then(|_| editor.insert(word.start, "("));
    match wrapped {
        Ok(()) => editor.set_caret(word.end + 2),
        Err(e) => warn!("surroundWith failed: {}", e),
    }
}

/// Upper-cases the identifier before the trigger
pub struct UpperCaseProvider;

impl CommandProvider for UpperCaseProvider {
    fn name(&self) -> &str {
        "upper-case"
    }

    fn commands(&self, ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError> {
        let Some(element) = ctx.element_at_caret() else {
            return Ok(vec![]);
        };
        if element.kind != ElementKind::Identifier || !element.text.chars().any(char::is_lowercase) {
            return Ok(vec![]);
        }

        let command = CommandDescriptor::from_fn("upperCase", upper_case)
            .with_icon("text")
            .with_priority(5)
            .with_highlight(HighlightSpec::new(element.range, TARGET_STYLE, 5));
        Ok(vec![command])
    }
}

fn upper_case(offset: usize, _file: &FileContext, editor: &mut Editor) {
    let word = word_before(editor.text(), offset);
    if word.is_empty() {
        return;
    }
    let result = editor.remove(word.clone()).and_then(|removed| {
        editor.insert(word.start, &removed.to_uppercase())
    });
    if let Err(e) = result {
        warn!("upperCase failed: {}", e);
    }
}

/// Prefixes the current line with a line comment
pub struct CommentLineProvider {
    token: String,
}

impl CommentLineProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl CommandProvider for CommentLineProvider {
    fn name(&self) -> &str {
        "comment-line"
    }

    fn commands(&self, ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError> {
        ctx.check_cancelled()?;
        let prefix = format!("{} ", self.token);
        let command = CommandDescriptor::from_fn(
            "commentLine",
            move |offset: usize, _file: &FileContext, editor: &mut Editor| {
                let text = editor.text();
                let line = text.char_to_line(offset.min(text.len_chars()));
                let line_start = text.line_to_char(line);
                if let Err(e) = editor.insert(line_start, &prefix) {
                    warn!("commentLine failed: {}", e);
                }
            },
        )
        .with_icon("comment");
        Ok(vec![command])
    }
}
