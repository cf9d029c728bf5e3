//! Pluggable command providers
//!
//! A provider inspects the trigger-free view of the buffer and offers zero or
//! more commands for the element at the caret. Providers are registered per
//! language and may run off the UI thread.
//!
//! # Example
//!
//! ```rust,ignore
//! struct RenameProvider;
//!
//! impl CommandProvider for RenameProvider {
//!     fn name(&self) -> &str {
//!         "rename"
//!     }
//!
//!     fn commands(&self, ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError> {
//!         let Some(element) = ctx.element_at_caret() else {
//!             return Ok(vec![]);
//!         };
//!         Ok(vec![CommandDescriptor::from_fn("rename", move |offset, file, editor| {
//!             // ...
//!         })])
//!     }
//! }
//! ```

use std::sync::Arc;

use ropey::Rope;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::descriptor::CommandDescriptor;
use crate::editor::{FileContext, SyntaxElement, SyntaxTree};
use crate::trigger::DerivedBuffer;

/// Why a provider produced no commands
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider cannot operate on synthetic buffers. Expected, not logged.
    #[error("provider does not support derived buffers")]
    Unsupported,

    /// The session was cancelled while the provider was running.
    #[error("command collection cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Derived buffer together with its syntax tree
#[derive(Clone)]
pub struct DerivedView {
    pub buffer: DerivedBuffer,
    pub tree: Arc<dyn SyntaxTree>,
}

impl std::fmt::Debug for DerivedView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedView")
            .field("offset", &self.buffer.offset)
            .field("len", &self.buffer.text.len_chars())
            .finish_non_exhaustive()
    }
}

/// Everything a provider may look at
pub struct ProviderContext<'a> {
    pub file: &'a FileContext,
    /// Trigger-free view; the only view providers should analyze
    pub derived: &'a DerivedView,
    /// The real buffer (fragment text when completing inside an injection)
    pub original_text: &'a Rope,
    pub original_offset: usize,
    pub cancel: &'a CancellationToken,
}

impl<'a> ProviderContext<'a> {
    pub fn derived_text(&self) -> &Rope {
        &self.derived.buffer.text
    }

    pub fn derived_offset(&self) -> usize {
        self.derived.buffer.offset
    }

    /// Element right before the excised trigger
    pub fn element_at_caret(&self) -> Option<SyntaxElement> {
        self.derived.tree.element_at(self.derived.buffer.offset)
    }

    /// Returns [`ProviderError::Cancelled`] once the session is cancelled
    pub fn check_cancelled(&self) -> Result<(), ProviderError> {
        if self.cancel.is_cancelled() {
            Err(ProviderError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Source of trigger commands for one language
pub trait CommandProvider: Send + Sync {
    /// Unique name, used for logging and registry management
    fn name(&self) -> &str;

    /// Commands applicable at the caret
    ///
    /// Long-running providers should call [`ProviderContext::check_cancelled`]
    /// periodically.
    fn commands(&self, ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{SyntaxLayer, WordSyntax};
    use crate::trigger::{build_derived, scan};
    use url::Url;

    #[test]
    fn test_context_accessors() {
        let rope = Rope::from_str("call foo.");
        let m = scan(&rope, 9, ".").unwrap();
        let buffer = build_derived(&rope, 9, &m).unwrap();
        let tree = WordSyntax.parse("text", &buffer.text);
        let derived = DerivedView { buffer, tree };
        let file = FileContext {
            uri: Url::parse("file:///tmp/p.txt").unwrap(),
            language: "text".to_string(),
        };
        let cancel = CancellationToken::new();
        let ctx = ProviderContext {
            file: &file,
            derived: &derived,
            original_text: &rope,
            original_offset: 9,
            cancel: &cancel,
        };

        assert_eq!(ctx.derived_offset(), 8);
        assert_eq!(ctx.element_at_caret().unwrap().text, "foo");
        assert!(ctx.check_cancelled().is_ok());
        cancel.cancel();
        assert!(matches!(ctx.check_cancelled(), Err(ProviderError::Cancelled)));
    }
}
