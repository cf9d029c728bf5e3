//! Completion request and applicability checks
//!
//! Before scanning for a trigger the engine decides whether a session may
//! open at all, and if so which text it works on: the host buffer, or the
//! injected fragment under the caret (with its own offset space).

use ropey::Rope;
use serde::Serialize;
use tracing::trace;

use crate::commands::{LanguageRegistry, LanguageSupport};
use crate::editor::{Editor, FileContext, InjectedRegion, SyntaxLayer};

/// How completion was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompletionKind {
    /// Implicit (auto-popup) or explicit basic completion
    Basic,
    /// Type-aware completion
    Smart,
    /// Completion of class/type names
    TypeName,
}

/// State of background indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexingState {
    Ready,
    /// Semantic queries are blocked until indexing finishes
    Indexing,
}

/// One completion invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Host-buffer offset of the caret
    pub offset: usize,
    pub kind: CompletionKind,
    pub indexing: IndexingState,
}

impl CompletionRequest {
    pub fn basic(offset: usize) -> Self {
        Self {
            offset,
            kind: CompletionKind::Basic,
            indexing: IndexingState::Ready,
        }
    }

    /// Basic completion at the editor caret
    pub fn at_caret(editor: &Editor) -> Self {
        Self::basic(editor.caret())
    }

    pub fn with_kind(mut self, kind: CompletionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_indexing(mut self, indexing: IndexingState) -> Self {
        self.indexing = indexing;
        self
    }
}

/// Why no session was opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Rejection {
    Disabled,
    EphemeralBuffer,
    UnsupportedKind(CompletionKind),
    IndexingInProgress,
    /// The caret sits in an injected fragment whose language does not allow it
    InjectedRegion(String),
    UnknownLanguage(String),
    OffsetOutOfBounds,
    /// The caret is immediately followed by an identifier character
    InsideIdentifier,
}

/// The text a session works on
#[derive(Debug, Clone)]
pub struct CompletionTarget {
    pub file: FileContext,
    /// Host text, or the fragment text for injected sessions
    pub text: Rope,
    /// Caret in `text` coordinates
    pub offset: usize,
    pub injection: Option<InjectedRegion>,
}

impl CompletionTarget {
    pub fn language(&self) -> &str {
        &self.file.language
    }

    /// Maps an offset in `text` back to the host buffer
    pub fn to_host(&self, local: usize) -> usize {
        match &self.injection {
            Some(region) => region.to_host(local),
            None => local,
        }
    }

    /// Distance between `text` offsets and host offsets
    pub fn host_shift(&self) -> usize {
        self.injection
            .as_ref()
            .map_or(0, |region| region.host_range().start)
    }

    pub fn is_injected(&self) -> bool {
        self.injection.is_some()
    }
}

/// Checks every precondition and resolves the session target
///
/// # Arguments
/// * `editor` - Host editor
/// * `request` - The completion invocation
/// * `enabled` - Current value of the feature flag
/// * `languages` - Per-language trigger support
/// * `syntax` - Used for the identifier-character test
pub fn resolve_target<'r>(
    editor: &Editor,
    request: &CompletionRequest,
    enabled: bool,
    languages: &'r LanguageRegistry,
    syntax: &dyn SyntaxLayer,
) -> Result<(CompletionTarget, &'r LanguageSupport), Rejection> {
    if !enabled {
        return Err(Rejection::Disabled);
    }
    let document = editor.document();
    if document.is_ephemeral() {
        return Err(Rejection::EphemeralBuffer);
    }
    if request.kind != CompletionKind::Basic {
        return Err(Rejection::UnsupportedKind(request.kind));
    }
    if request.indexing == IndexingState::Indexing {
        return Err(Rejection::IndexingInProgress);
    }
    if request.offset > document.len_chars() {
        return Err(Rejection::OffsetOutOfBounds);
    }

    let (target, support) = match document.injection_at(request.offset) {
        Some(region) => {
            let language = region.language().to_string();
            let support = languages
                .get(&language)
                .filter(|support| support.config.supports_injected)
                .ok_or_else(|| Rejection::InjectedRegion(language.clone()))?;
            let offset = region
                .from_host(request.offset)
                .ok_or(Rejection::OffsetOutOfBounds)?;
            trace!(
                "Completing inside injected '{}' fragment at local offset {}",
                language, offset
            );
            let target = CompletionTarget {
                file: FileContext {
                    uri: document.uri().clone(),
                    language,
                },
                text: region.text_in(document.text()),
                offset,
                injection: Some(region.clone()),
            };
            (target, support)
        }
        None => {
            let support = languages
                .get(document.language())
                .ok_or_else(|| Rejection::UnknownLanguage(document.language().to_string()))?;
            let target = CompletionTarget {
                file: document.file_context(),
                text: document.text().clone(),
                offset: request.offset,
                injection: None,
            };
            (target, support)
        }
    };

    if let Some(next) = target.text.get_char(target.offset) {
        if syntax.is_identifier_char(next) {
            return Err(Rejection::InsideIdentifier);
        }
    }
    Ok((target, support))
}
