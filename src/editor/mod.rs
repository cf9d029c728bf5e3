//! Editor-side collaborators of the command completion engine
//!
//! The engine never talks to a concrete UI toolkit. Everything it needs from the
//! editor is expressed here:
//! - [`Document`]: the text buffer (a `ropey::Rope`) plus its identity
//! - [`Editor`]: caret, undo groups, decorations and diagnostics over one document
//! - [`DecorationHost`]: the decoration surface the session controller draws on
//! - [`InjectedRegion`]: offset translation for embedded-language fragments
//! - [`UiExecutor`]: the "run after the current dispatch cycle" task queue
//! - [`SyntaxLayer`]: "element at offset" over a (possibly synthetic) buffer

pub mod document;
pub mod executor;
pub mod host;
pub mod injection;
pub mod syntax;

pub use document::{Document, EditError, FileContext};
pub use executor::{UiExecutor, UiQueue, UiTask};
pub use host::{
    DecorationHost, Diagnostic, Editor, FilterId, Highlighter, HighlighterId, Inlay, InlayId, Severity,
};
pub use injection::InjectedRegion;
pub use syntax::{ElementKind, SyntaxElement, SyntaxLayer, SyntaxTree, WordSyntax};
