//! Reference editor: caret, undo groups, decorations and diagnostics
//!
//! [`Editor`] is the in-process stand-in for a UI editor component. It owns one
//! [`Document`] and exposes the capabilities the engine consumes: text edits
//! grouped into named undo steps, range highlighters, inlays and a problem
//! filter that hides error/warning markers inside a range.

use std::ops::Range;

use ropey::Rope;
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::document::{Document, EditError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HighlighterId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InlayId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FilterId(u64);

/// A range highlighter painted over the buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlighter {
    pub id: HighlighterId,
    pub range: Range<usize>,
    pub style_key: String,
    /// Paint order; higher layers are drawn on top
    pub layer: i32,
}

/// Inline element rendered between characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Inlay {
    Icon(String),
    Hint(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A problem marker produced by some analysis pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub range: Range<usize>,
    pub severity: Severity,
    pub message: String,
}

/// Decoration surface used by the session decoration controller
///
/// Every `add_*` returns a handle; removing a handle twice returns `false`
/// and leaves the host untouched.
pub trait DecorationHost {
    fn add_highlighter(&mut self, range: Range<usize>, style_key: &str, layer: i32) -> HighlighterId;
    fn remove_highlighter(&mut self, id: HighlighterId) -> bool;
    fn add_inlay(&mut self, offset: usize, inlay: Inlay) -> InlayId;
    fn remove_inlay(&mut self, id: InlayId) -> bool;
    fn has_inlay_at(&self, offset: usize) -> bool;
    /// Hides error/warning markers that intersect `range`
    fn suppress_problems(&mut self, range: Range<usize>) -> FilterId;
    fn restore_problems(&mut self, id: FilterId) -> bool;
}

#[derive(Debug, Clone)]
enum EditRecord {
    Insert { offset: usize, text: String },
    Remove { offset: usize, text: String },
}

/// One named undo step
#[derive(Debug, Clone)]
struct UndoGroup {
    name: String,
    edits: Vec<EditRecord>,
    caret_before: usize,
    caret_after: usize,
}

#[derive(Debug)]
pub struct Editor {
    document: Document,
    caret: usize,
    undo: Vec<UndoGroup>,
    redo: Vec<UndoGroup>,
    open_group: Option<UndoGroup>,
    /// Nesting depth of `transact` calls; inner calls join the outer group
    group_depth: usize,
    highlighters: Vec<Highlighter>,
    inlays: Vec<(InlayId, usize, Inlay)>,
    filters: Vec<(FilterId, Range<usize>)>,
    diagnostics: Vec<Diagnostic>,
    next_handle: u64,
}

impl Editor {
    pub fn new(document: Document) -> Self {
        let caret = document.len_chars();
        Self {
            document,
            caret,
            undo: Vec::new(),
            redo: Vec::new(),
            open_group: None,
            group_depth: 0,
            highlighters: Vec::new(),
            inlays: Vec::new(),
            filters: Vec::new(),
            diagnostics: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn text(&self) -> &Rope {
        self.document.text()
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Moves the caret, clamping to the buffer length
    pub fn set_caret(&mut self, offset: usize) {
        self.caret = offset.min(self.document.len_chars());
    }

    /// Inserts `c` at the caret as a single typing step and advances the caret
    pub fn type_char(&mut self, c: char) {
        let at = self.caret;
        let mut buf = [0u8; 4];
        let text: &str = c.encode_utf8(&mut buf);
        let typed = self.transact("Typing", |ed| {
            ed.insert(at, text)?;
            ed.caret = at + 1;
            Ok::<(), EditError>(())
        });
        if let Err(e) = typed {
            warn!("Dropped keystroke {:?}: {}", c, e);
        }
    }

    /// Runs `f` as one named undo step
    ///
    /// Edits made by `f` (and by nested `transact` calls) are undone and
    /// redone together. An empty group is discarded.
    pub fn transact<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        if self.group_depth == 0 {
            self.open_group = Some(UndoGroup {
                name: name.to_string(),
                edits: Vec::new(),
                caret_before: self.caret,
                caret_after: self.caret,
            });
        }
        self.group_depth += 1;
        let result = f(self);
        self.group_depth -= 1;

        if self.group_depth == 0 {
            if let Some(mut group) = self.open_group.take() {
                if !group.edits.is_empty() {
                    group.caret_after = self.caret;
                    debug!("Recorded undo step '{}' ({} edits)", group.name, group.edits.len());
                    self.undo.push(group);
                    self.redo.clear();
                }
            }
        }
        result
    }

    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), EditError> {
        self.document.insert(offset, text)?;
        let len = text.chars().count();
        if self.caret > offset {
            self.caret += len;
        }
        self.shift_decorations(offset, len as isize);
        self.record(EditRecord::Insert {
            offset,
            text: text.to_string(),
        });
        Ok(())
    }

    pub fn remove(&mut self, range: Range<usize>) -> Result<String, EditError> {
        let removed = self.document.remove(range.clone())?;
        let len = range.end - range.start;
        if self.caret >= range.end {
            self.caret -= len;
        } else if self.caret > range.start {
            self.caret = range.start;
        }
        self.shift_decorations(range.start, -(len as isize));
        self.record(EditRecord::Remove {
            offset: range.start,
            text: removed.clone(),
        });
        Ok(removed)
    }

    fn record(&mut self, edit: EditRecord) {
        match self.open_group.as_mut() {
            Some(group) => group.edits.push(edit),
            None => {
                warn!("Edit made outside of a transaction; recording as its own undo step");
                self.undo.push(UndoGroup {
                    name: "Edit".to_string(),
                    edits: vec![edit],
                    caret_before: self.caret,
                    caret_after: self.caret,
                });
                self.redo.clear();
            }
        }
    }

    /// Name of the step `undo` would revert
    pub fn undo_name(&self) -> Option<&str> {
        self.undo.last().map(|g| g.name.as_str())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Reverts the most recent undo step
    pub fn undo(&mut self) -> bool {
        let Some(group) = self.undo.pop() else {
            return false;
        };
        for edit in group.edits.iter().rev() {
            self.apply_raw(&invert(edit));
        }
        self.caret = group.caret_before.min(self.document.len_chars());
        trace!("Undid '{}'", group.name);
        self.redo.push(group);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(group) = self.redo.pop() else {
            return false;
        };
        for edit in &group.edits {
            self.apply_raw(edit);
        }
        self.caret = group.caret_after.min(self.document.len_chars());
        trace!("Redid '{}'", group.name);
        self.undo.push(group);
        true
    }

    fn apply_raw(&mut self, edit: &EditRecord) {
        let outcome = match edit {
            EditRecord::Insert { offset, text } => self.document.insert(*offset, text),
            EditRecord::Remove { offset, text } => self
                .document
                .remove(*offset..*offset + text.chars().count())
                .map(|_| ()),
        };
        if let Err(e) = outcome {
            warn!("Undo history no longer matches the buffer: {}", e);
        }
    }

    /// Keeps decoration anchors attached to the text they decorate.
    fn shift_decorations(&mut self, at: usize, delta: isize) {
        let shift = |x: usize| -> usize {
            if delta >= 0 {
                if x > at { x + delta as usize } else { x }
            } else {
                let end = at + delta.unsigned_abs();
                if x >= end {
                    x - delta.unsigned_abs()
                } else if x > at {
                    at
                } else {
                    x
                }
            }
        };
        for h in &mut self.highlighters {
            h.range = shift(h.range.start)..shift(h.range.end);
        }
        for (_, offset, _) in &mut self.inlays {
            *offset = shift(*offset);
        }
        for (_, range) in &mut self.filters {
            *range = shift(range.start)..shift(range.end);
        }
    }

    pub fn highlighters(&self) -> &[Highlighter] {
        &self.highlighters
    }

    /// All highlighters painted with `style_key`
    pub fn highlighters_with_style(&self, style_key: &str) -> Vec<&Highlighter> {
        self.highlighters
            .iter()
            .filter(|h| h.style_key == style_key)
            .collect()
    }

    pub fn inlays(&self) -> impl Iterator<Item = (usize, &Inlay)> {
        self.inlays.iter().map(|(_, offset, inlay)| (*offset, inlay))
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Diagnostics not hidden by an installed problem filter
    pub fn visible_diagnostics(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| {
                !self
                    .filters
                    .iter()
                    .any(|(_, r)| d.range.start < r.end && r.start < d.range.end)
            })
            .collect()
    }

    pub fn problem_filter_count(&self) -> usize {
        self.filters.len()
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

fn invert(edit: &EditRecord) -> EditRecord {
    match edit {
        EditRecord::Insert { offset, text } => EditRecord::Remove {
            offset: *offset,
            text: text.clone(),
        },
        EditRecord::Remove { offset, text } => EditRecord::Insert {
            offset: *offset,
            text: text.clone(),
        },
    }
}

impl DecorationHost for Editor {
    fn add_highlighter(&mut self, range: Range<usize>, style_key: &str, layer: i32) -> HighlighterId {
        let id = HighlighterId(self.next_handle());
        self.highlighters.push(Highlighter {
            id,
            range,
            style_key: style_key.to_string(),
            layer,
        });
        id
    }

    fn remove_highlighter(&mut self, id: HighlighterId) -> bool {
        let before = self.highlighters.len();
        self.highlighters.retain(|h| h.id != id);
        before != self.highlighters.len()
    }

    fn add_inlay(&mut self, offset: usize, inlay: Inlay) -> InlayId {
        let id = InlayId(self.next_handle());
        self.inlays.push((id, offset, inlay));
        id
    }

    fn remove_inlay(&mut self, id: InlayId) -> bool {
        let before = self.inlays.len();
        self.inlays.retain(|(i, _, _)| *i != id);
        before != self.inlays.len()
    }

    fn has_inlay_at(&self, offset: usize) -> bool {
        self.inlays.iter().any(|(_, o, _)| *o == offset)
    }

    fn suppress_problems(&mut self, range: Range<usize>) -> FilterId {
        let id = FilterId(self.next_handle());
        self.filters.push((id, range));
        id
    }

    fn restore_problems(&mut self, id: FilterId) -> bool {
        let before = self.filters.len();
        self.filters.retain(|(i, _)| *i != id);
        before != self.filters.len()
    }
}
