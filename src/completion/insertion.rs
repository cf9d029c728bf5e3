//! Committing a trigger command
//!
//! Commit removes the trigger (and any filter text after it) from the real
//! buffer, moves the caret to where the trigger started, then schedules the
//! command on the UI context as one named undo step. The commit is abandoned,
//! with the buffer unchanged, when the trigger is gone or the UI queue is closed.

use std::ops::Range;

use thiserror::Error;
use tracing::{debug, trace, warn};

use super::entry::PopupEntry;
use crate::editor::{Editor, InjectedRegion, UiExecutor};
use crate::trigger::scan;

/// Name of the undo step that removes the trigger text
pub const REMOVE_TRIGGER_STEP: &str = "Remove command trigger";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("no trigger found before offset {offset}")]
    TriggerNotFound { offset: usize },

    #[error("trigger range {start}..{end} is no longer valid (buffer length {len})")]
    StaleRange { start: usize, end: usize, len: usize },

    #[error("buffer text at {start} no longer starts with the trigger")]
    TextMismatch { start: usize },

    #[error("no command at index {0}")]
    NoSuchEntry(usize),

    #[error("no command named '{0}'")]
    NoSuchCommand(String),

    #[error("UI queue is closed; the command cannot run")]
    ExecutorClosed,

    #[error("session is already closed")]
    SessionClosed,
}

/// Where the trigger is, for one commit
#[derive(Debug, Clone, Copy)]
pub struct CommitTarget<'a> {
    /// Fragment the session runs in, when it was opened inside an injection
    pub injection: Option<&'a InjectedRegion>,
    /// Configured trigger suffix, used to rescan plain buffers when the
    /// entry's insertion suffix is not found
    pub suffix: &'a str,
}

/// Removes the trigger for `entry` and schedules its command
///
/// # Returns
/// Host offset the command will run at
pub fn commit_entry(
    editor: &mut Editor,
    entry: &PopupEntry,
    target: CommitTarget<'_>,
    executor: &UiExecutor,
) -> Result<usize, CommitError> {
    if executor.is_closed() {
        return Err(CommitError::ExecutorClosed);
    }
    let range = trigger_range(editor, entry, target)?;
    let start = range.start;

    editor.transact(REMOVE_TRIGGER_STEP, |ed| {
        ed.remove(range.clone()).map_err(|_| CommitError::StaleRange {
            start: range.start,
            end: range.end,
            len: ed.text().len_chars(),
        })?;
        ed.set_caret(start);
        Ok::<(), CommitError>(())
    })?;
    debug!(
        "Removed trigger {}..{} for '{}'",
        range.start,
        range.end,
        entry.name()
    );

    let name = entry.name().to_string();
    let action = entry.descriptor.action();
    let file = editor.document().file_context();
    let scheduled = executor.invoke_later(name.clone(), move |ed: &mut Editor| {
        ed.transact(&name, |ed| action.execute(start, &file, ed));
    });
    if !scheduled {
        // Queue closed after the check above; put the trigger back.
        warn!("Command '{}' was not scheduled; restoring trigger", entry.name());
        editor.undo();
        return Err(CommitError::ExecutorClosed);
    }
    Ok(start)
}

/// Resolves and validates the host range to delete
fn trigger_range(editor: &Editor, entry: &PopupEntry, target: CommitTarget<'_>) -> Result<Range<usize>, CommitError> {
    let caret = editor.caret();
    let len = editor.text().len_chars();

    let start = match target.injection {
        Some(_) => {
            // The fragment's offset space is gone once we edit the host; the
            // recorded host offset is authoritative.
            trace!(
                "Using recorded host offset {} for injected commit",
                entry.host_start_offset
            );
            entry.host_start_offset
        }
        None => {
            // Prefer the full insertion suffix (trigger plus filter character).
            let found = scan(editor.text(), caret, &entry.trigger_suffix)
                .filter(|m| m.is_full())
                .or_else(|| scan(editor.text(), caret, target.suffix))
                .ok_or(CommitError::TriggerNotFound { offset: caret })?;
            caret - found.span_len()
        }
    };

    if start > caret || caret > len {
        return Err(CommitError::StaleRange {
            start,
            end: caret,
            len,
        });
    }

    if let Some(first) = entry.trigger_suffix.chars().next() {
        if editor.text().get_char(start) != Some(first) {
            return Err(CommitError::TextMismatch { start });
        }
    }
    Ok(start..caret)
}
