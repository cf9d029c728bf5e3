//! Trigger-free view of a buffer
//!
//! Providers decide applicability on a synthetic copy of the buffer in which
//! the trigger (and any filter text typed after it) has been excised, so the
//! syntax layer sees the code as if the user had never typed the trigger.
//! The derived buffer is read-only and never written back.

use ropey::Rope;
use tracing::trace;

use super::scanner::TriggerMatch;

/// Buffer with the trigger span removed, plus the caret mapped into it
#[derive(Debug, Clone)]
pub struct DerivedBuffer {
    pub text: Rope,
    /// Where the trigger started; the caret position in the derived text
    pub offset: usize,
}

/// Excises the trigger span ending at `trigger_offset`
///
/// # Arguments
/// * `original` - The real buffer
/// * `trigger_offset` - Caret position the match was computed at
/// * `trigger` - Match returned by [`scan`](super::scan)
///
/// # Returns
/// `None` when there is no content before the trigger
pub fn build_derived(original: &Rope, trigger_offset: usize, trigger: &TriggerMatch) -> Option<DerivedBuffer> {
    if trigger_offset > original.len_chars() {
        return None;
    }
    let span = trigger.span_len();
    if span >= trigger_offset {
        trace!(
            "No content before trigger (offset {}, span {})",
            trigger_offset, span
        );
        return None;
    }
    let adjusted = trigger_offset - span;

    // Rope clones share structure; only the edited path is copied.
    let mut text = original.clone();
    text.remove(adjusted..trigger_offset);

    Some(DerivedBuffer {
        text,
        offset: adjusted,
    })
}
