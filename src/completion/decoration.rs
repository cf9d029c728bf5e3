//! Transient decorations tied to one popup
//!
//! While a trigger command is selected the buffer shows:
//! - a prompt highlight over the trigger text (`[prompt_start, caret)`)
//! - provider highlights for the selected command, clipped to the prompt start
//! - an icon inlay at the trigger start
//! - suppression of error markers inside the prompt range (the trigger is
//!   usually a syntax error until the command runs)
//! - at most once per popup, a usage hint right after the trigger character
//!
//! Every handle is owned by [`DecorationState`] and released exactly once.

use std::ops::Range;

use tracing::trace;

use super::entry::PopupEntry;
use super::hint::{UsageHintCounter, HINT_TEXT};
use crate::commands::HighlightSpec;
use crate::editor::{DecorationHost, FilterId, HighlighterId, Inlay, InlayId};

/// Style key of the prompt highlight
pub const PROMPT_STYLE: &str = "command.prompt";

/// Layer of the prompt highlight; above provider highlights
pub const PROMPT_LAYER: i32 = 6001;

/// Provider highlights are layered at this base plus their priority
pub const SECONDARY_LAYER_BASE: i32 = 5000;

const DEFAULT_ICON: &str = "command";

/// Popup behavior switches installed on the first relevant event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupBehavior {
    /// Commands are matched against the filter typed after the trigger
    pub command_matcher: bool,
    /// Close the popup when nothing matches
    pub hide_when_empty: bool,
}

impl Default for PopupBehavior {
    fn default() -> Self {
        Self {
            command_matcher: false,
            hide_when_empty: true,
        }
    }
}

/// Where the prompt and icon go for the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLayout {
    pub prompt_start: usize,
    pub caret: usize,
    pub icon_offset: usize,
}

impl PromptLayout {
    fn range(&self) -> Range<usize> {
        self.prompt_start..self.caret.max(self.prompt_start)
    }
}

#[derive(Debug, Default)]
pub struct DecorationState {
    matcher_installed: bool,
    hint_installed: bool,
    prompt: Option<HighlighterId>,
    secondary: Vec<HighlighterId>,
    icon: Option<InlayId>,
    hint: Option<InlayId>,
    problem_filter: Option<FilterId>,
}

impl DecorationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the command matcher and keeps the popup open on empty results
    ///
    /// Idempotent; returns `true` only on the first call.
    pub fn install(&mut self, popup: &mut PopupBehavior) -> bool {
        if self.matcher_installed {
            return false;
        }
        popup.command_matcher = true;
        popup.hide_when_empty = false;
        self.matcher_installed = true;
        trace!("Installed command matcher on popup");
        true
    }

    pub fn matcher_installed(&self) -> bool {
        self.matcher_installed
    }

    /// Redraws decorations for a newly selected command
    pub fn show_entry(&mut self, host: &mut dyn DecorationHost, entry: &PopupEntry, layout: PromptLayout) {
        self.clear(host);

        let prompt = layout.range();
        self.prompt = Some(host.add_highlighter(prompt.clone(), PROMPT_STYLE, PROMPT_LAYER));
        if !prompt.is_empty() {
            self.problem_filter = Some(host.suppress_problems(prompt));
        }

        self.show_highlights(host, &entry.highlights, layout.prompt_start);

        let glyph = entry.icon().unwrap_or(DEFAULT_ICON).to_string();
        self.icon = Some(host.add_inlay(layout.icon_offset, Inlay::Icon(glyph)));
        trace!(
            "Decorated '{}' (prompt {}..{}, {} secondary)",
            entry.name(),
            layout.prompt_start,
            layout.caret,
            self.secondary.len()
        );
    }

    /// Paints provider highlights in ascending priority, so the highest
    /// priority lands last, on top
    fn show_highlights(&mut self, host: &mut dyn DecorationHost, highlights: &[HighlightSpec], prompt_start: usize) {
        let mut sorted: Vec<_> = highlights.iter().collect();
        sorted.sort_by_key(|h| h.priority);
        for spec in sorted {
            let end = spec.range.end.min(prompt_start);
            if spec.range.start < end {
                self.secondary.push(host.add_highlighter(
                    spec.range.start..end,
                    &spec.style_key,
                    SECONDARY_LAYER_BASE + spec.priority,
                ));
            }
        }
    }

    /// Shows the usage hint if this popup has not shown it yet
    ///
    /// # Returns
    /// `true` if the hint was displayed
    pub fn maybe_show_hint(
        &mut self,
        host: &mut dyn DecorationHost,
        counter: &UsageHintCounter,
        trigger_start: usize,
        caret: usize,
    ) -> bool {
        if self.hint_installed
            || !counter.should_show()
            || caret != trigger_start + 1
            || host.has_inlay_at(caret)
        {
            return false;
        }
        self.hint = Some(host.add_inlay(caret, Inlay::Hint(HINT_TEXT.to_string())));
        self.hint_installed = true;
        let shown = counter.record_shown();
        trace!("Displayed usage hint ({} of {})", shown, counter.threshold());
        true
    }

    /// Takes the usage hint off the buffer; it is not shown again this popup
    pub fn dismiss_hint(&mut self, host: &mut dyn DecorationHost) {
        if let Some(id) = self.hint.take() {
            host.remove_inlay(id);
            trace!("Dismissed usage hint");
        }
    }

    /// Removes selection-scoped decorations (selection moved off a command)
    pub fn clear(&mut self, host: &mut dyn DecorationHost) {
        if let Some(id) = self.prompt.take() {
            host.remove_highlighter(id);
        }
        for id in self.secondary.drain(..) {
            host.remove_highlighter(id);
        }
        if let Some(id) = self.icon.take() {
            host.remove_inlay(id);
        }
        if let Some(id) = self.problem_filter.take() {
            host.restore_problems(id);
        }
    }

    /// Removes everything this popup put on the buffer
    pub fn teardown(&mut self, host: &mut dyn DecorationHost) {
        self.clear(host);
        self.dismiss_hint(host);
        trace!("Tore down popup decorations");
    }

    /// No handle is currently held
    pub fn is_clear(&self) -> bool {
        self.prompt.is_none()
            && self.secondary.is_empty()
            && self.icon.is_none()
            && self.hint.is_none()
            && self.problem_filter.is_none()
    }
}
