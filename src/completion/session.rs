//! A live trigger-completion session
//!
//! The session owns the ranked entries, the filter pattern typed after the
//! trigger and the decorations drawn for the current selection. It ends in
//! exactly one of two ways, commit or cancel, and both tear down every
//! decoration before returning.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::context::CompletionTarget;
use super::decoration::{DecorationState, PopupBehavior, PromptLayout};
use super::entry::{EntrySummary, PopupEntry};
use super::hint::UsageHintCounter;
use super::insertion::{commit_entry, CommitError, CommitTarget};
use super::ranking::{rank_items, LookupItem, RankingCriteria, RerankContext, Reranker};
use crate::editor::{Editor, SyntaxLayer, UiExecutor};
use crate::trigger::{MatchKind, TriggerConfig, TriggerMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Displayed,
    Committed,
    Cancelled,
}

/// What the caller should do after a keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystrokeOutcome {
    /// Same session, narrower list
    Refilter,
    /// Session closed; attempt completion again at the new caret
    Restart,
}

pub struct CommandSession {
    target: CompletionTarget,
    config: TriggerConfig,
    trigger: TriggerMatch,
    /// Host offset of the first trigger character
    trigger_start: usize,
    entries: Vec<PopupEntry>,
    /// Indices into `entries` matching the pattern
    visible: Vec<usize>,
    pattern: String,
    selected: Option<usize>,
    popup: PopupBehavior,
    decorations: DecorationState,
    phase: SessionPhase,
    executor: UiExecutor,
    syntax: Arc<dyn SyntaxLayer>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl std::fmt::Debug for CommandSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSession")
            .field("language", &self.target.language())
            .field("trigger_start", &self.trigger_start)
            .field("pattern", &self.pattern)
            .field("entries", &self.entries.len())
            .field("visible", &self.visible.len())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Case-insensitive subsequence match of `pattern` in `name`
fn matches_pattern(name: &str, pattern: &str) -> bool {
    let mut name = name.chars().flat_map(char::to_lowercase);
    pattern
        .chars()
        .flat_map(char::to_lowercase)
        .all(|p| name.any(|n| n == p))
}

impl CommandSession {
    /// Builds a session over already ranked entries
    pub(crate) fn new(
        target: CompletionTarget,
        config: TriggerConfig,
        trigger: TriggerMatch,
        entries: Vec<PopupEntry>,
        executor: UiExecutor,
        syntax: Arc<dyn SyntaxLayer>,
        reranker: Option<Arc<dyn Reranker>>,
    ) -> Self {
        let trigger_start = target.to_host(target.offset - trigger.span_len());
        let pattern = trigger.preceding_pattern.clone();
        let mut session = Self {
            target,
            config,
            trigger,
            trigger_start,
            entries,
            visible: Vec::new(),
            pattern,
            selected: None,
            popup: PopupBehavior::default(),
            decorations: DecorationState::new(),
            phase: SessionPhase::Displayed,
            executor,
            syntax,
            reranker,
        };
        session.visible = session.matching_indices();
        session
    }

    /// Installs the popup matcher, selects the first entry and shows the hint
    pub(crate) fn display(&mut self, editor: &mut Editor, hints: &UsageHintCounter) {
        self.decorations.install(&mut self.popup);
        let first = if self.visible.is_empty() { None } else { Some(0) };
        self.select(editor, first);
        let caret = editor.caret();
        self.decorations
            .maybe_show_hint(editor, hints, self.trigger_start, caret);
    }

    fn matching_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| matches_pattern(entry.name(), &self.pattern))
            .map(|(i, _)| i)
            .collect()
    }

    /// Entries currently visible in the popup, best first
    pub fn commands(&self) -> Vec<&PopupEntry> {
        self.visible.iter().map(|&i| &self.entries[i]).collect()
    }

    pub fn summaries(&self) -> Vec<EntrySummary<'_>> {
        self.commands().into_iter().map(PopupEntry::summary).collect()
    }

    /// Index of the visible entry called `name`
    pub fn find(&self, name: &str) -> Option<usize> {
        self.commands().iter().position(|entry| entry.name() == name)
    }

    pub fn selected(&self) -> Option<&PopupEntry> {
        self.selected
            .and_then(|i| self.visible.get(i))
            .map(|&i| &self.entries[i])
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == SessionPhase::Displayed
    }

    pub fn trigger(&self) -> &TriggerMatch {
        &self.trigger
    }

    pub fn trigger_start(&self) -> usize {
        self.trigger_start
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn target(&self) -> &CompletionTarget {
        &self.target
    }

    pub fn popup(&self) -> PopupBehavior {
        self.popup
    }

    pub fn decorations(&self) -> &DecorationState {
        &self.decorations
    }

    fn layout(&self, editor: &Editor) -> PromptLayout {
        let icon_offset = self
            .target
            .injection
            .as_ref()
            .map_or(self.trigger_start, |region| region.to_host(0));
        PromptLayout {
            prompt_start: self.trigger_start,
            caret: editor.caret(),
            icon_offset,
        }
    }

    /// Moves the selection to visible entry `index`, or off the commands
    ///
    /// # Returns
    /// `true` if a command is selected afterwards
    pub fn select(&mut self, editor: &mut Editor, index: Option<usize>) -> bool {
        if !self.is_open() {
            return false;
        }
        match index.filter(|&i| i < self.visible.len()) {
            Some(i) => {
                self.selected = Some(i);
                let layout = self.layout(editor);
                let entry = &self.entries[self.visible[i]];
                self.decorations.show_entry(editor, entry, layout);
                true
            }
            None => {
                self.selected = None;
                self.decorations.clear(editor);
                false
            }
        }
    }

    /// Types `c` into the editor and updates the session
    ///
    /// A palindromic second trigger character upgrades a partial trigger;
    /// identifier characters extend the filter. Anything else closes the
    /// session and asks the caller to restart completion.
    pub fn type_char(&mut self, editor: &mut Editor, c: char) -> KeystrokeOutcome {
        if !self.is_open() {
            return KeystrokeOutcome::Restart;
        }
        editor.type_char(c);

        let completes_suffix = self.trigger.kind == MatchKind::PartialSuffix
            && self.pattern.is_empty()
            && self.config.palindromic_char() == Some(c);

        if completes_suffix {
            self.trigger.kind = MatchKind::FullSuffix;
            self.trigger.matched_text.push(c);
            trace!("Trigger completed to {:?}", self.trigger.matched_text);
        } else if self.syntax.is_identifier_char(c) {
            self.pattern.push(c);
            self.trigger.preceding_pattern.push(c);
        } else {
            debug!("Keystroke {:?} ends the command session", c);
            self.close(editor, SessionPhase::Cancelled);
            return KeystrokeOutcome::Restart;
        }

        // The hint would now sit inside the typed text.
        self.decorations.dismiss_hint(editor);
        self.refilter(editor);
        KeystrokeOutcome::Refilter
    }

    fn refilter(&mut self, editor: &mut Editor) {
        self.visible = self.matching_indices();
        trace!(
            "Filter {:?} leaves {} of {} commands",
            self.pattern,
            self.visible.len(),
            self.entries.len()
        );
        let first = if self.visible.is_empty() { None } else { Some(0) };
        self.select(editor, first);
    }

    /// Merges the commands with ordinary completion items, best first
    pub fn lookup_items(&self, editor: &Editor, symbols: Vec<LookupItem>) -> Vec<LookupItem> {
        let mut criteria = RankingCriteria::new(RerankContext {
            trigger_start: self.trigger_start,
            caret: editor.caret(),
        });
        if let Some(reranker) = &self.reranker {
            criteria = criteria.with_reranker(reranker.clone());
        }
        let mut items = symbols;
        items.extend(self.commands().into_iter().cloned().map(LookupItem::Command));
        rank_items(items, &criteria)
    }

    /// Commits visible entry `index`
    ///
    /// The popup closes whether or not the commit succeeds.
    ///
    /// # Returns
    /// Host offset the command was scheduled at
    pub fn commit(&mut self, editor: &mut Editor, index: usize) -> Result<usize, CommitError> {
        if !self.is_open() {
            return Err(CommitError::SessionClosed);
        }
        let entry = self
            .visible
            .get(index)
            .map(|&i| self.entries[i].clone())
            .ok_or(CommitError::NoSuchEntry(index))?;

        self.decorations.teardown(editor);
        let target = CommitTarget {
            injection: self.target.injection.as_ref(),
            suffix: &self.config.suffix,
        };
        match commit_entry(editor, &entry, target, &self.executor) {
            Ok(start) => {
                if let Some(reranker) = &self.reranker {
                    reranker.record_selection(entry.name());
                }
                debug!("Committed '{}' at {}", entry.name(), start);
                self.phase = SessionPhase::Committed;
                Ok(start)
            }
            Err(e) => {
                warn!("Abandoned commit of '{}': {}", entry.name(), e);
                self.phase = SessionPhase::Cancelled;
                Err(e)
            }
        }
    }

    /// Commits the visible entry called `name`
    pub fn commit_named(&mut self, editor: &mut Editor, name: &str) -> Result<usize, CommitError> {
        match self.find(name) {
            Some(index) => self.commit(editor, index),
            None => Err(CommitError::NoSuchCommand(name.to_string())),
        }
    }

    /// Closes the popup without running anything
    pub fn cancel(&mut self, editor: &mut Editor) {
        if self.is_open() {
            debug!("Command session cancelled");
            self.close(editor, SessionPhase::Cancelled);
        }
    }

    fn close(&mut self, editor: &mut Editor, phase: SessionPhase) {
        self.decorations.teardown(editor);
        self.selected = None;
        self.phase = phase;
    }
}
