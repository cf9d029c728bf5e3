//! Trigger-completion coordinator
//!
//! A session goes through
//! `Idle -> Scanning -> BuildingDerivedBuffer -> CollectingCommands -> Ranking -> Displayed`,
//! falling back to `Idle` (no session) whenever a step finds nothing to do.
//! [`CommandCompletionEngine::prepare`] covers everything up to the derived
//! buffer and only reads the editor; [`collect_commands`] is the part that may
//! run off the UI thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use super::context::{resolve_target, CompletionRequest, CompletionTarget, Rejection};
use super::entry::PopupEntry;
use super::hint::UsageHintCounter;
use super::ranking::{rank_commands, RankingCriteria, RerankContext, Reranker};
use super::session::CommandSession;
use crate::commands::{CommandDescriptor, CommandProvider, DerivedView, LanguageRegistry, ProviderContext, ProviderError};
use crate::config::FeatureFlag;
use crate::editor::{Editor, SyntaxLayer, UiExecutor, WordSyntax};
use crate::trigger::{build_derived, scan, TriggerConfig, TriggerMatch};

/// The session was aborted cooperatively
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("command completion cancelled")]
pub struct Cancelled;

/// Everything needed to collect commands, detached from the editor
#[derive(Clone)]
pub struct PreparedSession {
    pub target: CompletionTarget,
    pub config: TriggerConfig,
    pub trigger: TriggerMatch,
    pub derived: DerivedView,
    providers: Vec<Arc<dyn CommandProvider>>,
}

impl std::fmt::Debug for PreparedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedSession")
            .field("language", &self.target.language())
            .field("trigger", &self.trigger)
            .field("derived", &self.derived)
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl PreparedSession {
    /// Host offset of the first trigger character
    pub fn trigger_start(&self) -> usize {
        self.target
            .to_host(self.target.offset - self.trigger.span_len())
    }
}

/// Runs every provider in registration order
///
/// A failing or panicking provider is logged and skipped; a declining
/// provider is skipped silently. Cancellation, from the token or from a
/// provider, aborts the whole collection.
pub fn collect_commands(
    prepared: &PreparedSession,
    cancel: &CancellationToken,
) -> Result<Vec<CommandDescriptor>, Cancelled> {
    trace!("CollectingCommands from {} providers", prepared.providers.len());
    let ctx = ProviderContext {
        file: &prepared.target.file,
        derived: &prepared.derived,
        original_text: &prepared.target.text,
        original_offset: prepared.target.offset,
        cancel,
    };

    let mut commands = Vec::new();
    for provider in &prepared.providers {
        if cancel.is_cancelled() {
            debug!("Command collection cancelled before '{}'", provider.name());
            return Err(Cancelled);
        }
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| provider.commands(&ctx))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                error!(
                    provider = provider.name(),
                    "Command provider panicked: {}",
                    panic_message(payload.as_ref())
                );
                continue;
            }
        };
        match outcome {
            Ok(offered) => {
                trace!("Provider '{}' offered {} commands", provider.name(), offered.len());
                commands.extend(offered);
            }
            Err(ProviderError::Unsupported) => {
                trace!("Provider '{}' declined the derived buffer", provider.name());
            }
            Err(ProviderError::Cancelled) => {
                debug!("Provider '{}' observed cancellation", provider.name());
                return Err(Cancelled);
            }
            Err(ProviderError::Failed(e)) => {
                error!(provider = provider.name(), "Command provider failed: {:#}", e);
            }
        }
    }
    Ok(commands)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

/// Entry point for trigger completion
pub struct CommandCompletionEngine {
    languages: Arc<LanguageRegistry>,
    syntax: Arc<dyn SyntaxLayer>,
    feature: FeatureFlag,
    hints: Arc<UsageHintCounter>,
    reranker: Option<Arc<dyn Reranker>>,
    executor: UiExecutor,
}

impl std::fmt::Debug for CommandCompletionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandCompletionEngine")
            .field("languages", &self.languages.languages().collect::<Vec<_>>())
            .field("enabled", &self.feature.is_enabled())
            .field("hints_shown", &self.hints.shown())
            .field("reranker", &self.reranker.is_some())
            .finish_non_exhaustive()
    }
}

impl CommandCompletionEngine {
    /// Creates an engine with plain-text syntax, the feature enabled and a
    /// fresh hint counter
    pub fn new(languages: LanguageRegistry, executor: UiExecutor) -> Self {
        Self {
            languages: Arc::new(languages),
            syntax: Arc::new(WordSyntax),
            feature: FeatureFlag::new(true),
            hints: Arc::new(UsageHintCounter::default()),
            reranker: None,
            executor,
        }
    }

    pub fn with_syntax(mut self, syntax: Arc<dyn SyntaxLayer>) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn with_feature_flag(mut self, feature: FeatureFlag) -> Self {
        self.feature = feature;
        self
    }

    pub fn with_hint_counter(mut self, hints: Arc<UsageHintCounter>) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    pub fn hints(&self) -> &Arc<UsageHintCounter> {
        &self.hints
    }

    /// Checks preconditions, scans for a trigger and builds the derived view
    ///
    /// Only reads the editor. `Err` carries the failed precondition; `Ok(None)`
    /// means no trigger or nothing before it.
    pub fn prepare(&self, editor: &Editor, request: &CompletionRequest) -> Result<Option<PreparedSession>, Rejection> {
        let (target, support) = resolve_target(
            editor,
            request,
            self.feature.is_enabled(),
            &self.languages,
            self.syntax.as_ref(),
        )?;

        trace!("Scanning at {} for {:?}", target.offset, support.config.suffix);
        let Some(trigger) = scan(&target.text, target.offset, &support.config.suffix) else {
            trace!("No trigger before offset {}", target.offset);
            return Ok(None);
        };

        trace!("BuildingDerivedBuffer for {:?}", trigger);
        let Some(buffer) = build_derived(&target.text, target.offset, &trigger) else {
            return Ok(None);
        };
        let tree = self.syntax.parse(target.language(), &buffer.text);

        Ok(Some(PreparedSession {
            config: support.config.clone(),
            providers: support.providers.get_all().to_vec(),
            derived: DerivedView { buffer, tree },
            trigger,
            target,
        }))
    }

    /// Ranks `commands` and displays a session for them
    ///
    /// # Returns
    /// `None` when there is nothing to show
    pub fn open_session(
        &self,
        editor: &mut Editor,
        prepared: PreparedSession,
        commands: Vec<CommandDescriptor>,
    ) -> Option<CommandSession> {
        if commands.is_empty() {
            trace!("No commands offered; back to Idle");
            return None;
        }

        let host_start = prepared.trigger_start();
        let host_shift = prepared.target.host_shift();
        let suffix = prepared.config.insertion_suffix();
        let entries: Vec<PopupEntry> = commands
            .into_iter()
            .map(|descriptor| PopupEntry::new(descriptor, host_start, suffix.clone(), host_shift))
            .collect();

        trace!("Ranking {} commands", entries.len());
        let mut criteria = RankingCriteria::new(RerankContext {
            trigger_start: host_start,
            caret: editor.caret(),
        });
        if let Some(reranker) = &self.reranker {
            criteria = criteria.with_reranker(reranker.clone());
        }
        let ranked = rank_commands(entries, &criteria);

        let mut session = CommandSession::new(
            prepared.target,
            prepared.config,
            prepared.trigger,
            ranked,
            self.executor.clone(),
            self.syntax.clone(),
            self.reranker.clone(),
        );
        session.display(editor, &self.hints);
        debug!(
            "Displayed {} trigger commands at {}",
            session.commands().len(),
            host_start
        );
        Some(session)
    }

    /// Attempts trigger completion synchronously
    ///
    /// # Returns
    /// A live session, `None` when trigger completion does not apply, or
    /// `Err(Cancelled)` when the session was superseded
    pub fn attempt(
        &self,
        editor: &mut Editor,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<CommandSession>, Cancelled> {
        let prepared = match self.prepare(editor, request) {
            Ok(Some(prepared)) => prepared,
            Ok(None) => return Ok(None),
            Err(rejection) => {
                trace!("Trigger completion not applicable: {:?}", rejection);
                return Ok(None);
            }
        };
        let commands = collect_commands(&prepared, cancel)?;
        Ok(self.open_session(editor, prepared, commands))
    }

    /// Attempts trigger completion, collecting commands on the blocking pool
    ///
    /// Cancelling `cancel` resolves this future with `Err(Cancelled)` right
    /// away; providers still running observe the same token.
    pub async fn attempt_async(
        &self,
        editor: &mut Editor,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<Option<CommandSession>, Cancelled> {
        let prepared = match self.prepare(editor, request) {
            Ok(Some(prepared)) => prepared,
            Ok(None) => return Ok(None),
            Err(rejection) => {
                trace!("Trigger completion not applicable: {:?}", rejection);
                return Ok(None);
            }
        };

        let token = cancel.clone();
        let collection = tokio::task::spawn_blocking(move || {
            let result = collect_commands(&prepared, &token);
            (prepared, result)
        });

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Command session cancelled while collecting");
                Err(Cancelled)
            }
            joined = collection => match joined {
                Ok((prepared, Ok(commands))) => {
                    if cancel.is_cancelled() {
                        return Err(Cancelled);
                    }
                    Ok(self.open_session(editor, prepared, commands))
                }
                Ok((_, Err(cancelled))) => Err(cancelled),
                Err(e) => {
                    error!("Command collection task failed: {}", e);
                    Ok(None)
                }
            }
        }
    }
}
