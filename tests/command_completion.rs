/// Integration tests for trigger-command completion
///
/// Tests verify:
/// - End-to-end: trigger detection, derived buffer, commit and scheduled execution
/// - Provider isolation and error logging
/// - Decoration lifecycle (prompt, secondary highlights, problem suppression, hints)
/// - Injected fragments, palindromic triggers and async cancellation

mod common;

use std::sync::Arc;
use std::time::Duration;

use indoc::indoc;
use tokio_util::sync::CancellationToken;

use command_completion::commands::builtin::TARGET_STYLE;
use command_completion::commands::{CommandProviderRegistry, LanguageRegistry};
use command_completion::completion::{
    Cancelled, CommandCompletionEngine, CommitError, CompletionRequest, KeystrokeOutcome, LookupItem,
    SessionPhase, UsageHintCounter, PROMPT_STYLE, REMOVE_TRIGGER_STEP,
};
use command_completion::config::{EngineConfig, LanguageConfig};
use command_completion::editor::{Diagnostic, Document, EditError, Editor, Inlay, InjectedRegion, Severity, UiExecutor, UiQueue};
use command_completion::trigger::{MatchKind, TriggerConfig};

use common::{
    attempt, count_errors, editor, names, BlockingProvider, FailingProvider, PanickingProvider, RecordingProvider,
    StaticProvider, TwoWordProvider,
};

fn builtin_engine(config: &EngineConfig) -> (CommandCompletionEngine, UiQueue) {
    let (executor, queue) = UiExecutor::new();
    (CommandCompletionEngine::new(config.build_registry(), executor), queue)
}

fn engine_with(registry: CommandProviderRegistry, trigger: TriggerConfig) -> (CommandCompletionEngine, UiQueue) {
    let mut languages = LanguageRegistry::new();
    languages.register("text", trigger, registry);
    let (executor, queue) = UiExecutor::new();
    (CommandCompletionEngine::new(languages, executor), queue)
}

#[test]
fn test_end_to_end_commit_schedules_command_at_trigger_start() {
    let recording = Arc::new(RecordingProvider::default());
    let calls = recording.calls.clone();
    let mut registry = CommandProviderRegistry::new();
    registry.register(recording);
    let (engine, mut queue) = engine_with(registry, TriggerConfig::new("."));

    let mut ed = editor("text", "foo.bar.");
    assert_eq!(ed.caret(), 8);

    let prepared = engine
        .prepare(&ed, &CompletionRequest::at_caret(&ed))
        .unwrap()
        .unwrap();
    assert_eq!(prepared.trigger.kind, MatchKind::FullSuffix);
    assert_eq!(prepared.trigger.matched_text, ".");
    assert_eq!(prepared.derived.buffer.text.to_string(), "foo.bar");
    assert_eq!(prepared.derived.buffer.offset, 7);

    let mut session = attempt(&engine, &mut ed).expect("session should open");
    assert_eq!(names(&session), vec!["surroundWith"]);

    session.commit(&mut ed, 0).unwrap();
    assert_eq!(session.phase(), SessionPhase::Committed);
    assert_eq!(ed.text().to_string(), "foo.bar");
    assert_eq!(ed.caret(), 7);

    // Execution waits for the next UI cycle.
    assert!(calls.lock().is_empty());
    assert_eq!(queue.run_pending(&mut ed), 1);

    let calls = calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, 7);
    assert_eq!(calls[0].1.language, "text");
}

#[test]
fn test_builtin_surround_with_is_one_undo_step() {
    let (engine, mut queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "foo.bar.");

    let mut session = attempt(&engine, &mut ed).unwrap();
    assert_eq!(names(&session), vec!["surroundWith", "upperCase", "commentLine"]);

    session.commit_named(&mut ed, "surroundWith").unwrap();
    queue.run_until_idle(&mut ed);
    assert_eq!(ed.text().to_string(), "foo.(bar)");
    assert_eq!(ed.caret(), 9);
    assert_eq!(ed.undo_name(), Some("surroundWith"));

    assert!(ed.undo());
    assert_eq!(ed.text().to_string(), "foo.bar");
    assert_eq!(ed.undo_name(), Some(REMOVE_TRIGGER_STEP));
    assert!(ed.undo());
    assert_eq!(ed.text().to_string(), "foo.bar.");

    assert!(ed.redo());
    assert!(ed.redo());
    assert_eq!(ed.text().to_string(), "foo.(bar)");
}

#[test]
fn test_failing_provider_is_isolated_and_logged_once() {
    let mut registry = CommandProviderRegistry::new();
    registry.register(StaticProvider::new("first", vec!["alpha", "beta"]));
    registry.register(Arc::new(FailingProvider));
    registry.register(StaticProvider::new("third", vec!["gamma"]));
    let (engine, _queue) = engine_with(registry, TriggerConfig::new("."));

    let mut ed = editor("text", "value.");
    let (session, errors) = count_errors(|| attempt(&engine, &mut ed));

    let session = session.expect("remaining providers still produce a session");
    assert_eq!(names(&session), vec!["alpha", "beta", "gamma"]);
    assert_eq!(errors, 1);
}

#[test]
fn test_panicking_provider_is_isolated_and_logged_once() {
    let mut registry = CommandProviderRegistry::new();
    registry.register(StaticProvider::new("first", vec!["alpha"]));
    registry.register(Arc::new(PanickingProvider));
    registry.register(StaticProvider::new("third", vec!["gamma"]));
    let (engine, _queue) = engine_with(registry, TriggerConfig::new("."));

    let mut ed = editor("text", "value.");
    let (session, errors) = count_errors(|| attempt(&engine, &mut ed));

    let session = session.expect("remaining providers still produce a session");
    assert_eq!(names(&session), vec!["alpha", "gamma"]);
    assert_eq!(errors, 1);
}

#[tokio::test]
async fn test_panicking_provider_is_isolated_off_thread() {
    let mut registry = CommandProviderRegistry::new();
    registry.register(Arc::new(PanickingProvider));
    registry.register(StaticProvider::new("second", vec!["beta"]));
    let (engine, _queue) = engine_with(registry, TriggerConfig::new("."));

    let mut ed = editor("text", "value.");
    let request = CompletionRequest::at_caret(&ed);
    let session = engine
        .attempt_async(&mut ed, &request, CancellationToken::new())
        .await
        .unwrap()
        .expect("the second provider still produces a session");
    assert_eq!(names(&session), vec!["beta"]);
}

#[test]
fn test_commands_rank_below_ordinary_items() {
    let (engine, _queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "foo.bar.");
    let session = attempt(&engine, &mut ed).unwrap();

    let items = session.lookup_items(
        &ed,
        vec![LookupItem::Symbol {
            label: "length".to_string(),
            priority: 0,
        }],
    );
    let labels: Vec<_> = items.iter().map(LookupItem::label).collect();
    assert_eq!(labels, vec!["length", "surroundWith", "upperCase", "commentLine"]);
}

#[test]
fn test_cancel_tears_down_decorations() {
    let (engine, _queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "foo.bar.");
    ed.add_diagnostic(Diagnostic {
        range: 7..8,
        severity: Severity::Error,
        message: "unexpected '.'".to_string(),
    });
    assert_eq!(ed.visible_diagnostics().len(), 1);

    let mut session = attempt(&engine, &mut ed).unwrap();
    assert_eq!(ed.highlighters_with_style(PROMPT_STYLE)[0].range, 7..8);
    assert_eq!(ed.highlighters_with_style(TARGET_STYLE)[0].range, 4..7);
    assert!(ed.visible_diagnostics().is_empty());
    assert!(session.popup().command_matcher);
    assert!(!session.popup().hide_when_empty);

    session.cancel(&mut ed);
    assert_eq!(session.phase(), SessionPhase::Cancelled);
    assert!(ed.highlighters_with_style(PROMPT_STYLE).is_empty());
    assert!(ed.highlighters_with_style(TARGET_STYLE).is_empty());
    assert_eq!(ed.inlays().count(), 0);
    assert_eq!(ed.visible_diagnostics().len(), 1);
    assert!(session.decorations().is_clear());
    assert_eq!(ed.text().to_string(), "foo.bar.");
}

#[test]
fn test_selection_moves_decorations() {
    let (engine, _queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "foo.bar.");
    let mut session = attempt(&engine, &mut ed).unwrap();

    assert!(session.select(&mut ed, Some(2)));
    assert_eq!(session.selected().map(|e| e.name()), Some("commentLine"));
    assert!(ed.highlighters_with_style(TARGET_STYLE).is_empty());
    assert_eq!(ed.highlighters_with_style(PROMPT_STYLE).len(), 1);
    assert!(ed.inlays().any(|(offset, inlay)| offset == 7 && *inlay == Inlay::Icon("comment".to_string())));

    assert!(!session.select(&mut ed, None));
    assert!(ed.highlighters().is_empty());
}

#[test]
fn test_selected_command_highlights_paint_by_priority() {
    let mut registry = CommandProviderRegistry::new();
    registry.register(Arc::new(TwoWordProvider));
    let (engine, _queue) = engine_with(registry, TriggerConfig::new("."));

    let mut ed = editor("text", "foo bar.");
    let mut session = attempt(&engine, &mut ed).unwrap();

    let painted: Vec<_> = ed
        .highlighters()
        .iter()
        .filter(|h| h.style_key != PROMPT_STYLE)
        .map(|h| (h.style_key.as_str(), h.range.clone()))
        .collect();
    assert_eq!(painted, vec![("word.second", 4..7), ("word.first", 0..3)]);
    let first = ed.highlighters_with_style("word.first")[0].layer;
    let second = ed.highlighters_with_style("word.second")[0].layer;
    assert!(first > second);

    session.cancel(&mut ed);
    assert!(ed.highlighters().is_empty());
}

#[test]
fn test_commit_after_buffer_change_leaves_text_unchanged() {
    let (engine, mut queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "foo.bar.");
    let mut session = attempt(&engine, &mut ed).unwrap();

    // The trigger is replaced underneath the open popup.
    ed.transact("Typing", |ed: &mut Editor| -> Result<(), EditError> {
        ed.remove(7..8)?;
        ed.insert(7, ";")?;
        ed.set_caret(8);
        Ok(())
    })
    .unwrap();

    assert_eq!(
        session.commit(&mut ed, 0),
        Err(CommitError::TriggerNotFound { offset: 8 })
    );
    assert_eq!(ed.text().to_string(), "foo.bar;");
    assert_eq!(session.phase(), SessionPhase::Cancelled);
    assert!(ed.highlighters().is_empty());
    assert_eq!(queue.run_pending(&mut ed), 0);

    assert_eq!(session.commit(&mut ed, 0), Err(CommitError::SessionClosed));
}

#[test]
fn test_filter_text_is_removed_on_commit() {
    let (engine, mut queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "total.up");

    let mut session = attempt(&engine, &mut ed).unwrap();
    assert_eq!(session.pattern(), "up");
    assert_eq!(names(&session), vec!["upperCase"]);

    session.commit(&mut ed, 0).unwrap();
    queue.run_until_idle(&mut ed);
    assert_eq!(ed.text().to_string(), "TOTAL");
}

#[test]
fn test_palindromic_trigger_refilters() {
    let config = EngineConfig {
        languages: vec![LanguageConfig::new("text", "..")],
        ..EngineConfig::default()
    };
    let (engine, mut queue) = builtin_engine(&config);
    let mut ed = editor("text", "foo");
    ed.type_char('.');

    let mut session = attempt(&engine, &mut ed).unwrap();
    assert_eq!(session.trigger().kind, MatchKind::PartialSuffix);

    assert_eq!(session.type_char(&mut ed, '.'), KeystrokeOutcome::Refilter);
    assert_eq!(session.trigger().kind, MatchKind::FullSuffix);
    assert_eq!(session.trigger().matched_text, "..");
    assert_eq!(names(&session).len(), 3);

    assert_eq!(session.type_char(&mut ed, 's'), KeystrokeOutcome::Refilter);
    assert_eq!(session.type_char(&mut ed, 'u'), KeystrokeOutcome::Refilter);
    assert_eq!(names(&session), vec!["surroundWith"]);
    assert_eq!(ed.highlighters_with_style(PROMPT_STYLE)[0].range, 3..7);

    session.commit(&mut ed, 0).unwrap();
    assert_eq!(ed.text().to_string(), "foo");
    queue.run_until_idle(&mut ed);
    assert_eq!(ed.text().to_string(), "(foo)");
}

#[test]
fn test_non_identifier_keystroke_restarts() {
    let (engine, _queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "foo.");
    let mut session = attempt(&engine, &mut ed).unwrap();

    assert_eq!(session.type_char(&mut ed, '('), KeystrokeOutcome::Restart);
    assert!(!session.is_open());
    assert!(ed.highlighters().is_empty());
    assert_eq!(ed.text().to_string(), "foo.(");
}

#[test]
fn test_hint_is_capped() {
    let (executor, _queue) = UiExecutor::new();
    let hints = Arc::new(UsageHintCounter::new(5, 4));
    let engine = CommandCompletionEngine::new(EngineConfig::default().build_registry(), executor)
        .with_hint_counter(hints.clone());

    let mut ed = editor("text", "foo.");
    let mut session = attempt(&engine, &mut ed).unwrap();
    assert!(ed.inlays().any(|(offset, inlay)| offset == 4 && matches!(inlay, Inlay::Hint(_))));
    assert_eq!(hints.shown(), 5);
    session.cancel(&mut ed);
    assert_eq!(ed.inlays().count(), 0);

    let mut session = attempt(&engine, &mut ed).unwrap();
    assert!(!ed.inlays().any(|(_, inlay)| matches!(inlay, Inlay::Hint(_))));
    assert_eq!(hints.shown(), 5);
    session.cancel(&mut ed);
}

#[test]
fn test_hint_is_dismissed_by_filter_keystroke() {
    let (engine, _queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "foo.");
    let mut session = attempt(&engine, &mut ed).unwrap();
    assert!(ed.inlays().any(|(offset, inlay)| offset == 4 && matches!(inlay, Inlay::Hint(_))));

    assert_eq!(session.type_char(&mut ed, 'u'), KeystrokeOutcome::Refilter);
    assert_eq!(ed.text().to_string(), "foo.u");
    assert!(!ed.inlays().any(|(_, inlay)| matches!(inlay, Inlay::Hint(_))));
    assert_eq!(names(&session), vec!["surroundWith", "upperCase"]);

    assert_eq!(session.type_char(&mut ed, 'p'), KeystrokeOutcome::Refilter);
    assert!(!ed.inlays().any(|(_, inlay)| matches!(inlay, Inlay::Hint(_))));
    assert_eq!(engine.hints().shown(), 1);
}

#[test]
fn test_commit_named_reports_unknown_command() {
    let (engine, _queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "foo.");
    let mut session = attempt(&engine, &mut ed).unwrap();
    assert_eq!(
        session.commit_named(&mut ed, "reverse"),
        Err(CommitError::NoSuchCommand("reverse".to_string()))
    );
    assert!(session.is_open());
    assert_eq!(ed.text().to_string(), "foo.");
}

#[test]
fn test_no_hint_after_filter_text() {
    let (executor, _queue) = UiExecutor::new();
    let hints = Arc::new(UsageHintCounter::default());
    let engine = CommandCompletionEngine::new(EngineConfig::default().build_registry(), executor)
        .with_hint_counter(hints.clone());

    let mut ed = editor("text", "foo.su");
    let _session = attempt(&engine, &mut ed).unwrap();
    assert_eq!(hints.shown(), 0);
}

#[test]
fn test_injected_fragment_commits_in_host_coordinates() {
    let config = EngineConfig {
        languages: vec![LanguageConfig {
            supports_injected: true,
            ..LanguageConfig::new("query", ".")
        }],
        ..EngineConfig::default()
    };
    let (engine, mut queue) = builtin_engine(&config);

    let host = indoc! {r#"
        let rows = run("items.");
    "#};
    let content_start = host.find("items").unwrap();
    let content_end = host.find("\");").unwrap();
    let mut doc = Document::new(
        url::Url::parse("file:///tmp/host.rs").unwrap(),
        "host",
        host,
    );
    doc.add_injection(InjectedRegion::new("query", content_start..content_end));
    let mut ed = Editor::new(doc);
    ed.set_caret(content_end);

    let mut session = attempt(&engine, &mut ed).unwrap();
    assert!(session.target().is_injected());
    assert_eq!(session.trigger_start(), content_end - 1);
    assert_eq!(
        ed.highlighters_with_style(TARGET_STYLE)[0].range,
        content_start..content_end - 1
    );
    // Icon sits at the start of the fragment.
    assert!(ed.inlays().any(|(offset, inlay)| offset == content_start && matches!(inlay, Inlay::Icon(_))));

    session.commit_named(&mut ed, "surroundWith").unwrap();
    queue.run_until_idle(&mut ed);
    assert_eq!(ed.text().to_string(), "let rows = run(\"(items)\");\n");
}

#[test]
fn test_injected_fragment_requires_support() {
    let (engine, _queue) = builtin_engine(&EngineConfig::default());
    let mut doc = Document::new(url::Url::parse("file:///tmp/host.txt").unwrap(), "text", "x(\"a.\")");
    doc.add_injection(InjectedRegion::new("text", 3..5));
    let mut ed = Editor::new(doc);
    ed.set_caret(5);
    assert!(attempt(&engine, &mut ed).is_none());
}

#[test]
fn test_trigger_inside_word_is_ignored() {
    let (engine, _queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "foo.bar");
    ed.set_caret(4);
    assert!(attempt(&engine, &mut ed).is_none());
}

#[tokio::test]
async fn test_async_attempt_opens_session() {
    let (engine, _queue) = builtin_engine(&EngineConfig::default());
    let mut ed = editor("text", "foo.");
    let request = CompletionRequest::at_caret(&ed);
    let session = engine
        .attempt_async(&mut ed, &request, CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(names(&session), vec!["surroundWith", "upperCase", "commentLine"]);
}

#[tokio::test]
async fn test_async_attempt_is_cancelled() {
    let mut registry = CommandProviderRegistry::new();
    registry.register(Arc::new(BlockingProvider));
    let (engine, _queue) = engine_with(registry, TriggerConfig::new("."));

    let mut ed = editor("text", "foo.");
    let request = CompletionRequest::at_caret(&ed);
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = engine.attempt_async(&mut ed, &request, cancel).await;
    assert_eq!(result.unwrap_err(), Cancelled);
    assert!(ed.highlighters().is_empty());
}
