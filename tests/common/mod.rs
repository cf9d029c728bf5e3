//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use url::Url;

use command_completion::commands::{CommandDescriptor, CommandProvider, HighlightSpec, ProviderContext, ProviderError};
use command_completion::completion::{CommandCompletionEngine, CommandSession, CompletionRequest};
use command_completion::editor::{Document, Editor, FileContext};

/// Counts ERROR-level events
#[derive(Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicUsize>,
}

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Runs `f` with a subscriber that counts errors
pub fn count_errors<R>(f: impl FnOnce() -> R) -> (R, usize) {
    let counter = ErrorCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, counter.count())
}

pub fn editor(language: &str, text: &str) -> Editor {
    Editor::new(Document::new(
        Url::parse("file:///tmp/integration.txt").unwrap(),
        language,
        text,
    ))
}

pub fn attempt(engine: &CommandCompletionEngine, editor: &mut Editor) -> Option<CommandSession> {
    let request = CompletionRequest::at_caret(editor);
    engine
        .attempt(editor, &request, &tokio_util::sync::CancellationToken::new())
        .unwrap()
}

pub fn names(session: &CommandSession) -> Vec<String> {
    session
        .commands()
        .iter()
        .map(|entry| entry.name().to_string())
        .collect()
}

fn noop(_: usize, _: &FileContext, _: &mut Editor) {}

/// Offers fixed commands with no action
pub struct StaticProvider {
    pub name: &'static str,
    pub commands: Vec<&'static str>,
}

impl StaticProvider {
    pub fn new(name: &'static str, commands: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self { name, commands })
    }
}

impl CommandProvider for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn commands(&self, _ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError> {
        Ok(self
            .commands
            .iter()
            .map(|name| CommandDescriptor::from_fn(*name, noop))
            .collect())
    }
}

/// Offers one command highlighting the two words before the trigger
pub struct TwoWordProvider;

impl CommandProvider for TwoWordProvider {
    fn name(&self) -> &str {
        "two-word"
    }

    fn commands(&self, ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError> {
        let end = ctx.derived_offset();
        Ok(vec![CommandDescriptor::from_fn("swapWords", noop)
            .with_highlight(HighlightSpec::new(0..3, "word.first", 9))
            .with_highlight(HighlightSpec::new(4..end, "word.second", 1))])
    }
}

/// Always fails with an internal error
pub struct FailingProvider;

impl CommandProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn commands(&self, _ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError> {
        Err(anyhow::anyhow!("index unavailable").into())
    }
}

/// Panics while computing its commands
pub struct PanickingProvider;

impl CommandProvider for PanickingProvider {
    fn name(&self) -> &str {
        "panicking"
    }

    fn commands(&self, _ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError> {
        panic!("syntax tree missing for derived buffer")
    }
}

/// Records the offset and file every execution of its command receives
#[derive(Default)]
pub struct RecordingProvider {
    pub calls: Arc<parking_lot::Mutex<Vec<(usize, FileContext)>>>,
}

impl CommandProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    fn commands(&self, _ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError> {
        let calls = self.calls.clone();
        Ok(vec![CommandDescriptor::from_fn(
            "surroundWith",
            move |offset: usize, file: &FileContext, _editor: &mut Editor| {
                calls.lock().push((offset, file.clone()));
            },
        )])
    }
}

/// Spins until the session is cancelled
pub struct BlockingProvider;

impl CommandProvider for BlockingProvider {
    fn name(&self) -> &str {
        "blocking"
    }

    fn commands(&self, ctx: &ProviderContext<'_>) -> Result<Vec<CommandDescriptor>, ProviderError> {
        loop {
            ctx.check_cancelled()?;
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }
}
