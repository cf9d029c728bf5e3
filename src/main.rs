//! `command-completion` CLI
//!
//! Runs the trigger scanner and the completion engine against files on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use ropey::Rope;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use command_completion::completion::{
    CommandCompletionEngine, CommandSession, CommitError, CompletionRequest, EntrySummary, HintStore,
    UsageHintCounter,
};
use command_completion::config::EngineConfig;
use command_completion::editor::{Document, Editor, UiExecutor};
use command_completion::logging::init_logger;
use command_completion::trigger::{scan, TriggerMatch};

#[derive(Parser, Debug)]
#[command(name = "command-completion")]
#[command(version, about = "Trigger-command completion engine")]
struct Cli {
    /// Engine config file (JSON); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level filter (e.g. "info", "debug"); falls back to RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable ANSI colors in stderr output
    #[arg(long, global = true)]
    no_color: bool,

    /// Also write a DEBUG-level session log to the cache directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the trigger found before an offset
    Scan {
        #[arg(long)]
        file: PathBuf,
        /// Caret offset in chars; defaults to the end of the file
        #[arg(long)]
        offset: Option<usize>,
        #[arg(long, default_value = ".")]
        suffix: String,
    },
    /// Open a command session and optionally run one command
    Complete {
        #[arg(long)]
        file: PathBuf,
        /// Caret offset in chars; defaults to the end of the file
        #[arg(long)]
        offset: Option<usize>,
        #[arg(long, default_value = "text")]
        language: String,
        /// Name of the command to commit
        #[arg(long)]
        commit: Option<String>,
        /// Write the edited text back to the file instead of printing it
        #[arg(long, requires = "commit")]
        write: bool,
    },
}

#[derive(Serialize)]
struct ScanReport {
    offset: usize,
    trigger: Option<TriggerMatch>,
}

#[derive(Serialize)]
struct CompleteReport<'a> {
    offset: usize,
    commands: Vec<EntrySummary<'a>>,
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))
}

fn run_scan(file: &Path, offset: Option<usize>, suffix: &str) -> anyhow::Result<()> {
    let text = Rope::from_str(&read_file(file)?);
    let offset = offset.unwrap_or_else(|| text.len_chars());
    let report = ScanReport {
        offset,
        trigger: scan(&text, offset, suffix),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Commits `commit` (or cancels) and then saves the usage-hint counter
///
/// The counter is saved even when the commit fails, so the hint shown by
/// this run still counts.
fn settle_session(
    session: &mut CommandSession,
    editor: &mut Editor,
    commit: Option<&str>,
    hints: &UsageHintCounter,
    store: Option<&dyn HintStore>,
) -> Result<(), CommitError> {
    let committed = match commit {
        Some(name) => session.commit_named(editor, name).map(|_| ()),
        None => {
            session.cancel(editor);
            Ok(())
        }
    };
    if let Some(store) = store {
        if let Err(e) = hints.persist(store) {
            warn!("Failed to persist usage-hint counter: {}", e);
        }
    }
    committed
}

async fn run_complete(
    config: &EngineConfig,
    file: &Path,
    offset: Option<usize>,
    language: &str,
    commit: Option<&str>,
    write: bool,
) -> anyhow::Result<()> {
    let path = fs::canonicalize(file).with_context(|| format!("failed to resolve {:?}", file))?;
    let uri = Url::from_file_path(&path).map_err(|()| anyhow!("not a file path: {:?}", path))?;
    let mut editor = Editor::new(Document::new(uri, language, &read_file(&path)?));
    if let Some(offset) = offset {
        editor.set_caret(offset);
    }

    let store = config.hint_store();
    let hints = Arc::new(match &store {
        Some(store) => UsageHintCounter::load(store, config.hint_threshold),
        None => UsageHintCounter::new(config.hint_threshold, 0),
    });

    let (executor, mut queue) = UiExecutor::new();
    let engine = CommandCompletionEngine::new(config.build_registry(), executor)
        .with_feature_flag(config.feature_flag())
        .with_hint_counter(hints.clone());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let request = CompletionRequest::at_caret(&editor);
    let session = engine.attempt_async(&mut editor, &request, cancel).await?;

    let Some(mut session) = session else {
        info!("No trigger commands at offset {}", request.offset);
        let report = CompleteReport {
            offset: request.offset,
            commands: Vec::new(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    };

    let report = CompleteReport {
        offset: request.offset,
        commands: session.summaries(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    let store = store.as_ref().map(|store| store as &dyn HintStore);
    settle_session(&mut session, &mut editor, commit, &hints, store)?;

    if commit.is_some() {
        let ran = queue.run_until_idle(&mut editor);
        debug!("Ran {} UI tasks after commit", ran);
        let text = editor.text().to_string();
        if write {
            fs::write(&path, &text).with_context(|| format!("failed to write {:?}", path))?;
            info!("Wrote {:?}", path);
        } else {
            println!("{}", text);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logger(cli.no_color, cli.log_level.as_deref(), cli.log_file)
        .context("failed to initialize logging")?;

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("invalid config {:?}", path))?,
        None => EngineConfig::default(),
    };

    match &cli.command {
        Command::Scan {
            file,
            offset,
            suffix,
        } => run_scan(file, *offset, suffix),
        Command::Complete {
            file,
            offset,
            language,
            commit,
            write,
        } => run_complete(&config, file, *offset, language, commit.as_deref(), *write).await,
    }
}
