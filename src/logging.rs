use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{self, fmt, prelude::*};

const LOG_RETENTION_DAYS: u64 = 7;

/// Get the log directory path in the user-specific OS cache directory
/// - Linux: ~/.cache/command-completion/
/// - macOS: ~/Library/Caches/command-completion/
/// - Windows: %LOCALAPPDATA%\command-completion\
fn get_log_dir() -> io::Result<PathBuf> {
    let cache_dir = dirs::cache_dir().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "Unable to determine user cache directory",
        )
    })?;

    let log_dir = cache_dir.join("command-completion");
    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }
    Ok(log_dir)
}

fn is_session_log(name: &str) -> bool {
    name.starts_with("session-") && name.ends_with(".log")
}

/// Clean up session logs older than LOG_RETENTION_DAYS
fn cleanup_old_logs(log_dir: &Path) -> io::Result<()> {
    let now = std::time::SystemTime::now();
    let retention = std::time::Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);

    for entry in fs::read_dir(log_dir)?.flatten() {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() || !entry.file_name().to_str().is_some_and(is_session_log) {
            continue;
        }
        let expired = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > retention);
        if expired {
            match fs::remove_file(entry.path()) {
                Ok(()) => eprintln!("Removed old log file: {:?}", entry.path()),
                Err(e) => eprintln!("Failed to remove old log file {:?}: {}", entry.path(), e),
            }
        }
    }
    Ok(())
}

fn session_id() -> String {
    let timestamp = time::OffsetDateTime::now_utc()
        .format(format_description!("[year][month][day]-[hour][minute][second]"))
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}-{}", timestamp, std::process::id())
}

/// Ignore errors due to the subscriber already being set (tests, embedders)
fn tolerate_reinit(result: Result<(), tracing_subscriber::util::TryInitError>) -> io::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("already been set") || e.to_string().contains("SetLoggerError") => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}

/// Initialize logger with stderr and optional file output
/// Returns a WorkerGuard that must be kept alive for the duration of the program
///
/// # Arguments
/// * `no_color` - Disable ANSI colors in stderr output
/// * `log_level` - Override log level (otherwise uses RUST_LOG or defaults to "info")
/// * `enable_file_logging` - Enable the DEBUG-level session log in the cache directory
///
/// # Logging Behavior
/// - **Stderr/Console**: Logs at the configured level (default "info")
/// - **Session File**: Logs at DEBUG level, including provider and session state transitions
pub fn init_logger(no_color: bool, log_level: Option<&str>, enable_file_logging: bool) -> io::Result<WorkerGuard> {
    let timer = fmt::time::OffsetTime::new(
        UtcOffset::UTC,
        format_description!("[[[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z]"),
    );

    let stderr_filter = match log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_ansi(!no_color)
        .with_filter(stderr_filter);

    if !enable_file_logging {
        let (_, guard) = tracing_appender::non_blocking(std::io::sink());
        tolerate_reinit(tracing_subscriber::registry().with(stderr_layer).try_init())?;
        return Ok(guard);
    }

    let log_dir = get_log_dir()?;
    cleanup_old_logs(&log_dir)?;

    let log_path = log_dir.join(format!("session-{}.log", session_id()));
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_timer(timer)
        .with_ansi(false)
        .with_filter(tracing_subscriber::EnvFilter::new("debug"));

    tolerate_reinit(
        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(file_layer)
            .try_init(),
    )?;
    eprintln!("Logging to file: {:?}", log_path);
    Ok(guard)
}
