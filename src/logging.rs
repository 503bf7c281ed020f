use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    // RUST_LOG wins; otherwise log our own crate at info.
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mealprep=info"))
}

/// Log to stderr. Used by every command that does not take over the terminal.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Open the log file for appending, creating it if needed. Earlier sessions are kept.
pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Log to a file through a non-blocking writer. Keep the guard alive for the
/// whole run or buffered lines are lost.
pub fn init_file(path: &Path) -> Result<WorkerGuard> {
    let file = open_log_file(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}
