//! # Logging
//!
//! The TUI owns the terminal and, in echo-host mode, stdout is the wire, so
//! log output always goes to a file through a non-blocking writer.
//!
//! ## Filter Priority
//!
//! 1. **`HOST_TEST_LOG`** - crate-specific filter directive
//! 2. **`RUST_LOG`** - standard tracing directive
//! 3. **Default** - `warn` globally, `info` for `host_test`
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/host-test/logs/host-test-<pid>.log`
//! - Linux: `~/.local/share/host-test/logs/host-test-12345.log`
//! - macOS: `~/Library/Application Support/host-test/logs/host-test-12345.log`
//!
//! Override with `--log-file <path>`.
//!
//! One-shot commands (`--install`, `--list-hosts`, `--set-activity`, ...) own
//! no screen, so [`init_stderr`] sends their diagnostics to stderr instead.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "warn,host_test=info";

/// Keeps the background writer alive; dropping it flushes the log file.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

/// True if the user asked for logging through the environment.
pub fn requested_by_env() -> bool {
    env::var("HOST_TEST_LOG").is_ok() || env::var("RUST_LOG").is_ok()
}

/// Install the global subscriber writing to `log_file` (or the default path).
pub fn init(log_file: Option<PathBuf>) -> Result<LogGuard> {
    let (dir, filename) = resolve_log_path(log_file);

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, &filename);
    let (writer, file_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer().with_writer(writer).with_ansi(false);

    Registry::default()
        .with(create_filter())
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: dir.join(filename),
    })
}

/// Install the global subscriber writing compact lines to stderr.
pub fn init_stderr() -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    Registry::default()
        .with(create_filter())
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}

fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("host-test-{}.log", std::process::id());

    if let Some(path) = override_path {
        if path.extension().is_some() {
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);
            return (dir, name);
        }
        return (path, filename);
    }

    let dir = directories::ProjectDirs::from("", "", "host-test")
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));

    (dir, filename)
}

fn create_filter() -> EnvFilter {
    if let Ok(directive) = env::var("HOST_TEST_LOG") {
        return EnvFilter::new(directive);
    }
    if let Ok(directive) = env::var("RUST_LOG") {
        return EnvFilter::new(directive);
    }
    EnvFilter::new(DEFAULT_FILTER)
}
