//! Rolling file logs for the sync core.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend at most once per process.
//! - Capture panics as sanitized, single-line log events.
//!
//! # Invariants
//! - Starting again with the same target is a no-op; any other target is
//!   rejected while a logger is running.
//! - Initialization never panics.
//! - Log lines carry ids and counts only, never household content.

use crate::config::{CoreConfig, LogLevel};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};

const FILE_BASENAME: &str = "hearth";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_FILES: usize = 5;
const PANIC_PAYLOAD_LIMIT: usize = 160;

static RUNNING: OnceCell<RunningLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Where and how verbosely to log.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogTarget {
    level: LogLevel,
    dir: PathBuf,
}

impl LogTarget {
    fn resolve(level: &str, dir: &str) -> Result<Self, String> {
        let level = LogLevel::parse(level)?;
        let dir = dir.trim();
        if dir.is_empty() {
            return Err("log directory is required".to_string());
        }
        if !Path::new(dir).is_absolute() {
            return Err(format!("log directory `{dir}` must be absolute"));
        }
        Ok(Self {
            level,
            dir: PathBuf::from(dir),
        })
    }
}

struct RunningLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

impl RunningLogger {
    fn accept(&self, requested: &LogTarget) -> Result<(), String> {
        if &self.target == requested {
            return Ok(());
        }
        Err(format!(
            "logger already running with level={} dir=`{}`; cannot switch to level={} dir=`{}`",
            self.target.level,
            self.target.dir.display(),
            requested.level,
            requested.dir.display()
        ))
    }
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// Returns a message when the level is unknown, the directory is blank,
/// relative or cannot be created, or a logger with another target is
/// already running.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let target = LogTarget::resolve(level, log_dir)?;
    RUNNING
        .get_or_try_init(|| start(target.clone()))?
        .accept(&target)
}

/// Starts logging from `config`; `Ok(false)` when it names no directory.
pub fn init_logging_from(config: &CoreConfig) -> Result<bool, String> {
    let Some(dir) = config.log_dir.as_deref() else {
        return Ok(false);
    };
    let dir = dir
        .to_str()
        .ok_or_else(|| format!("log directory `{}` is not UTF-8", dir.display()))?;
    init_logging(config.log_level.as_str(), dir).map(|()| true)
}

/// `(level, dir)` of the running logger.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    RUNNING
        .get()
        .map(|running| (running.target.level.as_str(), running.target.dir.clone()))
}

pub fn default_log_level() -> &'static str {
    LogLevel::default().as_str()
}

fn start(target: LogTarget) -> Result<RunningLogger, String> {
    std::fs::create_dir_all(&target.dir)
        .map_err(|err| format!("cannot create log directory `{}`: {err}", target.dir.display()))?;

    let files = FileSpec::default()
        .directory(target.dir.as_path())
        .basename(FILE_BASENAME);
    let handle = Logger::try_with_str(target.level.as_str())
        .map_err(|err| format!("cannot configure logger: {err}"))?
        .log_to_file(files)
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("cannot start logger: {err}"))?;

    PANIC_HOOK.get_or_init(install_panic_hook);
    info!(
        "event=logging_start module=core status=ok os={} version={} level={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION"),
        target.level
    );

    Ok(RunningLogger {
        target,
        _handle: handle,
    })
}

fn install_panic_hook() {
    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |loc| format!("{}:{}", loc.file(), loc.line()),
        );
        error!(
            "event=panic module=core status=error location={location} payload={}",
            panic_payload(info)
        );
        chained(info);
    }));
}

fn panic_payload(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let text = match (payload.downcast_ref::<&str>(), payload.downcast_ref::<String>()) {
        (Some(text), _) => *text,
        (None, Some(text)) => text.as_str(),
        (None, None) => "<non-string payload>",
    };
    one_line(text, PANIC_PAYLOAD_LIMIT)
}

/// Replaces line breaks and truncates to `limit` characters plus `...`.
fn one_line(value: &str, limit: usize) -> String {
    let mut chars = value.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c });
    let mut out: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        out.push_str("...");
    }
    out
}
