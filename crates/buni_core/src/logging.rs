//! Process-wide file logging for the runtime.
//!
//! # Responsibility
//! - Start one rolling file logger per process from [`LogConfig`].
//! - Route panics, including ones raised inside extension callbacks, to the log.
//!
//! # Invariants
//! - The first successful start fixes the level and directory for the process.
//!   Repeating it is a no-op; asking for another target is a [`LoggingError::Conflict`].
//! - Starting never panics.

use crate::config::LogConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "buni";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_LINE_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

/// Level and directory of a running logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub level: LevelFilter,
    pub dir: PathBuf,
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at `{}`", self.level, self.dir.display())
    }
}

struct ActiveLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

#[derive(Debug)]
pub enum LoggingError {
    InvalidLevel(String),
    RelativeDir(PathBuf),
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// Logging already runs with another level or directory.
    Conflict {
        active: LogTarget,
        requested: LogTarget,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected off|error|warn|info|debug|trace"
            ),
            Self::RelativeDir(path) => {
                write!(f, "log directory must be absolute, got `{}`", path.display())
            }
            Self::CreateDir { path, source } => {
                write!(f, "cannot create log directory `{}`: {source}", path.display())
            }
            Self::Backend(err) => write!(f, "cannot start logger: {err}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already runs with {active}; cannot switch to {requested}"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::InvalidLevel(_) | Self::RelativeDir(_) | Self::Conflict { .. } => None,
        }
    }
}

/// Starts rolling file logging at `level` under `log_dir`.
///
/// # Errors
/// - [`LoggingError::InvalidLevel`] or [`LoggingError::RelativeDir`] for bad input.
/// - [`LoggingError::Conflict`] when a logger with another target already runs.
/// - [`LoggingError::CreateDir`] / [`LoggingError::Backend`] when startup fails.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    let target = LogTarget {
        level: parse_level(level)?,
        dir: absolute_dir(log_dir.as_ref())?,
    };
    start(target)
}

/// Starts logging from the site's `log` section.
///
/// Returns `Ok(false)` when no directory is configured; logging then stays off.
pub fn init_logging_from(config: &LogConfig) -> Result<bool, LoggingError> {
    let Some(dir) = config.dir.as_deref() else {
        return Ok(false);
    };
    let level = match config.level.as_deref() {
        Some(level) => parse_level(level)?,
        None => default_log_level(),
    };
    start(LogTarget {
        level,
        dir: absolute_dir(dir)?,
    })?;
    Ok(true)
}

/// Target of the running logger, if any.
pub fn logging_status() -> Option<LogTarget> {
    ACTIVE.get().map(|active| active.target.clone())
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn start(target: LogTarget) -> Result<(), LoggingError> {
    let active = ACTIVE.get_or_try_init(|| spawn_logger(&target))?;
    if active.target != target {
        return Err(LoggingError::Conflict {
            active: active.target.clone(),
            requested: target,
        });
    }
    Ok(())
}

fn spawn_logger(target: &LogTarget) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&target.dir).map_err(|source| LoggingError::CreateDir {
        path: target.dir.clone(),
        source,
    })?;

    let spec = target.level.as_str().to_ascii_lowercase();
    let handle = Logger::try_with_str(&spec)
        .map_err(LoggingError::Backend)?
        .log_to_file(
            FileSpec::default()
                .directory(target.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    route_panics_to_log();
    info!(
        "event=logging_init module=runtime status=ok level={} log_dir={} version={} os={}",
        spec,
        target.dir.display(),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    Ok(ActiveLogger {
        target: target.clone(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    level
        .trim()
        .parse()
        .map_err(|_| LoggingError::InvalidLevel(level.trim().to_string()))
}

fn absolute_dir(dir: &Path) -> Result<PathBuf, LoggingError> {
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDir(dir.to_path_buf()));
    }
    Ok(dir.to_path_buf())
}

/// Runs once, from inside the logger's one-time init.
fn route_panics_to_log() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        error!(
            "event=panic module=runtime status=error location={} payload={}",
            location,
            first_line(payload, PANIC_LINE_CHARS)
        );
        previous(info);
    }));
}

/// First line of `text`, capped at `max_chars`, so one panic stays one log line.
fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut capped: String = line.chars().take(max_chars).collect();
    if capped.len() < text.len() {
        capped.push_str("...");
    }
    capped
}
