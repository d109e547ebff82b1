//! Rolling file logs for the desk core.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend once per process.
//! - Capture panics as sanitized `event=panic_captured` lines.
//!
//! # Invariants
//! - A second init with the same level and directory is a no-op.
//! - A second init with a different level or directory is rejected.
//! - Initialization never panics.

use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "cardesk";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    level: LogLevel,
    directory: PathBuf,
    _handle: LoggerHandle,
}

/// Log verbosity accepted by [`init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parses a case-insensitive level name; `warning` is accepted as `warn`.
    pub fn parse(raw: &str) -> Result<Self, LoggingError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LoggingError::UnknownLevel(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// `debug` for debug builds, `info` otherwise.
    pub fn build_default() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

/// Logging bootstrap settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Absolute directory receiving rotated log files.
    pub directory: PathBuf,
    /// Mirror warnings and errors to stderr (CLI use).
    pub echo_stderr: bool,
}

impl LogConfig {
    pub fn new(level: LogLevel, directory: impl Into<PathBuf>) -> Self {
        Self {
            level,
            directory: directory.into(),
            echo_stderr: false,
        }
    }
}

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    RelativeDirectory(PathBuf),
    EmptyDirectory,
    CreateDirectory { path: PathBuf, reason: String },
    Backend(String),
    Conflict { active: String, requested: String },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeDirectory(path) => write!(
                f,
                "log directory must be an absolute path, got `{}`",
                path.display()
            ),
            Self::EmptyDirectory => write!(f, "log directory cannot be empty"),
            Self::CreateDirectory { path, reason } => write!(
                f,
                "failed to create log directory `{}`: {reason}",
                path.display()
            ),
            Self::Backend(reason) => write!(f, "failed to start logger: {reason}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already initialized with `{active}`; refusing to switch to `{requested}`"
            ),
        }
    }
}

impl Error for LoggingError {}

/// Parses raw level and directory strings, then starts logging.
///
/// Convenience wrapper used by the FFI and CLI layers.
pub fn init_logging_from(level: &str, directory: &str) -> Result<(), LoggingError> {
    let trimmed = directory.trim();
    if trimmed.is_empty() {
        return Err(LoggingError::EmptyDirectory);
    }
    init_logging(&LogConfig::new(LogLevel::parse(level)?, trimmed))
}

/// Starts file logging for the process.
///
/// # Errors
/// - `RelativeDirectory` / `EmptyDirectory` for an unusable directory.
/// - `Conflict` when logging is already active with other settings.
/// - `CreateDirectory` / `Backend` when the backend cannot start.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let directory = validate_directory(&config.directory)?;

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_backend(config, &directory))?;
    if active.directory != directory || active.level != config.level {
        return Err(LoggingError::Conflict {
            active: describe(active.level, &active.directory),
            requested: describe(config.level, &directory),
        });
    }
    Ok(())
}

/// Returns `(level, directory)` of the active logger, if any.
pub fn logging_status() -> Option<(LogLevel, PathBuf)> {
    ACTIVE_LOGGER
        .get()
        .map(|active| (active.level, active.directory.clone()))
}

fn start_backend(config: &LogConfig, directory: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(directory).map_err(|err| LoggingError::CreateDirectory {
        path: directory.to_path_buf(),
        reason: err.to_string(),
    })?;

    let duplicate = if config.echo_stderr {
        Duplicate::Warn
    } else {
        Duplicate::None
    };
    let handle = Logger::try_with_str(config.level.as_str())
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(
            FileSpec::default()
                .directory(directory)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .duplicate_to_stderr(duplicate)
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook();
    info!(
        "event=logging_start module=logging status=ok level={} dir={} os={} version={}",
        config.level.as_str(),
        directory.display(),
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level: config.level,
        directory: directory.to_path_buf(),
        _handle: handle,
    })
}

fn validate_directory(directory: &Path) -> Result<PathBuf, LoggingError> {
    if directory.as_os_str().is_empty() {
        return Err(LoggingError::EmptyDirectory);
    }
    if !directory.is_absolute() {
        return Err(LoggingError::RelativeDirectory(directory.to_path_buf()));
    }
    Ok(directory.to_path_buf())
}

fn describe(level: LogLevel, directory: &Path) -> String {
    format!("{}@{}", level.as_str(), directory.display())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        // Card text can end up in panic messages; keep it short and single-line.
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location,
            single_line(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous(panic_info);
    }));
}

fn single_line(value: &str, max_chars: usize) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let mut truncated: String = flattened.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, single_line, LogConfig, LogLevel, LoggingError,
        MAX_LOG_FILES, MAX_LOG_FILE_SIZE_BYTES, MAX_PANIC_PAYLOAD_CHARS,
    };
    use std::path::PathBuf;

    #[test]
    fn level_parsing_is_case_insensitive() {
        assert_eq!(LogLevel::parse(" WARNING ").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::parse("Trace").unwrap(), LogLevel::Trace);
        assert!(matches!(
            LogLevel::parse("verbose"),
            Err(LoggingError::UnknownLevel(_))
        ));
    }

    #[test]
    fn relative_directory_is_rejected() {
        let err = init_logging(&LogConfig::new(LogLevel::Info, "logs/dev")).unwrap_err();
        assert!(matches!(err, LoggingError::RelativeDirectory(_)));
    }

    #[test]
    fn single_line_flattens_and_truncates() {
        let flattened = single_line("a\nb\rc", 3);
        assert_eq!(flattened, "a b...");
        assert_eq!(single_line("short", 10), "short");
    }

    #[test]
    fn rotation_limits_match_release_defaults() {
        assert_eq!(MAX_LOG_FILE_SIZE_BYTES, 10 * 1024 * 1024);
        assert_eq!(MAX_LOG_FILES, 5);
        let payload = "x".repeat(400);
        let capped = single_line(&payload, MAX_PANIC_PAYLOAD_CHARS);
        assert_eq!(capped.chars().count(), 160 + "...".len());
    }

    #[test]
    fn init_is_idempotent_and_rejects_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::new(LogLevel::Info, dir.path());

        init_logging(&config).unwrap();
        init_logging(&config).unwrap();

        let louder = LogConfig::new(LogLevel::Debug, dir.path());
        assert!(matches!(
            init_logging(&louder),
            Err(LoggingError::Conflict { .. })
        ));
        let elsewhere = LogConfig::new(LogLevel::Info, PathBuf::from("/tmp/cardesk-other-logs"));
        assert!(matches!(
            init_logging(&elsewhere),
            Err(LoggingError::Conflict { .. })
        ));

        let (level, active_dir) = logging_status().unwrap();
        assert_eq!(level, LogLevel::Info);
        assert_eq!(active_dir, dir.path());
    }
}
