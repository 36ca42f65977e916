//! Tracing subscriber set-up for the binary.
//!
//! Events always go to stderr. When a [`FileSink`] is configured they are
//! also written to a rotated log file, which survives runtimes that discard
//! a hook's stderr.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

/// Filter applied when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Rotated log files kept when no limit is given.
pub const DEFAULT_MAX_LOG_FILES: usize = 7;

const LOG_FILE_PREFIX: &str = "volhook";
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Output format for log events.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

/// Raised when parsing an unknown [`LogFormat`] name.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown log format '{0}' (expected text or json)")]
pub struct UnknownLogFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(UnknownLogFormat(value.to_owned())),
        }
    }
}

/// Directory that receives daily rotated `volhook.<date>.log` files.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileSink {
    /// Directory holding the log files. Created when missing.
    pub dir: PathBuf,
    /// Number of rotated files kept; older files are pruned.
    pub max_files: usize,
}

impl FileSink {
    /// Creates a sink in `dir` keeping [`DEFAULT_MAX_LOG_FILES`] files.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_files: DEFAULT_MAX_LOG_FILES,
        }
    }

    /// Overrides the number of files kept. At least one file is always kept.
    #[must_use]
    pub fn max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files.max(1);
        self
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log directory could not be created.
    #[error("unable to create log directory {}: {source}", .path.display())]
    Directory {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The rolling log file could not be opened.
    #[error("unable to open log file in {}: {source}", .path.display())]
    Appender {
        /// Directory that was requested.
        path: PathBuf,
        /// Error reported by the appender.
        #[source]
        source: InitError,
    },
    /// A global subscriber is already installed.
    #[error("logging already initialised: {0}")]
    AlreadyInitialised(#[from] TryInitError),
}

/// Opens the rotating appender for `sink`, creating its directory first.
///
/// # Errors
///
/// Returns [`LoggingError::Directory`] when the directory cannot be created
/// and [`LoggingError::Appender`] when the log file cannot be opened.
pub fn file_appender(sink: &FileSink) -> Result<RollingFileAppender, LoggingError> {
    fs::create_dir_all(&sink.dir).map_err(|source| LoggingError::Directory {
        path: sink.dir.clone(),
        source,
    })?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(sink.max_files.max(1))
        .build(&sink.dir)
        .map_err(|source| LoggingError::Appender {
            path: sink.dir.clone(),
            source,
        })
}

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG`, falling back to [`DEFAULT_FILTER`], and
/// applies to every sink. File output uses the same format as stderr without
/// ANSI colours.
///
/// # Errors
///
/// Returns [`LoggingError`] when the file sink cannot be opened or a global
/// subscriber is already installed. Nothing is installed on error.
pub fn init(format: LogFormat, file: Option<&FileSink>) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let mut layers = vec![stderr_layer(format)];
    if let Some(sink) = file {
        layers.push(file_layer(format, file_appender(sink)?));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;
    Ok(())
}

fn stderr_layer(format: LogFormat) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
    match format {
        LogFormat::Text => layer.with_target(true).boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn file_layer(format: LogFormat, writer: RollingFileAppender) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer);
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}
