//! Tracing setup shared by the server and the CLI.
//!
//! Events go to stdout and to a log file. `DOCPIPE_LOG_FILE` names the file explicitly;
//! otherwise a daily-rotated `docpipe.log` is written under `DOCPIPE_LOG_DIR` (default `logs`).
//! The file layer writes through a non-blocking worker so slow disks never stall a polling loop.
use std::env;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable naming an explicit log file.
pub const LOG_FILE_VAR: &str = "DOCPIPE_LOG_FILE";

/// Environment variable naming the directory for rotated logs.
pub const LOG_DIR_VAR: &str = "DOCPIPE_LOG_DIR";

const DEFAULT_LOG_DIR: &str = "logs";
const LOG_FILE_NAME: &str = "docpipe.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where file logs are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Append to one fixed file.
    File(PathBuf),
    /// Rotate `docpipe.log` daily inside a directory.
    Rolling {
        /// Directory receiving the rotated files.
        directory: PathBuf,
    },
}

impl LogDestination {
    /// Resolve the destination from `DOCPIPE_LOG_FILE` and `DOCPIPE_LOG_DIR`.
    pub fn from_env() -> Self {
        Self::resolve(env::var(LOG_FILE_VAR).ok(), env::var(LOG_DIR_VAR).ok())
    }

    fn resolve(file: Option<String>, directory: Option<String>) -> Self {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        match (non_blank(file), non_blank(directory)) {
            (Some(file), _) => Self::File(PathBuf::from(file)),
            (None, directory) => Self::Rolling {
                directory: PathBuf::from(directory.as_deref().unwrap_or(DEFAULT_LOG_DIR)),
            },
        }
    }

    fn writer(&self) -> io::Result<NonBlocking> {
        let (writer, guard) = match self {
            Self::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                tracing_appender::non_blocking(file)
            }
            Self::Rolling { directory } => {
                fs::create_dir_all(directory)?;
                tracing_appender::non_blocking(tracing_appender::rolling::daily(
                    directory,
                    LOG_FILE_NAME,
                ))
            }
        };
        let _ = LOG_GUARD.set(guard);
        Ok(writer)
    }
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`), compact stdout output and,
/// when the destination can be opened, a plain-text file layer.
///
/// Calling it twice is harmless; the first subscriber stays installed.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let destination = LogDestination::from_env();
    let file_layer = match destination.writer() {
        Ok(writer) => Some(
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact(),
        ),
        Err(err) => {
            eprintln!("File logging disabled for {destination:?}: {err}");
            None
        }
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_file_wins_over_directory() {
        let destination =
            LogDestination::resolve(Some("/tmp/docpipe.log".into()), Some("/var/log".into()));
        assert_eq!(destination, LogDestination::File("/tmp/docpipe.log".into()));
    }

    #[test]
    fn blank_values_fall_back_to_default_directory() {
        let destination = LogDestination::resolve(Some("  ".into()), None);
        assert_eq!(
            destination,
            LogDestination::Rolling {
                directory: DEFAULT_LOG_DIR.into()
            }
        );
    }

    #[test]
    fn file_destination_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/docpipe.log");

        LogDestination::File(path.clone()).writer().expect("writer");

        assert!(path.exists());
    }
}
