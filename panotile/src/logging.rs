//! Logging infrastructure.
//!
//! - Writes to the configured log file (cleared on session start)
//! - Optionally mirrors to stdout for interactive runs
//! - Configurable via the RUST_LOG environment variable (default `info`)

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the global tracing subscriber.
///
/// # Arguments
///
/// * `log_file` - Path of the log file; parent directories are created
/// * `stdout` - Also print events to stdout
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the file
/// cannot be truncated.
pub fn init_logging(log_file: &Path, stdout: bool) -> Result<LoggingGuard, io::Error> {
    let (dir, name) = prepare_log_file(log_file)?;

    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .pretty();

    let stdout_layer = stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .compact()
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Create the log directory and truncate the log file.
///
/// Returns the directory and file name for the appender.
fn prepare_log_file(log_file: &Path) -> Result<(PathBuf, OsString), io::Error> {
    let name = log_file
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("log path has no file name: {}", log_file.display()),
            )
        })?;
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&dir)?;
    fs::write(log_file, "")?;
    Ok((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_nested_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("deep/nested/panotile.log");

        let (dir, name) = prepare_log_file(&path).unwrap();

        assert_eq!(dir, temp.path().join("deep/nested"));
        assert_eq!(name, "panotile.log");
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_clears_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("panotile.log");
        fs::write(&path, "old log data").unwrap();

        prepare_log_file(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_path_without_file_name_rejected() {
        let err = prepare_log_file(Path::new("/")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_guard_structure() {
        use tracing_appender::non_blocking::NonBlocking;

        let (non_blocking, guard) = NonBlocking::new(std::io::sink());
        drop(non_blocking);

        let _logging_guard = LoggingGuard { _file_guard: guard };
    }

    // Actual log output needs a global subscriber, which can only be set once
    // per process; it is exercised by running the CLI.
}
