//! Log output: stderr plus a full log file and an errors-only file.
//!
//! [`init`] builds the subscriber once at startup and hands back a
//! [`LogHandle`]. Nothing is installed process-wide; the caller runs its
//! work inside [`LogHandle::scope`].

use std::path::{Path, PathBuf};

use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{self, Config};

/// Name of the errors-only log file inside the log folder.
const ERROR_LOG_FILE: &str = "errors.log";

/// The configured logging pipeline.
pub struct LogHandle {
    dispatch: Dispatch,
    log_file: Option<PathBuf>,
}

impl LogHandle {
    /// Run `f` with this handle receiving all `tracing` events.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Path of the main log file, if file logging could be set up.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Console level for a `-v` count, falling back to the configured level.
pub fn console_level(config: &Config, verbosity: u8) -> &str {
    match verbosity {
        0 => config.logging.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Set up stderr and file logging.
///
/// `RUST_LOG` overrides the console level. If the log folder cannot be
/// created, only stderr is used.
pub fn init(config: &Config, verbosity: u8) -> LogHandle {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level(config, verbosity)));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let log_dir = &config.files.logs_dir;
    let log_file = config::log_file_path(config);
    let file_layers = std::fs::create_dir_all(log_dir).is_ok().then(|| {
        let file_name = log_file
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "attachgrab.log".into());
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(tracing_appender::rolling::never(log_dir, file_name))
            .with_filter(EnvFilter::new(&config.logging.file_level));
        let error_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(tracing_appender::rolling::never(log_dir, ERROR_LOG_FILE))
            .with_filter(LevelFilter::ERROR);
        (file_layer, error_layer)
    });
    let has_files = file_layers.is_some();
    let (file_layer, error_layer) = file_layers.unzip();

    let subscriber = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(error_layer);

    LogHandle {
        dispatch: Dispatch::new(subscriber),
        log_file: has_files.then_some(log_file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_level() {
        let cfg = Config::default();
        assert_eq!(console_level(&cfg, 0), "info");
        assert_eq!(console_level(&cfg, 2), "debug");
        assert_eq!(console_level(&cfg, 9), "trace");
    }

    #[test]
    fn test_init_writes_log_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.files.logs_dir = tmp.path().join("logs");

        let handle = init(&cfg, 0);
        handle.scope(|| tracing::error!("disk on fire"));

        let log_file = handle.log_file().expect("file logging enabled");
        let contents = std::fs::read_to_string(log_file).unwrap();
        assert!(contents.contains("disk on fire"));
        let errors = std::fs::read_to_string(tmp.path().join("logs").join(ERROR_LOG_FILE)).unwrap();
        assert!(errors.contains("disk on fire"));
    }

    #[test]
    fn test_refused_connection_reaches_error_log() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.files.logs_dir = tmp.path().join("logs");
        cfg.imap.host = "127.0.0.1".to_string();
        cfg.imap.port = 1;

        let handle = init(&cfg, 0);
        let credentials = config::Credentials::new("someone@example.com", "secret");
        let result = handle.scope(|| crate::mail::connect(&cfg.imap, &credentials));
        assert!(result.is_err());

        let errors = std::fs::read_to_string(tmp.path().join("logs").join(ERROR_LOG_FILE)).unwrap();
        assert!(errors.contains("Could not open mailbox"));
        assert!(!errors.contains("secret"));
    }

    #[test]
    fn test_warnings_stay_out_of_error_log() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.files.logs_dir = tmp.path().join("logs");

        let handle = init(&cfg, 0);
        handle.scope(|| tracing::warn!("just a warning"));

        let main_log = std::fs::read_to_string(handle.log_file().unwrap()).unwrap();
        assert!(main_log.contains("just a warning"));
        let errors = std::fs::read_to_string(tmp.path().join("logs").join(ERROR_LOG_FILE)).unwrap();
        assert!(errors.is_empty());
    }
}
