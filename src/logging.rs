// src/logging.rs

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use tracing_error::ErrorLayer;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

/// Where the log file goes when no directory is configured: the platform's
/// local data directory for this crate, or `./.data` when there is none.
pub fn default_log_dir() -> PathBuf {
    ProjectDirs::from("dev", "vanguard", env!("CARGO_PKG_NAME"))
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".data"))
}

/// The filter directive used when neither `RUST_LOG` nor the crate's own
/// log-level variable is set.
pub fn default_directive() -> String {
    format!("{}=info", env!("CARGO_CRATE_NAME"))
}

/// Initializes file-based logging and returns the path of the log file.
///
/// Logs go to `log_dir` when given, otherwise to the platform data
/// directory. Pipeline events are never written to the terminal so the CLI
/// output stays clean.
pub fn initialize_logging(log_dir: Option<&Path>) -> Result<PathBuf> {
    let directory = log_dir.map(Path::to_path_buf).unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&directory)?;
    let log_path = directory.join(LOG_FILE.clone());
    let log_file = std::fs::File::create(&log_path)?;

    let file_log_level = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.clone()))
        .unwrap_or_else(|_| default_directive());

    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_filter(EnvFilter::new(file_log_level));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(log_path)
}
