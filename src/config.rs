// src/config.rs

//! Runtime settings for the analyzer.
//!
//! Defaults are the values the pipeline was tuned with. Each one can be
//! overridden through a `VANGUARD_SITE_ANALYZER_*` environment variable and
//! then again through command-line flags.

use lazy_static::lazy_static;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::logging::PROJECT_NAME;

lazy_static! {
    static ref ENV_PREFIX: String = format!("{}_", PROJECT_NAME.clone());
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Worker slots for top-level analyses.
    pub analysis_workers: usize,
    /// Worker slots for link probes when they get their own pool.
    pub probe_workers: usize,
    /// Run link probes on the analysis pool instead of a dedicated one.
    pub shared_pool: bool,
    /// How many links are probed per page.
    pub sample_cap: usize,
    pub fetch_timeout: Duration,
    /// Per-probe timeout for link and header HEAD requests.
    pub probe_timeout: Duration,
    pub tls_timeout: Duration,
    pub user_agent: String,
    /// Attempts per store write before the failure surfaces.
    pub save_attempts: u32,
    pub save_retry_delay: Duration,
    pub log_dir: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            analysis_workers: 6,
            probe_workers: 10,
            shared_pool: false,
            sample_cap: 10,
            fetch_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(4),
            tls_timeout: Duration::from_secs(4),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            save_attempts: 3,
            save_retry_delay: Duration::from_millis(200),
            log_dir: None,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(format!("{}{}", *ENV_PREFIX, key)).ok())
    }

    /// Applies overrides from any key lookup; unparsable values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_value(&lookup, "WORKERS") {
            self.analysis_workers = v;
        }
        if let Some(v) = parse_value(&lookup, "PROBE_WORKERS") {
            self.probe_workers = v;
        }
        if let Some(v) = parse_value(&lookup, "SHARED_POOL") {
            self.shared_pool = v;
        }
        if let Some(v) = parse_value(&lookup, "SAMPLE_CAP") {
            self.sample_cap = v;
        }
        if let Some(ms) = parse_value(&lookup, "FETCH_TIMEOUT_MS") {
            self.fetch_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_value(&lookup, "PROBE_TIMEOUT_MS") {
            self.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_value(&lookup, "TLS_TIMEOUT_MS") {
            self.tls_timeout = Duration::from_millis(ms);
        }
        if let Some(agent) = lookup("USER_AGENT").filter(|a| !a.trim().is_empty()) {
            self.user_agent = agent;
        }
        if let Some(v) = parse_value(&lookup, "SAVE_ATTEMPTS") {
            self.save_attempts = v;
        }
        if let Some(ms) = parse_value(&lookup, "SAVE_RETRY_DELAY_MS") {
            self.save_retry_delay = Duration::from_millis(ms);
        }
        if let Some(dir) = lookup("LOG_DIR").filter(|d| !d.trim().is_empty()) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        self
    }
}

fn parse_value<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => {
            debug!(key, value = %raw, "Config override applied.");
            Some(value)
        }
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable config override.");
            None
        }
    }
}
