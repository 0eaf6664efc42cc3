// src/cli.rs

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use vanguard_site_analyzer::AnalyzerConfig;

/// Analyze one web page: content, links, TLS, DNS and security headers.
#[derive(Parser, Debug)]
#[command(name = "vanguard-site-analyzer", version, about)]
pub struct Cli {
    /// Page to analyze; `https://` is assumed when no scheme is given
    pub url: String,

    /// Worker slots for analyses
    #[arg(long)]
    pub workers: Option<usize>,

    /// Worker slots for link probes
    #[arg(long)]
    pub probe_workers: Option<usize>,

    /// Run link probes on the analysis pool instead of their own
    #[arg(long)]
    pub shared_pool: bool,

    /// Number of links probed per page
    #[arg(long)]
    pub sample_cap: Option<usize>,

    /// Directory for the log file
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Give up waiting for the result after this many seconds
    #[arg(long, default_value_t = 120)]
    pub max_wait_secs: u64,

    /// Print the stored record as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Layers the flags given on the command line over `config`.
    pub fn apply(&self, mut config: AnalyzerConfig) -> AnalyzerConfig {
        if let Some(workers) = self.workers {
            config.analysis_workers = workers;
        }
        if let Some(workers) = self.probe_workers {
            config.probe_workers = workers;
        }
        if self.shared_pool {
            config.shared_pool = true;
        }
        if let Some(cap) = self.sample_cap {
            config.sample_cap = cap;
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        config
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}
