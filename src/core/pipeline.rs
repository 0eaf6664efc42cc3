// src/core/pipeline.rs

//! The analysis pipeline: fetch, link probes, TLS, DNS, headers, score.
//!
//! Stages run in that fixed order inside one pool unit per analysis. The
//! record is handed from stage to stage by value and committed to the store
//! after every stage, so observers can watch an analysis progress. Only the
//! page fetch, store failures, an unusable URL or a panic end the pipeline;
//! they are turned into the terminal failure record at the boundary in
//! [`Orchestrator::submit`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use reqwest::Client;
use tracing::{debug, error, info, info_span, warn, Instrument};
use url::Url;

use crate::config::AnalyzerConfig;
use crate::core::error::{PipelineError, PoolError, StoreError};
use crate::core::models::{AnalysisRecord, RecordId};
use crate::core::pool::WorkerPool;
use crate::core::scanner::dns_scanner::DomainResolver;
use crate::core::scanner::{build_client, headers_scanner, links_scanner, page_scanner, ssl_scanner};
use crate::core::store::AnalysisStore;

/// Prefixes `https://` unless the input already names the `http` or `https`
/// scheme. Plain-http inputs are left on http rather than upgraded.
pub fn normalize_url(raw: &str) -> Result<Url, PipelineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL is empty".to_string(),
        });
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("https://") || lower.starts_with("http://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|e| PipelineError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(PipelineError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL has no host".to_string(),
        });
    }
    Ok(url)
}

/// Schedules analyses onto the worker pool and drives each one to a
/// terminal record.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Pipeline>,
}

struct Pipeline {
    config: AnalyzerConfig,
    store: Arc<dyn AnalysisStore>,
    analysis_pool: Arc<WorkerPool>,
    probe_pool: Arc<WorkerPool>,
    page_client: Client,
    probe_client: Client,
    resolver: DomainResolver,
}

impl Orchestrator {
    /// Creates the pools described by `config` and an orchestrator over them.
    pub fn from_config(config: AnalyzerConfig, store: Arc<dyn AnalysisStore>) -> Result<Self, PipelineError> {
        let analysis_pool = Arc::new(WorkerPool::new("analysis", config.analysis_workers));
        let probe_pool = if config.shared_pool {
            Arc::clone(&analysis_pool)
        } else {
            Arc::new(WorkerPool::new("probes", config.probe_workers))
        };
        Self::new(config, store, analysis_pool, probe_pool)
    }

    /// Uses the given pools; pass the same pool twice to share it between
    /// analyses and link probes.
    pub fn new(
        config: AnalyzerConfig,
        store: Arc<dyn AnalysisStore>,
        analysis_pool: Arc<WorkerPool>,
        probe_pool: Arc<WorkerPool>,
    ) -> Result<Self, PipelineError> {
        let page_client =
            build_client(&config.user_agent, config.fetch_timeout).map_err(PipelineError::HttpClient)?;
        let probe_client =
            build_client(&config.user_agent, config.probe_timeout).map_err(PipelineError::HttpClient)?;
        let resolver = DomainResolver::from_system_conf(config.probe_timeout);

        Ok(Self {
            inner: Arc::new(Pipeline {
                config,
                store,
                analysis_pool,
                probe_pool,
                page_client,
                probe_client,
                resolver,
            }),
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn AnalysisStore> {
        &self.inner.store
    }

    /// Queues the analysis of record `id` and returns immediately.
    ///
    /// The record must already exist in the store. The only outcome is the
    /// eventual mutation of that record.
    pub fn submit(&self, id: RecordId, url: impl Into<String>) -> Result<(), PoolError> {
        let pipeline = Arc::clone(&self.inner);
        let url = url.into();
        debug!(%id, url = %url, "Submitting analysis.");
        let span = info_span!("analysis", %id);
        // Detached: the handle is not needed to observe the result.
        let _detached = self
            .inner
            .analysis_pool
            .spawn(async move { pipeline.run(id, url).await }.instrument(span))?;
        Ok(())
    }

    /// Stops accepting analyses and waits for queued and running ones.
    pub async fn shutdown(&self) {
        self.inner.analysis_pool.shutdown().await;
        if !Arc::ptr_eq(&self.inner.analysis_pool, &self.inner.probe_pool) {
            self.inner.probe_pool.shutdown().await;
        }
    }
}

impl Pipeline {
    async fn run(&self, id: RecordId, url: String) {
        let outcome = AssertUnwindSafe(self.analyze(id, &url))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PipelineError::Panicked(panic_message(panic.as_ref()))));

        match outcome {
            Ok(record) => info!(score = record.score, "Analysis complete."),
            Err(PipelineError::RecordMissing(missing)) => {
                error!(id = %missing, "Analysis record vanished; nothing to update.");
            }
            Err(e) => {
                error!(error = %e, "Analysis failed; writing terminal failure record.");
                self.record_failure(id, &e).await;
            }
        }
    }

    async fn analyze(&self, id: RecordId, raw_url: &str) -> Result<AnalysisRecord, PipelineError> {
        let record = self.load(id)?;
        let url = normalize_url(raw_url)?;
        let config = &self.config;
        info!(url = %url, "Starting analysis.");

        let record = self.commit(record.started(url.as_str())).await?;

        let page = page_scanner::run_page_scan(&self.page_client, url.as_str()).await?;
        let record = self.commit(record.with_page(&page)).await?;

        let links = links_scanner::run_links_scan(
            &self.probe_client,
            &self.probe_pool,
            &page.links,
            config.sample_cap,
            config.probe_timeout,
        )
        .await;
        let record = self.commit(record.with_broken_links(links.broken)).await?;

        let tls = ssl_scanner::inspect_tls(&url, config.tls_timeout).await;
        let record = self.commit(record.with_tls(tls)).await?;

        let domain_info = self.resolver.resolve_domain(&url).await;
        let record = self.commit(record.with_domain_info(domain_info)).await?;

        let headers = headers_scanner::collect_headers(&self.probe_client, url.as_str()).await;
        let record = self.commit(record.with_security_headers(headers)).await?;

        Ok(self.commit(record.completed()).await?)
    }

    fn load(&self, id: RecordId) -> Result<AnalysisRecord, PipelineError> {
        self.store.get(id)?.ok_or(PipelineError::RecordMissing(id))
    }

    /// Saves `record`, retrying a bounded number of times before the error
    /// surfaces.
    async fn commit(&self, record: AnalysisRecord) -> Result<AnalysisRecord, StoreError> {
        let attempts = self.config.save_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.save(record.clone()) {
                Ok(saved) => return Ok(saved),
                Err(e) if attempt < attempts => {
                    warn!(attempt, attempts, error = %e, "Saving analysis record failed; retrying.");
                    attempt += 1;
                    tokio::time::sleep(self.config.save_retry_delay).await;
                }
                Err(e) => {
                    error!(attempts, error = %e, "Saving analysis record failed.");
                    return Err(e);
                }
            }
        }
    }

    async fn record_failure(&self, id: RecordId, reason: &PipelineError) {
        let current = match self.load(id) {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Cannot load record to mark it failed.");
                return;
            }
        };
        if let Err(e) = self.commit(current.failed(reason)).await {
            error!(error = %e, "Terminal failure record could not be saved.");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_https() {
        let url = normalize_url("example.test").unwrap();
        assert_eq!(url.as_str(), "https://example.test/");
    }

    #[test]
    fn https_input_is_kept() {
        let url = normalize_url("  https://example.test/path?q=1 ").unwrap();
        assert_eq!(url.as_str(), "https://example.test/path?q=1");
    }

    #[test]
    fn plain_http_input_is_not_upgraded() {
        // Both scheme prefixes count as already normalized; http stays http.
        let url = normalize_url("http://example.test").unwrap();
        assert_eq!(url.scheme(), "http");
        let url = normalize_url("HTTP://example.test").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn blank_input_is_rejected() {
        assert!(matches!(normalize_url("   "), Err(PipelineError::InvalidUrl { .. })));
    }

    #[test]
    fn unparsable_input_is_rejected() {
        assert!(matches!(normalize_url("https://exa mple.test"), Err(PipelineError::InvalidUrl { .. })));
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
