// src/app.rs

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::AnalyzerConfig;
use crate::core::error::{PipelineError, StoreError};
use crate::core::models::{AnalysisRecord, RecordId};
use crate::core::pipeline::{normalize_url, Orchestrator};
use crate::core::store::AnalysisStore;

/// The request-facing side of the analyzer: accepts a URL, creates the
/// placeholder record, hands the work to the orchestrator and serves stored
/// results back.
pub struct App {
    store: Arc<dyn AnalysisStore>,
    orchestrator: Orchestrator,
}

impl App {
    pub fn new(config: AnalyzerConfig, store: Arc<dyn AnalysisStore>) -> Result<Self, PipelineError> {
        let orchestrator = Orchestrator::from_config(config, Arc::clone(&store))?;
        Ok(Self { store, orchestrator })
    }

    pub fn with_orchestrator(orchestrator: Orchestrator) -> Self {
        Self { store: Arc::clone(orchestrator.store()), orchestrator }
    }

    /// Persists a placeholder for `raw_url` and schedules its analysis.
    ///
    /// Blank or unusable input is rejected before anything is stored.
    pub fn start_analysis(&self, raw_url: &str) -> Result<RecordId, PipelineError> {
        let url = normalize_url(raw_url)?;
        let placeholder = AnalysisRecord::placeholder(url.as_str());
        let id = self.store.create(placeholder.clone())?;
        info!(%id, url = %url, "Analysis requested.");

        if let Err(e) = self.orchestrator.submit(id, url.as_str()) {
            // Never leave a placeholder behind that no worker will pick up.
            let failed = AnalysisRecord { id: Some(id), ..placeholder }.failed(&e);
            self.store.save(failed)?;
            return Err(e.into());
        }
        Ok(id)
    }

    pub fn result(&self, id: RecordId) -> Result<Option<AnalysisRecord>, StoreError> {
        self.store.get(id)
    }

    pub fn history(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        self.store.list()
    }

    /// Polls the store until record `id` reaches a terminal state.
    pub async fn wait_for(&self, id: RecordId, poll_interval: Duration) -> Result<AnalysisRecord, PipelineError> {
        loop {
            let record = self.result(id)?.ok_or(PipelineError::RecordMissing(id))?;
            if record.status.is_terminal() {
                return Ok(record);
            }
            debug!(%id, status = %record.status, title = %record.title, "Analysis still in progress.");
            tokio::time::sleep(poll_interval).await;
        }
    }

    pub async fn shutdown(&self) {
        self.orchestrator.shutdown().await;
    }
}
