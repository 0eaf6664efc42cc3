// src/core/store.rs

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::core::error::StoreError;
use crate::core::models::{AnalysisRecord, RecordId};

/// The durable home of analysis records.
///
/// The pipeline only ever reads and upserts records that a caller created
/// first. Implementations must make `save` an idempotent upsert keyed by id.
pub trait AnalysisStore: Send + Sync {
    /// Persists a new record and returns the id assigned to it.
    fn create(&self, record: AnalysisRecord) -> Result<RecordId, StoreError>;

    fn get(&self, id: RecordId) -> Result<Option<AnalysisRecord>, StoreError>;

    /// Upserts `record` by its id and returns the stored value.
    fn save(&self, record: AnalysisRecord) -> Result<AnalysisRecord, StoreError>;

    fn list(&self) -> Result<Vec<AnalysisRecord>, StoreError>;
}

/// Process-local store backed by a map, used by the CLI and in tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<BTreeMap<RecordId, AnalysisRecord>>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<RecordId, AnalysisRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("record map lock poisoned".to_string()))
    }
}

impl AnalysisStore for InMemoryStore {
    fn create(&self, mut record: AnalysisRecord) -> Result<RecordId, StoreError> {
        let id = RecordId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        record.id = Some(id);
        self.lock()?.insert(id, record);
        debug!(%id, "Created analysis record.");
        Ok(id)
    }

    fn get(&self, id: RecordId) -> Result<Option<AnalysisRecord>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    fn save(&self, record: AnalysisRecord) -> Result<AnalysisRecord, StoreError> {
        let id = record.id.ok_or(StoreError::MissingId)?;
        self.lock()?.insert(id, record.clone());
        Ok(record)
    }

    fn list(&self) -> Result<Vec<AnalysisRecord>, StoreError> {
        Ok(self.lock()?.values().cloned().collect())
    }
}
