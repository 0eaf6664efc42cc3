// src/lib.rs

//! Single-page website health analysis.
//!
//! An analysis fetches a page, probes a sample of its links, inspects its
//! TLS certificate, resolves its host, collects its security headers and
//! scores the result. Progress is written to an [`core::store::AnalysisStore`]
//! after every stage.

pub mod app;
pub mod config;
pub mod core;
pub mod logging;

pub use crate::app::App;
pub use crate::config::AnalyzerConfig;
pub use crate::core::models::{AnalysisRecord, AnalysisStatus, RecordId};
pub use crate::core::pipeline::{normalize_url, Orchestrator};
pub use crate::core::pool::WorkerPool;
pub use crate::core::store::{AnalysisStore, InMemoryStore};
