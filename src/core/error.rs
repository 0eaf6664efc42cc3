// src/core/error.rs

use crate::core::models::RecordId;
use thiserror::Error;

/// The target page could not be retrieved or read.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("Failed to fetch {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unsupported content type '{content_type}' at {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("Failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn from_request(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Request { url: url.to_string(), source }
        }
    }
}

/// A HEAD probe (link or header collection) did not produce a response.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Probe of {url} timed out")]
    Timeout { url: String },

    #[error("Probe of {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Probe task failed: {0}")]
    Task(String),
}

impl ProbeError {
    pub(crate) fn from_request(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ProbeError::Timeout { url: url.to_string() }
        } else {
            ProbeError::Request { url: url.to_string(), source }
        }
    }
}

/// TLS connection or certificate extraction failed.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("URL has no host")]
    MissingHost,

    #[error("TlsConnector Error: {0}")]
    Connector(#[source] native_tls::Error),

    #[error("TCP Connection Error: {0}")]
    Connect(#[source] std::io::Error),

    #[error("TLS Handshake Error: {0}")]
    Handshake(String),

    #[error("connection timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Server did not provide a certificate")]
    NoCertificate,

    #[error("Could not read peer certificate: {0}")]
    Certificate(String),

    #[error("X.509 Parse Error: {0}")]
    Parse(String),

    #[error("Task panicked: {0}")]
    Task(String),
}

/// The host could not be resolved to an address.
#[derive(Debug, Error)]
pub enum DnsError {
    #[error("URL has no host")]
    MissingHost,

    #[error("Lookup of {host} failed: {source}")]
    Lookup {
        host: String,
        #[source]
        source: hickory_resolver::error::ResolveError,
    },

    #[error("No address returned for {host}")]
    NoAddress { host: String },
}

/// Failures reported by the external record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record {0} not found")]
    NotFound(RecordId),

    #[error("Record has no id; it must be created before it is saved")]
    MissingId,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// The worker pool no longer accepts work.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Worker pool '{0}' has been shut down")]
    ShutDown(String),
}

/// Failures that escape every stage's local recovery and end the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Analysis record {0} does not exist")]
    RecordMissing(RecordId),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Analysis task panicked: {0}")]
    Panicked(String),
}
