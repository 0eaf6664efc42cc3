// src/core/models.rs

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumIter, IntoEnumIterator};

// --- Fixed Record Values ---

pub const PLACEHOLDER_TITLE: &str = "Analyzing...";
pub const PLACEHOLDER_DESCRIPTION: &str = "Please wait, analysis is in progress...";
pub const FAILURE_TITLE: &str = "Error fetching website";
pub const FAILURE_MARKER: &str = "Error";
pub const NO_SSL: &str = "No SSL";
pub const SSL_ERROR_PREFIX: &str = "SSL error: ";
pub const DOMAIN_LOOKUP_FAILED: &str = "Domain lookup failed";

// --- Identifiers & Status ---

/// Opaque identifier assigned by the store on first persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a record is in its lifecycle. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

// --- Security Headers ---

/// The allow-list of response headers the header collector looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum SecurityHeader {
    #[strum(to_string = "Content-Security-Policy")]
    ContentSecurityPolicy,
    #[strum(to_string = "Strict-Transport-Security")]
    StrictTransportSecurity,
    #[strum(to_string = "X-Frame-Options")]
    XFrameOptions,
    #[strum(to_string = "X-Content-Type-Options")]
    XContentTypeOptions,
    #[strum(to_string = "Referrer-Policy")]
    ReferrerPolicy,
}

impl SecurityHeader {
    pub fn all() -> impl Iterator<Item = SecurityHeader> {
        SecurityHeader::iter()
    }
}

/// Header name -> value, only for allow-listed headers that were present.
pub type SecurityHeaders = BTreeMap<String, String>;

// --- Stage Outputs ---

/// What the page fetcher extracts from the target document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub title: String,
    pub meta_description: String,
    pub word_count: u32,
    /// Distinct absolute hyperlink targets of any scheme, in first-seen order.
    pub links: Vec<String>,
}

/// Certificate data pulled from a successful TLS handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub subject_name: String,
    pub issuer_name: String,
    pub not_before: DateTime<Local>,
    pub not_after: DateTime<Local>,
    pub is_valid: bool,
}

/// The three TLS fields as they land on the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSummary {
    pub valid: bool,
    pub issuer: String,
    pub expiry: Option<DateTime<Local>>,
}

impl TlsSummary {
    pub fn no_ssl() -> Self {
        Self { valid: false, issuer: NO_SSL.to_string(), expiry: None }
    }

    pub fn error(reason: impl fmt::Display) -> Self {
        Self { valid: false, issuer: format!("{SSL_ERROR_PREFIX}{reason}"), expiry: None }
    }
}

impl From<CertificateInfo> for TlsSummary {
    fn from(cert: CertificateInfo) -> Self {
        Self { valid: cert.is_valid, issuer: cert.issuer_name, expiry: Some(cert.not_after) }
    }
}

// --- Analysis Record ---

/// The persisted outcome of one URL analysis.
///
/// Every pipeline stage takes the record by value and hands back an updated
/// copy; the orchestrator commits each copy to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Option<RecordId>,
    pub url: String,
    pub status: AnalysisStatus,
    pub title: String,
    pub meta_description: String,
    pub word_count: u32,
    pub total_links: u32,
    pub broken_links: u32,
    pub ssl_valid: bool,
    pub ssl_issuer: String,
    pub ssl_expiry: Option<DateTime<Local>>,
    pub domain_info: String,
    pub security_headers: SecurityHeaders,
    pub score: u8,
    pub analyzed_at: Option<DateTime<Local>>,
}

impl AnalysisRecord {
    /// The sentinel record persisted by the caller before the pipeline runs.
    pub fn placeholder(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            status: AnalysisStatus::Pending,
            title: PLACEHOLDER_TITLE.to_string(),
            meta_description: PLACEHOLDER_DESCRIPTION.to_string(),
            word_count: 0,
            total_links: 0,
            broken_links: 0,
            ssl_valid: false,
            ssl_issuer: String::new(),
            ssl_expiry: None,
            domain_info: String::new(),
            security_headers: SecurityHeaders::new(),
            score: 0,
            analyzed_at: None,
        }
    }

    pub fn started(self, url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: AnalysisStatus::Running,
            analyzed_at: Some(Local::now()),
            ..self
        }
    }

    pub fn with_page(self, page: &PageSummary) -> Self {
        Self {
            title: page.title.clone(),
            meta_description: page.meta_description.clone(),
            word_count: page.word_count,
            total_links: u32::try_from(page.links.len()).unwrap_or(u32::MAX),
            analyzed_at: Some(Local::now()),
            ..self
        }
    }

    pub fn with_broken_links(self, broken_links: u32) -> Self {
        Self { broken_links, analyzed_at: Some(Local::now()), ..self }
    }

    pub fn with_tls(self, tls: TlsSummary) -> Self {
        Self {
            ssl_valid: tls.valid,
            ssl_issuer: tls.issuer,
            ssl_expiry: tls.expiry,
            analyzed_at: Some(Local::now()),
            ..self
        }
    }

    pub fn with_domain_info(self, domain_info: String) -> Self {
        Self { domain_info, analyzed_at: Some(Local::now()), ..self }
    }

    pub fn with_security_headers(self, security_headers: SecurityHeaders) -> Self {
        Self { security_headers, analyzed_at: Some(Local::now()), ..self }
    }

    /// Computes the score from the stage results and marks the record complete.
    pub fn completed(self) -> Self {
        let score = crate::core::scoring::score_record(&self);
        Self {
            score,
            status: AnalysisStatus::Completed,
            analyzed_at: Some(Local::now()),
            ..self
        }
    }

    /// The zeroed terminal state written when the pipeline cannot finish.
    pub fn failed(self, reason: impl fmt::Display) -> Self {
        Self {
            status: AnalysisStatus::Failed,
            title: FAILURE_TITLE.to_string(),
            meta_description: reason.to_string(),
            word_count: 0,
            total_links: 0,
            broken_links: 0,
            ssl_valid: false,
            ssl_issuer: FAILURE_MARKER.to_string(),
            ssl_expiry: None,
            domain_info: FAILURE_MARKER.to_string(),
            security_headers: SecurityHeaders::new(),
            score: 0,
            analyzed_at: Some(Local::now()),
            ..self
        }
    }
}
