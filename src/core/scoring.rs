// src/core/scoring.rs

//! Aggregates the stage results into a 0-100 health score.
//!
//! Each signal is all-or-nothing; there is no partial credit.

use crate::core::models::{AnalysisRecord, SecurityHeaders, DOMAIN_LOOKUP_FAILED, FAILURE_MARKER};

pub const SSL_WEIGHT: u8 = 30;
pub const NO_BROKEN_LINKS_WEIGHT: u8 = 20;
pub const SECURITY_HEADERS_WEIGHT: u8 = 30;
pub const DOMAIN_INFO_WEIGHT: u8 = 20;

pub fn score(ssl_valid: bool, broken_links: u32, security_headers: &SecurityHeaders, domain_info: &str) -> u8 {
    let mut score = 0;
    if ssl_valid {
        score += SSL_WEIGHT;
    }
    if broken_links == 0 {
        score += NO_BROKEN_LINKS_WEIGHT;
    }
    if !security_headers.is_empty() {
        score += SECURITY_HEADERS_WEIGHT;
    }
    if has_domain_info(domain_info) {
        score += DOMAIN_INFO_WEIGHT;
    }
    score
}

/// Blank text and the fixed failure markers carry no domain information.
pub fn has_domain_info(domain_info: &str) -> bool {
    let info = domain_info.trim();
    !info.is_empty() && info != DOMAIN_LOOKUP_FAILED && info != FAILURE_MARKER
}

pub fn score_record(record: &AnalysisRecord) -> u8 {
    score(record.ssl_valid, record.broken_links, &record.security_headers, &record.domain_info)
}
