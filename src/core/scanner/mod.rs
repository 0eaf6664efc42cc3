// src/core/scanner/mod.rs

// One module per pipeline stage. Each exposes a `run_*_scan` function that
// returns the stage's typed result, and the network stages other than the
// page fetch also expose a wrapper that folds failures into record values.
pub mod dns_scanner;
pub mod headers_scanner;
pub mod links_scanner;
pub mod page_scanner;
pub mod ssl_scanner;

use std::time::Duration;

use reqwest::Client;

/// Builds an HTTP client whose connect and total timeouts are both `timeout`.
///
/// Redirects are followed with reqwest's default policy.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
}
