// src/core/scanner/headers_scanner.rs

use tracing::{debug, info, warn};
use crate::core::error::ProbeError;
use crate::core::models::{SecurityHeader, SecurityHeaders};
use reqwest::Client;
use reqwest::header::HeaderMap;

/// Returns the allow-listed security headers of `url`, or an empty map when
/// the probe fails.
pub async fn collect_headers(client: &Client, url: &str) -> SecurityHeaders {
    match run_headers_scan(client, url).await {
        Ok(headers) => headers,
        Err(e) => {
            warn!(url, error = %e, "Header probe failed; recording no security headers.");
            SecurityHeaders::new()
        }
    }
}

/// Sends one HEAD request and picks the allow-listed headers off the response.
pub async fn run_headers_scan(client: &Client, url: &str) -> Result<SecurityHeaders, ProbeError> {
    info!(url, "Starting headers scan.");

    let response = client.head(url).send().await.map_err(|e| ProbeError::from_request(url, e))?;
    info!(status = %response.status(), "Received HTTP response for headers scan.");

    let headers = extract_security_headers(response.headers());
    info!(found = headers.len(), "Headers scan finished.");
    Ok(headers)
}

/// Keeps only the allow-listed headers that are present. Absent headers are
/// left out rather than recorded as empty.
pub fn extract_security_headers(headers: &HeaderMap) -> SecurityHeaders {
    let mut found = SecurityHeaders::new();
    for header in SecurityHeader::all() {
        let name = header.to_string();
        let Some(value) = headers.get(name.as_str()) else {
            debug!(header_name = %name, "Header not found.");
            continue;
        };
        let value = match value.to_str() {
            Ok(s) => s.to_string(),
            Err(_) => {
                warn!(header_name = %name, "Header found but contained invalid UTF-8.");
                "[Invalid UTF-8]".to_string()
            }
        };
        debug!(header_name = %name, value = %value, "Header found.");
        found.insert(name, value);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};
    use std::time::Duration;

    #[test]
    fn keeps_only_present_allow_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
        headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
        headers.insert("server", HeaderValue::from_static("nginx"));

        let found = extract_security_headers(&headers);

        assert_eq!(found.len(), 2);
        assert_eq!(found.get("X-Frame-Options").map(String::as_str), Some("DENY"));
        assert_eq!(found.get("Referrer-Policy").map(String::as_str), Some("no-referrer"));
        assert!(!found.contains_key("Content-Security-Policy"));
    }

    #[test]
    fn non_utf8_values_are_marked() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_bytes(b"default-src \xff").unwrap(),
        );
        let found = extract_security_headers(&headers);
        assert_eq!(found.get("Content-Security-Policy").map(String::as_str), Some("[Invalid UTF-8]"));
    }

    #[tokio::test]
    async fn probe_collects_all_five_headers() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("HEAD", "/")
            .with_status(200)
            .with_header("content-security-policy", "default-src 'self'")
            .with_header("strict-transport-security", "max-age=63072000")
            .with_header("x-frame-options", "SAMEORIGIN")
            .with_header("x-content-type-options", "nosniff")
            .with_header("referrer-policy", "strict-origin")
            .create_async()
            .await;

        let client = Client::builder().timeout(Duration::from_secs(2)).build().unwrap();
        let found = collect_headers(&client, &server.url()).await;
        assert_eq!(found.len(), 5);
        assert_eq!(found.get("X-Content-Type-Options").map(String::as_str), Some("nosniff"));
    }

    #[tokio::test]
    async fn failed_probe_yields_empty_map() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let found = collect_headers(&Client::new(), &url).await;
        assert!(found.is_empty());
    }
}
