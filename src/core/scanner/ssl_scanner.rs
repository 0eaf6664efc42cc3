// src/core/scanner/ssl_scanner.rs

use tracing::{debug, error, info, warn};

use crate::core::error::TlsError;
use crate::core::models::{CertificateInfo, TlsSummary};
use chrono::{DateTime, Local, Utc};
use native_tls::TlsConnector;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::task::spawn_blocking;
use url::{Host, Url};
use x509_parser::prelude::*;

/// Inspects the certificate of a secure URL and folds the outcome into the
/// record's TLS fields. Insecure URLs are never connected to.
pub async fn inspect_tls(url: &Url, timeout: Duration) -> TlsSummary {
    if url.scheme() != "https" {
        info!(url = %url, "Target is not served over TLS; skipping certificate inspection.");
        return TlsSummary::no_ssl();
    }
    match run_ssl_scan(url, timeout).await {
        Ok(cert) => TlsSummary::from(cert),
        Err(e) => {
            warn!(url = %url, error = %e, "TLS inspection failed.");
            TlsSummary::error(e)
        }
    }
}

pub async fn run_ssl_scan(url: &Url, timeout: Duration) -> Result<CertificateInfo, TlsError> {
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => return Err(TlsError::MissingHost),
    };
    let port = url.port_or_known_default().unwrap_or(443);
    info!(host = %host, port, "Starting SSL/TLS scan.");

    debug!("Spawning blocking task for TLS connection.");
    let task = spawn_blocking(move || perform_tls_scan(&host, port, timeout));

    // Address resolution inside the blocking task has no timeout of its own.
    let overall = timeout.saturating_mul(2);
    let scan_result = match tokio::time::timeout(overall, task).await {
        Ok(joined) => joined.unwrap_or_else(|e| {
            error!(panic = %e, "Blocking SSL scan task panicked!");
            Err(TlsError::Task(e.to_string()))
        }),
        Err(_) => Err(TlsError::Timeout(overall)),
    };

    if let Ok(cert) = &scan_result {
        info!(issuer = %cert.issuer_name, valid = cert.is_valid, "SSL/TLS scan finished.");
    }
    scan_result
}

fn perform_tls_scan(host: &str, port: u16, timeout: Duration) -> Result<CertificateInfo, TlsError> {
    debug!(host, port, "Performing TLS connection and handshake.");

    let connector = TlsConnector::new().map_err(TlsError::Connector)?;

    let addr = (host, port)
        .to_socket_addrs()
        .map_err(TlsError::Connect)?
        .next()
        .ok_or_else(|| {
            TlsError::Connect(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no address for {host}"),
            ))
        })?;

    debug!(%addr, "Connecting TCP stream.");
    let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
        if e.kind() == std::io::ErrorKind::TimedOut {
            TlsError::Timeout(timeout)
        } else {
            TlsError::Connect(e)
        }
    })?;
    stream.set_read_timeout(Some(timeout)).map_err(TlsError::Connect)?;
    stream.set_write_timeout(Some(timeout)).map_err(TlsError::Connect)?;

    debug!(host, "Performing TLS handshake.");
    let stream = connector
        .connect(host, stream)
        .map_err(|e| TlsError::Handshake(e.to_string()))?;

    let cert = match stream.peer_certificate() {
        Ok(Some(c)) => c,
        Ok(None) => return Err(TlsError::NoCertificate),
        Err(e) => return Err(TlsError::Certificate(e.to_string())),
    };

    let cert_der = cert.to_der().map_err(|e| TlsError::Certificate(e.to_string()))?;
    // The handshake already verified the chain; this adds the validity window.
    certificate_info(&cert_der, Local::now())
}

/// Reads subject, issuer and validity window from a DER certificate.
pub fn certificate_info(der: &[u8], now: DateTime<Local>) -> Result<CertificateInfo, TlsError> {
    let (_, x509) = parse_x509_certificate(der).map_err(|e| TlsError::Parse(e.to_string()))?;

    info!(subject = %x509.subject(), issuer = %x509.issuer(), "Successfully parsed certificate.");

    let validity = x509.validity();
    let not_before = asn1_time_to_local(&validity.not_before);
    let not_after = asn1_time_to_local(&validity.not_after);

    Ok(CertificateInfo {
        subject_name: x509.subject().to_string(),
        issuer_name: x509.issuer().to_string(),
        not_before,
        not_after,
        is_valid: now > not_before && now < not_after,
    })
}

fn asn1_time_to_local(time: &ASN1Time) -> DateTime<Local> {
    DateTime::<Utc>::from_timestamp(time.timestamp(), 0)
        .unwrap_or_default()
        .with_timezone(&Local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{NO_SSL, SSL_ERROR_PREFIX};
    use chrono::TimeZone;

    // Self-signed P-256 certificate valid from 2020-01-01 to 2040-01-01 UTC.
    const FIXTURE_CERT: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/fixture_cert.der"));

    fn utc(year: i32) -> DateTime<Local> {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap().with_timezone(&Local)
    }

    #[test]
    fn certificate_fields_land_in_the_tls_summary() {
        let cert = certificate_info(FIXTURE_CERT, utc(2030)).unwrap();
        assert!(cert.is_valid);
        assert!(cert.subject_name.contains("CN=Fixture CA"), "got {}", cert.subject_name);
        assert!(cert.issuer_name.contains("O=Fixture Trust Services"), "got {}", cert.issuer_name);
        assert_eq!(cert.not_before, utc(2020));
        assert_eq!(cert.not_after, utc(2040));

        let summary = TlsSummary::from(cert.clone());
        assert!(summary.valid);
        assert_eq!(summary.issuer, cert.issuer_name);
        assert_eq!(summary.expiry, Some(utc(2040)));
    }

    #[test]
    fn valid_certificate_with_one_broken_link_scores_80() {
        let tls = TlsSummary::from(certificate_info(FIXTURE_CERT, utc(2030)).unwrap());
        let headers = crate::core::models::SecurityHeader::all()
            .map(|h| (h.to_string(), "set".to_string()))
            .collect();
        let record = crate::core::models::AnalysisRecord::placeholder("https://fixture.test/")
            .with_broken_links(1)
            .with_tls(tls)
            .with_domain_info("Host: fixture.test | IP: 192.0.2.10".to_string())
            .with_security_headers(headers)
            .completed();

        assert_eq!(record.ssl_expiry, Some(utc(2040)));
        assert_eq!(record.score, 80);
    }

    #[test]
    fn certificate_outside_its_window_is_not_valid() {
        assert!(!certificate_info(FIXTURE_CERT, utc(2041)).unwrap().is_valid);
        assert!(!certificate_info(FIXTURE_CERT, utc(2019)).unwrap().is_valid);
    }

    #[test]
    fn garbage_der_is_a_parse_error() {
        assert!(matches!(certificate_info(b"not a certificate", utc(2030)), Err(TlsError::Parse(_))));
    }

    #[tokio::test]
    async fn insecure_scheme_is_reported_without_connecting() {
        // Port 9 on a reserved documentation address: any attempt would fail or hang.
        let url = Url::parse("http://192.0.2.1:9/").unwrap();
        let summary = inspect_tls(&url, Duration::from_millis(50)).await;
        assert!(!summary.valid);
        assert_eq!(summary.issuer, NO_SSL);
        assert!(summary.expiry.is_none());
    }

    #[tokio::test]
    async fn silent_server_times_out_as_ssl_error() {
        // The kernel completes the TCP handshake but nothing ever answers the ClientHello.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("https://127.0.0.1:{}/", listener.local_addr().unwrap().port())).unwrap();

        let summary = inspect_tls(&url, Duration::from_millis(200)).await;

        assert!(!summary.valid);
        assert!(summary.issuer.starts_with(SSL_ERROR_PREFIX), "got {}", summary.issuer);
        drop(listener);
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("https://127.0.0.1:{port}/")).unwrap();
        let result = run_ssl_scan(&url, Duration::from_millis(200)).await;
        assert!(matches!(result, Err(TlsError::Connect(_))));
    }
}
