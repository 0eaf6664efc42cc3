// src/core/scanner/dns_scanner.rs

use std::net::IpAddr;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::error::DnsError;
use crate::core::models::DOMAIN_LOOKUP_FAILED;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use url::{Host, Url};

/// Resolves target hosts to addresses.
///
/// Built from the system resolver configuration (so `/etc/hosts` entries
/// are honoured) and falls back to the library's default upstreams when
/// that configuration cannot be read.
#[derive(Clone)]
pub struct DomainResolver {
    resolver: TokioAsyncResolver,
}

impl DomainResolver {
    pub fn from_system_conf(timeout: Duration) -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!(error = %e, "Could not read system resolver configuration; using defaults.");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = timeout;
        opts.attempts = 1;
        Self { resolver: TokioAsyncResolver::tokio(config, opts) }
    }

    /// Formats the lookup outcome for the record; failures become the fixed
    /// lookup-failed string.
    pub async fn resolve_domain(&self, url: &Url) -> String {
        match self.run_dns_scan(url).await {
            Ok((host, ip)) => format!("Host: {host} | IP: {ip}"),
            Err(e) => {
                warn!(url = %url, error = %e, "Domain lookup failed.");
                DOMAIN_LOOKUP_FAILED.to_string()
            }
        }
    }

    /// Looks up the URL's host and returns it with the first address found.
    pub async fn run_dns_scan(&self, url: &Url) -> Result<(String, IpAddr), DnsError> {
        let host_str = url.host_str().ok_or(DnsError::MissingHost)?.to_string();
        info!(host = %host_str, "Starting DNS scan.");

        let domain = match url.host() {
            Some(Host::Ipv4(ip)) => return Ok((host_str, IpAddr::V4(ip))),
            Some(Host::Ipv6(ip)) => return Ok((host_str, IpAddr::V6(ip))),
            Some(Host::Domain(domain)) => domain,
            None => return Err(DnsError::MissingHost),
        };

        let lookup = self.resolver.lookup_ip(domain).await.map_err(|source| DnsError::Lookup {
            host: host_str.clone(),
            source,
        })?;
        let ip = lookup.iter().next().ok_or_else(|| DnsError::NoAddress { host: host_str.clone() })?;

        debug!(host = %host_str, %ip, "Resolved host.");
        info!("DNS scan finished.");
        Ok((host_str, ip))
    }
}
