// src/core/scanner/links_scanner.rs

use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::core::error::ProbeError;
use crate::core::pool::WorkerPool;

/// Outcome of probing the sampled subset of a page's links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCheckSummary {
    pub sampled: usize,
    /// Probes that reported back before the deadline.
    pub completed: usize,
    pub broken: u32,
}

/// Probes the first `sample_cap` links concurrently on `pool`.
///
/// Each probe is a HEAD request; a status of 400 or above, or any transport
/// failure, marks the link broken. The checker waits at most
/// `probe_timeout * sampled`. Probes still outstanding at that point are
/// aborted and not counted.
pub async fn run_links_scan(
    client: &Client,
    pool: &WorkerPool,
    links: &[String],
    sample_cap: usize,
    probe_timeout: Duration,
) -> LinkCheckSummary {
    let sample: Vec<String> = links.iter().take(sample_cap).cloned().collect();
    let sampled = sample.len();
    if sampled == 0 {
        debug!("No links to probe.");
        return LinkCheckSummary::default();
    }

    let deadline_after = probe_timeout.saturating_mul(u32::try_from(sampled).unwrap_or(u32::MAX));
    info!(total = links.len(), sampled, pool = pool.name(), ?deadline_after, "Starting link probes.");

    let mut pending = FuturesUnordered::new();
    let mut aborts = Vec::with_capacity(sampled);
    let mut broken = 0u32;
    let mut completed = 0usize;

    for link in sample {
        let client = client.clone();
        // Nested: the calling analysis already holds a unit on some pool.
        let handle = pool.spawn_nested(async move { probe_link(&client, &link).await });
        aborts.push(handle.abort_handle());
        pending.push(handle);
    }

    let deadline = Instant::now() + deadline_after;
    loop {
        match timeout_at(deadline, pending.next()).await {
            Ok(Some(joined)) => {
                completed += 1;
                let outcome = joined.map_err(|e| ProbeError::Task(e.to_string())).and_then(|r| r);
                if is_broken(&outcome) {
                    broken += 1;
                }
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    outstanding = pending.len(),
                    "Link probe deadline elapsed; outstanding probes are not counted."
                );
                break;
            }
        }
    }

    // Late results are discarded, never raced into the count.
    drop(pending);
    for abort in aborts {
        abort.abort();
    }

    info!(sampled, completed, broken, "Link probes finished.");
    LinkCheckSummary { sampled, completed, broken }
}

/// Issues one HEAD probe and returns the response status code.
pub async fn probe_link(client: &Client, url: &str) -> Result<u16, ProbeError> {
    let response = client.head(url).send().await.map_err(|e| ProbeError::from_request(url, e))?;
    let status = response.status().as_u16();
    debug!(url, status, "Link probe answered.");
    Ok(status)
}

fn is_broken(outcome: &Result<u16, ProbeError>) -> bool {
    match outcome {
        Ok(status) => *status >= 400,
        Err(e) => {
            debug!(error = %e, "Link probe failed.");
            true
        }
    }
}
