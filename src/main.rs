// src/main.rs

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use std::sync::Arc;
use std::time::Duration;

use vanguard_site_analyzer::{logging, AnalysisRecord, AnalyzerConfig, App, InMemoryStore};

mod cli;

use cli::Cli;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = cli.apply(AnalyzerConfig::from_env());
    let log_path = logging::initialize_logging(config.log_dir.as_deref())?;
    tracing::info!(log = %log_path.display(), ?config, "Starting analyzer.");

    let app = App::new(config, Arc::new(InMemoryStore::new()))?;
    let id = app.start_analysis(&cli.url)?;

    let record = match tokio::time::timeout(cli.max_wait(), app.wait_for(id, POLL_INTERVAL)).await {
        Ok(record) => record?,
        Err(_) => {
            return Err(eyre!(
                "analysis {} did not finish within {}s (log: {})",
                id,
                cli.max_wait_secs,
                log_path.display()
            ));
        }
    };
    app.shutdown().await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_summary(&record);
    }
    Ok(())
}

fn print_summary(record: &AnalysisRecord) {
    println!("{} [{}]", record.url, record.status);
    println!("  Score:        {}/100", record.score);
    println!("  Title:        {}", record.title);
    println!("  Description:  {}", record.meta_description);
    println!("  Words:        {}", record.word_count);
    println!("  Links:        {} total, {} broken (sampled)", record.total_links, record.broken_links);
    match record.ssl_expiry {
        Some(expiry) => println!(
            "  TLS:          valid={} issuer={} expires={}",
            record.ssl_valid,
            record.ssl_issuer,
            expiry.format("%Y-%m-%d %H:%M")
        ),
        None => println!("  TLS:          valid={} {}", record.ssl_valid, record.ssl_issuer),
    }
    println!("  Domain:       {}", record.domain_info);
    if record.security_headers.is_empty() {
        println!("  Headers:      none");
    } else {
        println!("  Headers:");
        for (name, value) in &record.security_headers {
            println!("    {name}: {value}");
        }
    }
}
