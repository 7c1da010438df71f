use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use wp_github_sync::collector::Collector;
use wp_github_sync::config;
use wp_github_sync::transport::ReqwestTransport;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Collect all posts from the configured source and print the JSON that would be uploaded"
)]
struct Args {
    /// Path to YAML config file (reads only `source`)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Write to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let transport = Arc::new(ReqwestTransport::new()?);
    let collector = Collector::from_config(transport, &cfg)?;

    let collection = collector.fetch_all().await;
    let bytes = collection.batch.to_compact_json()?;
    info!(
        records = collection.batch.len(),
        pages = collection.pages_requested,
        stop = ?collection.stop,
        "collected"
    );

    match args.out {
        Some(path) => tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}
