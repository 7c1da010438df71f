use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use wp_github_sync::config::{self, Config};
use wp_github_sync::github::PublishOutcome;
use wp_github_sync::model::{Post, PostEvent};
use wp_github_sync::sync::Pipeline;
use wp_github_sync::transport::ReqwestTransport;
use wp_github_sync::trigger::{ContentPublished, SyncHook};

#[derive(Debug, Parser)]
#[command(author, version, about = "Sync WordPress posts to a JSON file in a GitHub repository")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Deliver a post save event to the sync hook, as the CMS would
    Trigger {
        #[arg(long)]
        post_id: u64,
        #[arg(long, default_value = "post")]
        post_type: String,
        #[arg(long, default_value = "publish")]
        status: String,
        /// The save updated an existing post
        #[arg(long)]
        update: bool,
        #[arg(long)]
        revision: bool,
        #[arg(long)]
        autosave: bool,
    },
    /// Collect and publish now, without a save event
    Sync,
    /// Print the example configuration
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    match args.command {
        Command::ExampleConfig => print!("{}", config::example()),
        Command::Trigger {
            post_id,
            post_type,
            status,
            update,
            revision,
            autosave,
        } => {
            let (cfg, transport) = setup(&args.config)?;
            let event = PostEvent {
                post_id,
                post: Post { post_type, status },
                update,
                is_revision: revision,
                is_autosave: autosave,
            };
            let hook: Box<dyn ContentPublished> = Box::new(SyncHook::new(transport, cfg));
            hook.on_save(&event).await;
        }
        Command::Sync => {
            let (cfg, transport) = setup(&args.config)?;
            if !cfg.is_complete() {
                bail!("configuration is incomplete: token, repo, branch, path and source url are all required");
            }
            let report = Pipeline::new(transport, &cfg)?.run().await;
            info!(
                run_id = %report.run_id,
                records = report.collection.batch.len(),
                stop = ?report.collection.stop,
                outcome = ?report.outcome,
                "sync finished"
            );
            if !matches!(report.outcome, PublishOutcome::Written { .. }) {
                warn!("GitHub file was not updated");
            }
        }
    }

    Ok(())
}

fn setup(path: &Path) -> Result<(Config, Arc<ReqwestTransport>)> {
    let cfg = config::load(Some(path)).with_context(|| format!("failed to load {}", path.display()))?;
    let transport = ReqwestTransport::new().context("failed to build HTTP client")?;
    Ok((cfg, Arc::new(transport)))
}
