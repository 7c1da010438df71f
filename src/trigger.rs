//! Decides whether a save event should start a sync, and dispatches it.
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::model::PostEvent;
use crate::sync::{Pipeline, SyncReport};
use crate::transport::HttpTransport;

pub const SYNCED_POST_TYPE: &str = "post";
pub const SYNCED_STATUSES: [&str; 2] = ["publish", "future"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Revision,
    Autosave,
    PostType(String),
    Status(String),
    IncompleteConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Run,
    Skip(SkipReason),
}

/// Pure predicate over the event and the loaded config.
pub fn gate(event: &PostEvent, cfg: &Config) -> GateDecision {
    if event.is_revision {
        return GateDecision::Skip(SkipReason::Revision);
    }
    if event.is_autosave {
        return GateDecision::Skip(SkipReason::Autosave);
    }
    if event.post.post_type != SYNCED_POST_TYPE {
        return GateDecision::Skip(SkipReason::PostType(event.post.post_type.clone()));
    }
    if !SYNCED_STATUSES.contains(&event.post.status.as_str()) {
        return GateDecision::Skip(SkipReason::Status(event.post.status.clone()));
    }
    if !cfg.is_complete() {
        return GateDecision::Skip(SkipReason::IncompleteConfig);
    }
    GateDecision::Run
}

/// Port the host calls whenever a post is saved.
#[async_trait]
pub trait ContentPublished: Send + Sync {
    async fn on_save(&self, event: &PostEvent);
}

/// Runs the full pipeline for every event that passes the gate.
#[derive(Clone)]
pub struct SyncHook {
    transport: Arc<dyn HttpTransport>,
    config: Config,
}

impl SyncHook {
    pub fn new(transport: Arc<dyn HttpTransport>, config: Config) -> Self {
        Self { transport, config }
    }

    /// Same as `on_save`, but hands back the report when a run happened.
    /// A skipped event leaves no trace, not even in the logs.
    #[instrument(skip_all, fields(post_id = event.post_id, update = event.update))]
    pub async fn handle(&self, event: &PostEvent) -> Option<SyncReport> {
        if gate(event, &self.config) != GateDecision::Run {
            return None;
        }

        let pipeline = match Pipeline::new(self.transport.clone(), &self.config) {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "cannot build sync pipeline");
                return None;
            }
        };

        info!("save event accepted; syncing posts");
        Some(pipeline.run().await)
    }
}

#[async_trait]
impl ContentPublished for SyncHook {
    async fn on_save(&self, event: &PostEvent) {
        let _ = self.handle(event).await;
    }
}
