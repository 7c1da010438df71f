//! Create-or-update of a single file through GitHub's contents API.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Method, Url};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::{is_contained_path, Config, ConfigError};
use crate::model::{PublishRequest, RemoteFileState, ShapeMode};
use crate::transport::{HttpRequest, HttpTransport, TransportError};

/// What came back from the write. Nothing downstream branches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Written { status: u16, created: bool },
    Rejected { status: u16, body: String },
    TransportFailed { error: String },
}

#[derive(Clone)]
pub struct Publisher {
    transport: Arc<dyn HttpTransport>,
    api_base: Url,
    token: String,
    message: String,
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: Option<String>,
}

impl Publisher {
    pub fn new(transport: Arc<dyn HttpTransport>, mut api_base: Url, token: String, mode: ShapeMode) -> Self {
        // join() replaces the last segment unless the base ends in a slash
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        Self {
            transport,
            api_base,
            token,
            message: mode.commit_message().to_string(),
        }
    }

    pub fn from_config(transport: Arc<dyn HttpTransport>, cfg: &Config) -> Result<Self, ConfigError> {
        let api_base = Url::parse(&cfg.github.api_base)
            .map_err(|_| ConfigError::Invalid("github.api_base must be an absolute URL"))?;
        Ok(Self::new(transport, api_base, cfg.github.token.clone(), cfg.source.mode))
    }

    /// `repos/<owner>/<name>/contents/<path>` under the API base. Paths that
    /// would resolve outside the contents endpoint are refused.
    pub fn contents_url(&self, repo: &str, path: &str) -> Result<Url, TransportError> {
        let repo = repo.trim().trim_matches('/');
        let path = path.trim().trim_start_matches('/');
        if !is_contained_path(repo) || !is_contained_path(path) {
            return Err(TransportError::Build(format!(
                "refusing contents URL for {repo}:{path}"
            )));
        }
        let relative = format!("repos/{repo}/contents/{path}");
        self.api_base
            .join(&relative)
            .map_err(|e| TransportError::Build(format!("invalid contents URL: {e}")))
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("Authorization", format!("token {}", self.token))
            .header("Content-Type", "application/json")
    }

    pub fn build_read_request(&self, url: Url) -> HttpRequest {
        self.authorized(HttpRequest::get(url))
    }

    pub fn build_write_request(&self, url: Url, payload: &PublishRequest) -> Result<HttpRequest, serde_json::Error> {
        let body = serde_json::to_string(payload)?;
        Ok(self.authorized(HttpRequest::new(Method::PUT, url).with_body(body)))
    }

    pub fn build_payload(&self, branch: &str, content: &[u8], state: &RemoteFileState) -> PublishRequest {
        PublishRequest {
            message: self.message.clone(),
            content: STANDARD.encode(content),
            branch: branch.to_string(),
            sha: state.sha().map(str::to_string),
        }
    }

    /// Existence check. Only a 200 carrying a sha counts as an existing file.
    pub async fn remote_state(&self, url: &Url) -> RemoteFileState {
        let response = match self.transport.send(self.build_read_request(url.clone())).await {
            Ok(res) => res,
            Err(err) => {
                return RemoteFileState::Unknown {
                    reason: err.to_string(),
                }
            }
        };
        match response.status {
            200 => match serde_json::from_str::<ContentsResponse>(&response.body) {
                Ok(ContentsResponse { sha: Some(sha) }) => RemoteFileState::Exists { sha },
                Ok(ContentsResponse { sha: None }) => RemoteFileState::Unknown {
                    reason: "200 without sha".into(),
                },
                Err(err) => RemoteFileState::Unknown {
                    reason: format!("invalid contents response: {err}"),
                },
            },
            404 => RemoteFileState::Missing,
            status => RemoteFileState::Unknown {
                reason: format!("status {status}"),
            },
        }
    }

    /// Read the current sha, then `PUT` the content with it when present.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn upsert(&self, repo: &str, path: &str, branch: &str, content: &[u8]) -> PublishOutcome {
        let url = match self.contents_url(repo, path) {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "cannot build contents URL");
                return PublishOutcome::TransportFailed { error: err.to_string() };
            }
        };

        let state = self.remote_state(&url).await;
        match &state {
            RemoteFileState::Exists { sha } => info!(%sha, "remote file exists; updating"),
            RemoteFileState::Missing => info!("remote file missing; creating"),
            RemoteFileState::Unknown { reason } => {
                warn!(%reason, "existence check inconclusive; attempting create")
            }
        }

        let payload = self.build_payload(branch, content, &state);
        let request = match self.build_write_request(url, &payload) {
            Ok(req) => req,
            Err(err) => {
                warn!(error = %err, "failed to encode publish payload");
                return PublishOutcome::TransportFailed { error: err.to_string() };
            }
        };

        let outcome = match self.transport.send(request).await {
            Ok(res) if res.is_success() => PublishOutcome::Written {
                status: res.status,
                created: res.status == 201,
            },
            Ok(res) => PublishOutcome::Rejected {
                status: res.status,
                body: res.body,
            },
            Err(err) => PublishOutcome::TransportFailed { error: err.to_string() },
        };

        match &outcome {
            PublishOutcome::Written { status, created } => info!(status, created, "published"),
            PublishOutcome::Rejected { status, body } => warn!(status, %body, "GitHub rejected the write"),
            PublishOutcome::TransportFailed { error } => warn!(%error, "write did not reach GitHub"),
        }
        outcome
    }
}
