#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use wp_github_sync::config::Config;
use wp_github_sync::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

pub const SOURCE_URL: &str = "https://blog.test/wp-json/wp/v2/posts";
pub const API_BASE: &str = "https://api.github.test/";
pub const CONTENTS_URL: &str = "https://api.github.test/repos/owner/site/contents/posts.json";

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Answers every request through a closure and keeps a log of what was sent.
#[derive(Clone)]
pub struct RecordingTransport {
    responder: Arc<Responder>,
    calls: Arc<Mutex<Vec<HttpRequest>>>,
}

impl RecordingTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_to_host(&self, host: &str) -> Vec<HttpRequest> {
        self.calls()
            .await
            .into_iter()
            .filter(|req| req.url.host_str() == Some(host))
            .collect()
    }
}

#[async_trait::async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().await.push(request.clone());
        (self.responder)(&request)
    }
}

pub fn ok(body: impl Into<String>) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status: 200,
        body: body.into(),
    })
}

pub fn status(status: u16, body: impl Into<String>) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status,
        body: body.into(),
    })
}

pub fn unreachable(req: &HttpRequest) -> Result<HttpResponse, TransportError> {
    Err(TransportError::Send {
        url: req.url.to_string(),
        message: "connection reset".into(),
    })
}

pub fn query(req: &HttpRequest, key: &str) -> Option<String> {
    req.url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub fn page_number(req: &HttpRequest) -> u32 {
    query(req, "page").and_then(|p| p.parse().ok()).unwrap_or(0)
}

/// A post with every relation embedded.
pub fn post(id: u64) -> Value {
    json!({
        "id": id,
        "date": "2024-03-01T09:00:00",
        "modified": "2024-03-02T09:00:00",
        "status": "publish",
        "author": 1,
        "title": { "rendered": format!("Post {id}") },
        "content": { "rendered": format!("<p>Body {id}</p>") },
        "excerpt": { "rendered": "<p>Short</p>" },
        "_embedded": {
            "author": [{ "id": 1, "name": "Ada" }],
            "wp:featuredmedia": [{ "source_url": format!("https://blog.test/uploads/{id}.jpg") }],
            "wp:term": [[{ "name": "News" }, { "taxonomy": "category" }, { "name": "Tech" }], [{ "name": "a-tag" }]]
        }
    })
}

/// Page `page` of a collection where every page before it was full.
pub fn page_of(page: u32, len: usize) -> String {
    let first = (page as u64 - 1) * 100 + 1;
    let posts: Vec<Value> = (first..first + len as u64).map(post).collect();
    Value::Array(posts).to_string()
}

pub fn config() -> Config {
    serde_yaml::from_str(&format!(
        "github:\n  token: secret\n  repo: owner/site\n  branch: main\n  path: posts.json\n  api_base: {API_BASE}\nsource:\n  url: {SOURCE_URL}\n  mode: minified\n"
    ))
    .unwrap()
}
