//! Pages through the WordPress REST source and assembles the batch.
use reqwest::Url;
use serde_json::value::RawValue;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, ConfigError};
use crate::model::{Batch, MinifiedPost, OutputRecord, ShapeMode, SourceRecord};
use crate::transport::{HttpRequest, HttpTransport, TransportError};

/// WordPress caps `per_page` at 100.
pub const PAGE_SIZE: usize = 100;
pub const EMBED_RELATIONS: &str = "author,wp:featuredmedia,wp:term";

/// Result of requesting one page.
#[derive(Debug)]
pub enum PageOutcome {
    Records(Vec<SourceRecord>),
    /// `[]`, which the source returns past the last page.
    Empty,
    /// Anything that is not a JSON array, including undecodable bodies and
    /// the error object WordPress sends for an out-of-range page.
    NotAList,
    Failed(TransportError),
}

/// Why pagination ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    ShortPage { page: u32, len: usize },
    Empty { page: u32 },
    NotAList { page: u32 },
    TransportFailed { page: u32, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub batch: Batch,
    pub pages_requested: u32,
    pub stop: StopReason,
}

/// Where a minified record's `featured_image` came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeaturedImage {
    Embedded(String),
    Linked(String),
    /// A media link existed but the lookup failed or came back empty.
    LinkFailed,
    None,
}

impl FeaturedImage {
    pub fn into_url(self) -> String {
        match self {
            FeaturedImage::Embedded(url) | FeaturedImage::Linked(url) => url,
            FeaturedImage::LinkFailed | FeaturedImage::None => String::new(),
        }
    }
}

#[derive(Clone)]
pub struct Collector {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    mode: ShapeMode,
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("base_url", &self.base_url)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Collector {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: Url, mode: ShapeMode) -> Self {
        Self {
            transport,
            base_url,
            mode,
        }
    }

    pub fn from_config(transport: Arc<dyn HttpTransport>, cfg: &Config) -> Result<Self, ConfigError> {
        let base_url = Url::parse(cfg.source.url.trim())
            .map_err(|_| ConfigError::Invalid("source.url must be an absolute URL"))?;
        Ok(Self::new(transport, base_url, cfg.source.mode))
    }

    pub fn mode(&self) -> ShapeMode {
        self.mode
    }

    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("per_page", &PAGE_SIZE.to_string())
                .append_pair("page", &page.to_string());
            if self.mode == ShapeMode::Minified {
                query.append_pair("_embed", EMBED_RELATIONS);
            }
        }
        url
    }

    pub async fn fetch_page(&self, page: u32) -> PageOutcome {
        let request = HttpRequest::get(self.page_url(page));
        let response = match self.transport.send(request).await {
            Ok(res) => res,
            Err(err) => return PageOutcome::Failed(err),
        };
        let items = match serde_json::from_str::<Vec<Box<RawValue>>>(&response.body) {
            Ok(items) if items.is_empty() => return PageOutcome::Empty,
            Ok(items) => items,
            Err(_) => return PageOutcome::NotAList,
        };
        match items.into_iter().map(SourceRecord::from_raw).collect::<Result<Vec<_>, _>>() {
            Ok(records) => PageOutcome::Records(records),
            Err(_) => PageOutcome::NotAList,
        }
    }

    /// Fetch every page and shape the records. Never fails: a transport error
    /// truncates the batch to the pages already read.
    #[instrument(skip_all, fields(base_url = %self.base_url, mode = self.mode.as_str()))]
    pub async fn fetch_all(&self) -> Collection {
        let mut records = Vec::new();
        let mut page: u32 = 1;

        let stop = loop {
            let posts = match self.fetch_page(page).await {
                PageOutcome::Records(posts) => posts,
                PageOutcome::Empty => break StopReason::Empty { page },
                PageOutcome::NotAList => break StopReason::NotAList { page },
                PageOutcome::Failed(err) => {
                    warn!(page, error = %err, "source page fetch failed; keeping partial result");
                    break StopReason::TransportFailed {
                        page,
                        error: err.to_string(),
                    };
                }
            };

            let len = posts.len();
            debug!(page, len, "fetched source page");
            for post in posts {
                records.push(self.shape(post).await);
            }

            if len < PAGE_SIZE {
                break StopReason::ShortPage { page, len };
            }
            page += 1;
        };

        info!(records = records.len(), pages = page, ?stop, "collection finished");
        Collection {
            batch: Batch(records),
            pages_requested: page,
            stop,
        }
    }

    pub async fn shape(&self, record: SourceRecord) -> OutputRecord {
        match self.mode {
            ShapeMode::Full => OutputRecord::Full(record),
            ShapeMode::Minified => {
                let featured_image = self.resolve_featured_image(&record).await.into_url();
                OutputRecord::Minified(minify(&record, featured_image))
            }
        }
    }

    pub async fn resolve_featured_image(&self, record: &SourceRecord) -> FeaturedImage {
        if let Some(url) = record.embedded_media_source_url() {
            return FeaturedImage::Embedded(url.to_string());
        }
        let Some(href) = record.featured_media_link() else {
            return FeaturedImage::None;
        };
        match self.fetch_media_url(href).await {
            Some(url) => FeaturedImage::Linked(url),
            None => FeaturedImage::LinkFailed,
        }
    }

    async fn fetch_media_url(&self, href: &str) -> Option<String> {
        let url = match Url::parse(href) {
            Ok(url) => url,
            Err(err) => {
                debug!(href, error = %err, "media link is not a URL");
                return None;
            }
        };
        let response = match self.transport.send(HttpRequest::get(url)).await {
            Ok(res) => res,
            Err(err) => {
                debug!(href, error = %err, "media lookup failed");
                return None;
            }
        };
        serde_json::from_str::<Value>(&response.body)
            .ok()?
            .pointer("/guid/rendered")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Project a source record onto the fixed minified field set.
pub fn minify(record: &SourceRecord, featured_image: String) -> MinifiedPost {
    MinifiedPost {
        id: record.id(),
        date: record.date(),
        modified: record.modified(),
        author: record.embedded_author_name(),
        title: record.rendered("title"),
        content: record.rendered("content"),
        featured_image,
        excerpt: record.rendered("excerpt"),
        categories: record.category_names(),
        status: record.status(),
    }
}
