use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::{to_raw_value, RawValue};
use serde_json::{Number, Value};

/// How each source record is written into the batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShapeMode {
    /// Records are copied through unchanged.
    Full,
    /// Records are projected onto [`MinifiedPost`].
    #[default]
    Minified,
}

impl ShapeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeMode::Full => "full",
            ShapeMode::Minified => "minified",
        }
    }

    pub fn commit_message(&self) -> &'static str {
        match self {
            ShapeMode::Full => "Auto update posts.json from WordPress",
            ShapeMode::Minified => "Auto update minified posts.json from WordPress",
        }
    }
}

/// One raw post object as returned by the REST source. The source text is
/// kept as sent and is what gets serialized; `value` only backs the accessors.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    raw: Box<RawValue>,
    value: Value,
}

impl PartialEq for SourceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.raw.get() == other.raw.get()
    }
}

impl Serialize for SourceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl SourceRecord {
    pub fn from_raw(raw: Box<RawValue>) -> Result<Self, serde_json::Error> {
        let value = serde_json::from_str(raw.get())?;
        Ok(Self { raw, value })
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        Ok(Self {
            raw: to_raw_value(&value)?,
            value,
        })
    }

    /// The record exactly as the source sent it.
    pub fn raw(&self) -> &str {
        self.raw.get()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn non_empty_str(&self, pointer: &str) -> Option<&str> {
        self.value
            .pointer(pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn str_or_empty(&self, pointer: &str) -> String {
        self.value
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn id(&self) -> PostId {
        match self.value.get("id") {
            Some(Value::Number(n)) => PostId::Number(n.clone()),
            Some(Value::String(s)) => PostId::Text(s.clone()),
            _ => PostId::Text(String::new()),
        }
    }

    pub fn date(&self) -> String {
        self.str_or_empty("/date")
    }

    pub fn modified(&self) -> String {
        self.str_or_empty("/modified")
    }

    pub fn status(&self) -> String {
        self.str_or_empty("/status")
    }

    /// `title.rendered`, `content.rendered` or `excerpt.rendered`.
    pub fn rendered(&self, field: &str) -> String {
        self.str_or_empty(&format!("/{field}/rendered"))
    }

    pub fn embedded_author_name(&self) -> String {
        self.str_or_empty("/_embedded/author/0/name")
    }

    pub fn embedded_media_source_url(&self) -> Option<&str> {
        self.non_empty_str("/_embedded/wp:featuredmedia/0/source_url")
    }

    pub fn featured_media_link(&self) -> Option<&str> {
        self.non_empty_str("/_links/wp:featuredmedia/0/href")
    }

    /// Names from the first embedded term group (categories), in source order.
    pub fn category_names(&self) -> Vec<String> {
        self.value
            .pointer("/_embedded/wp:term/0")
            .and_then(Value::as_array)
            .map(|terms| {
                terms
                    .iter()
                    .filter_map(|term| term.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Post identifier; numeric in WordPress, but never null in the output.
/// A numeric id is written back as the same JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostId {
    Number(Number),
    Text(String),
}

/// Fixed, total projection of a post. Every key is always serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinifiedPost {
    pub id: PostId,
    pub date: String,
    pub modified: String,
    pub author: String,
    pub title: String,
    pub content: String,
    pub featured_image: String,
    pub excerpt: String,
    pub categories: Vec<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputRecord {
    Minified(MinifiedPost),
    Full(SourceRecord),
}

/// Records in page order, ready to be serialized and uploaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Batch(pub Vec<OutputRecord>);

impl Batch {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact JSON array. Pass-through records keep the exact text the source sent.
    pub fn to_compact_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.0)
    }
}

/// What the existence check learned about the target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFileState {
    /// 200 with a blob SHA.
    Exists { sha: String },
    /// 404.
    Missing,
    /// Anything else: transport error, auth failure, rate limit, 200 without sha.
    Unknown { reason: String },
}

impl RemoteFileState {
    pub fn sha(&self) -> Option<&str> {
        match self {
            RemoteFileState::Exists { sha } => Some(sha),
            _ => None,
        }
    }
}

/// Body of the GitHub contents `PUT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub message: String,
    pub content: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// The post that was saved, as far as the gate cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub post_type: String,
    pub status: String,
}

/// A save/update notification from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEvent {
    pub post_id: u64,
    pub post: Post,
    pub update: bool,
    pub is_revision: bool,
    pub is_autosave: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> SourceRecord {
        SourceRecord::from_value(value).unwrap()
    }

    #[test]
    fn category_names_skip_nameless_terms() {
        let rec = record(json!({
            "_embedded": { "wp:term": [[{ "name": "A" }, {}, { "name": "B" }], [{ "name": "tag" }]] }
        }));
        assert_eq!(rec.category_names(), vec!["A", "B"]);
    }

    #[test]
    fn accessors_default_to_empty() {
        let rec = record(json!({}));
        assert_eq!(rec.id(), PostId::Text(String::new()));
        assert_eq!(rec.rendered("title"), "");
        assert_eq!(rec.embedded_author_name(), "");
        assert!(rec.embedded_media_source_url().is_none());
        assert!(rec.featured_media_link().is_none());
        assert!(rec.category_names().is_empty());
    }

    #[test]
    fn empty_media_url_counts_as_absent() {
        let rec = record(json!({
            "_embedded": { "wp:featuredmedia": [{ "source_url": "" }] },
            "_links": { "wp:featuredmedia": [{ "href": "https://x.test/wp-json/wp/v2/media/9" }] }
        }));
        assert!(rec.embedded_media_source_url().is_none());
        assert_eq!(rec.featured_media_link(), Some("https://x.test/wp-json/wp/v2/media/9"));
    }

    #[test]
    fn source_text_is_serialized_verbatim() {
        let text = r#"{"title":{"rendered":"A"},"id":1,"ratio":1.10}"#;
        let rec = SourceRecord::from_raw(serde_json::from_str(text).unwrap()).unwrap();
        assert_eq!(rec.raw(), text);
        assert_eq!(serde_json::to_string(&rec).unwrap(), text);
        assert_eq!(rec.rendered("title"), "A");
    }

    #[test]
    fn numeric_ids_keep_their_json_form() {
        for text in ["-3", "12.5", "18446744073709551615"] {
            let rec = record(json!({ "id": serde_json::from_str::<Value>(text).unwrap() }));
            let id = rec.id();
            assert!(matches!(id, PostId::Number(_)), "{text} became {id:?}");
            assert_eq!(serde_json::to_string(&id).unwrap(), text);
        }
        assert_eq!(record(json!({ "id": "abc" })).id(), PostId::Text("abc".into()));
    }

    #[test]
    fn publish_request_omits_missing_sha() {
        let req = PublishRequest {
            message: "m".into(),
            content: "Yw==".into(),
            branch: "main".into(),
            sha: None,
        };
        let body = serde_json::to_value(&req).unwrap();
        assert!(body.get("sha").is_none());
    }

    #[test]
    fn shape_mode_parses_lowercase() {
        let mode: ShapeMode = serde_yaml::from_str("full").unwrap();
        assert_eq!(mode, ShapeMode::Full);
        assert_eq!(ShapeMode::default(), ShapeMode::Minified);
    }
}
