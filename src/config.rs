//! Configuration loader and validator for the WordPress→GitHub sync.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::model::ShapeMode;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_PATH: &str = "posts.json";
pub const DEFAULT_API_BASE: &str = "https://api.github.com/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub github: GitHub,
    pub source: Source,
}

/// Target repository settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitHub {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

/// WordPress REST source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub mode: ShapeMode,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Config {
    /// True when every value the pipeline needs is non-empty. An incomplete
    /// config is not an error; the trigger gate just skips.
    pub fn is_complete(&self) -> bool {
        [
            &self.github.token,
            &self.github.repo,
            &self.github.branch,
            &self.github.path,
            &self.source.url,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }

    /// Replace the token with `GITHUB_TOKEN` when that variable is set and non-empty.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                self.github.token = token;
            }
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

/// True when joining `path` onto a URL cannot climb out of it: no `.` or `..`
/// segment (percent-encoded or not, `/` or `\` separated) and no query or fragment.
pub fn is_contained_path(path: &str) -> bool {
    if path.contains(|c: char| c == '?' || c == '#') {
        return false;
    }
    path.split(|c: char| c == '/' || c == '\\').all(|segment| {
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment != "." && segment != ".."
    })
}

/// Validate the shape of the values that are present. Empty values pass.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let repo = cfg.github.repo.trim();
    if !repo.is_empty() {
        let mut parts = repo.split('/');
        let owner = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        if owner.is_empty() || name.is_empty() || parts.next().is_some() || !is_contained_path(repo) {
            return Err(ConfigError::Invalid("github.repo must look like owner/name"));
        }
    }

    if !is_contained_path(cfg.github.path.trim()) {
        return Err(ConfigError::Invalid("github.path must not contain dot segments, queries or fragments"));
    }

    if Url::parse(&cfg.github.api_base).is_err() {
        return Err(ConfigError::Invalid("github.api_base must be an absolute URL"));
    }

    let url = cfg.source.url.trim();
    if !url.is_empty() {
        let parsed = Url::parse(url)
            .map_err(|_| ConfigError::Invalid("source.url must be an absolute URL"))?;
        if parsed.query().is_some() {
            return Err(ConfigError::Invalid("source.url must not carry query parameters"));
        }
    }

    Ok(())
}

/// Returns the example YAML printed by `example-config`.
pub fn example() -> &'static str {
    r#"github:
  token: "YOUR_GITHUB_TOKEN"
  repo: "owner/name"
  branch: "main"
  path: "posts.json"

source:
  url: "https://your-site.com/wp-json/wp/v2/posts"
  mode: minified
"#
}
