//! Request and response bodies for the download service REST API

use serde::{Deserialize, Deserializer, Serialize};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

/// Metadata returned by `POST /api/info`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoInfo {
    /// Video title
    #[serde(default)]
    pub title: String,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Canonical source URL (older servers omit it)
    #[serde(default)]
    pub original_url: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Format choices in server order
    #[serde(default)]
    pub formats: Vec<Format>,
}

/// One downloadable format choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Format {
    /// Quality id sent back on enqueue (e.g. "mp3", "best", "720p")
    pub id: String,
    /// Human label
    pub label: String,
}

impl Format {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Check if format yields an audio-only artifact
    pub fn is_audio_only(&self) -> bool {
        is_audio_quality(&self.id)
    }
}

/// Check if a quality id yields an audio-only artifact
pub fn is_audio_quality(quality: &str) -> bool {
    quality.eq_ignore_ascii_case("mp3")
}

#[derive(Debug, Serialize)]
pub(crate) struct InfoRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct DownloadRequest<'a> {
    pub url: &'a str,
    pub quality: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadResponse {
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub query: &'a str,
    #[serde(rename = "pageToken")]
    pub page_token: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SuggestionsRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuggestionsResponse {
    #[serde(default)]
    pub results: Vec<String>,
}

/// One page of search results
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    /// Results in server order
    #[serde(default)]
    pub results: Vec<SearchResult>,
    /// Continuation token; absent or empty means no further pages
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
}

impl SearchPage {
    /// Continuation token, treating an empty string as absent
    pub fn continuation(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|token| !token.is_empty())
    }
}

/// Video summary in a search page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Server-side task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Downloading,
    Processing,
    Finished,
    Error,
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Finished)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Processing => "processing",
            TaskStatus::Finished => "finished",
            TaskStatus::Error => "error",
            TaskStatus::Unknown => "unknown",
        }
    }
}

/// A server-tracked download job as reported by `GET /api/tasks`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// Percent complete, clamped to 0..=100
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: f64,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub eta: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, status: TaskStatus, progress: f64) -> Self {
        Self {
            id: id.into(),
            status,
            progress,
            speed: None,
            eta: None,
            quality: None,
            error: None,
        }
    }
}

/// Full task collection keyed by task id, in the order the server sent it
pub type TaskMap = IndexMap<String, Task>;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProgress {
    Number(f64),
    Text(String),
    Null(()),
}

/// Accepts `42`, `42.5`, `"42.5"`, `"42.5%"` and colour-decorated percent
/// strings such as `"\u{1b}[0;94m 42.5%\u{1b}[0m"`.
fn deserialize_progress<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match RawProgress::deserialize(deserializer)? {
        RawProgress::Number(n) => n,
        RawProgress::Text(text) => parse_percent(&text).unwrap_or(0.0),
        RawProgress::Null(()) => 0.0,
    };
    Ok(clamp_percent(value))
}

/// Extract the first number of a percent string, ignoring colour codes
pub fn parse_percent(text: &str) -> Option<f64> {
    let cleaned = ansi_escape().replace_all(text, "");
    percent_number()
        .captures(&cleaned)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Clamp a progress value into 0..=100, mapping NaN to 0
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn ansi_escape() -> &'static Regex {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("static pattern"))
}

fn percent_number() -> &'static Regex {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    PERCENT.get_or_init(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*%?").expect("static pattern"))
}
