use std::path::PathBuf;
use std::time::Duration;

// Use the interfaces crate for core types
pub use interfaces::defs::{FeedSourceSpec, NewsItem, Presenter, WatchRest};

pub const GOOGLE_NEWS_RSS_URL: &str = "http://news.google.com/news?output=rss";
pub const YAHOO_NEWS_RSS_URL: &str = "http://news.yahoo.com/rss/topstories";

/// Seconds between polls when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "News-Triggers/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 5,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub triggers_path: PathBuf,
    pub sources: Vec<FeedSourceSpec>,
    pub poll_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            triggers_path: PathBuf::from("triggers.txt"),
            sources: vec![
                FeedSourceSpec { uri: GOOGLE_NEWS_RSS_URL.to_string() },
                FeedSourceSpec { uri: YAHOO_NEWS_RSS_URL.to_string() },
            ],
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

/// Counters for one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub pulled: usize,
    pub matched: usize,
    pub shown: usize,
    pub failed_sources: usize,
}

/// Reasons a trigger configuration fails to compile.
///
/// `line` is 1-based and counts every input line, comments and blanks included.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("line {line}: unknown trigger type '{kind}'")]
    UnknownTriggerType { line: usize, kind: String },

    #[error("line {line}: {kind} takes {expected} argument(s), found {found}")]
    ArityMismatch {
        line: usize,
        kind: String,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: trigger '{name}' is used before it is defined")]
    UndefinedReference { line: usize, name: String },

    #[error("line {line}: malformed time '{value}': {reason}")]
    MalformedTime {
        line: usize,
        value: String,
        reason: String,
    },

    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
}

impl CompileError {
    pub fn line(&self) -> usize {
        match self {
            CompileError::UnknownTriggerType { line, .. }
            | CompileError::ArityMismatch { line, .. }
            | CompileError::UndefinedReference { line, .. }
            | CompileError::MalformedTime { line, .. }
            | CompileError::MalformedLine { line, .. } => *line,
        }
    }
}

/// Failure to read a trigger time literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("expected 'DD Mon YYYY HH:MM:SS': {0}")]
    Format(#[from] chrono::ParseError),

    #[error("{0} does not exist in US Eastern time")]
    Nonexistent(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported feed URL scheme '{scheme}': {url}")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("Feed size exceeds limit: {bytes} bytes read, limit is {limit_mb}MB")]
    FeedTooLarge { bytes: u64, limit_mb: usize },

    #[error("Trigger config error: {0}")]
    Config(#[from] CompileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
