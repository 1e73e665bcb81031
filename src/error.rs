use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while scraping a page or downloading its images
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// No WebDriver endpoint accepted a new session
    #[error("failed to start a browser session at {url}: {source}")]
    Launch {
        url: String,
        #[source]
        source: fantoccini::error::NewSessionError,
    },

    /// A WebDriver command failed
    #[error("browser command failed while {context}: {source}")]
    Browser {
        context: &'static str,
        #[source]
        source: fantoccini::error::CmdError,
    },

    /// A script returned something other than what the caller expected
    #[error("unexpected script result while {context}: {value}")]
    Script { context: &'static str, value: String },

    /// The DOM could not be read
    #[error("failed to read the page DOM: {0}")]
    Dom(String),

    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid url pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ScrapeError {
    pub(crate) fn browser(context: &'static str) -> impl FnOnce(fantoccini::error::CmdError) -> Self {
        move |source| ScrapeError::Browser { context, source }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ScrapeError::Io { path, source }
    }
}
