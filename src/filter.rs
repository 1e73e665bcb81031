use crate::config::DownloadConfig;
use regex::Regex;
use std::fmt;
use url::Url;

/// Why an image URL was not worth fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    Unparseable,
    /// Anything other than http or https (ftp, data, blob, ...)
    Scheme(String),
    Excluded,
    NotIncluded,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => f.write_str("empty url"),
            Rejection::Unparseable => f.write_str("unparseable url"),
            Rejection::Scheme(scheme) => write!(f, "unsupported scheme {scheme}"),
            Rejection::Excluded => f.write_str("matched an exclude pattern"),
            Rejection::NotIncluded => f.write_str("matched no include pattern"),
        }
    }
}

/// Decides which collected image URLs the downloader may fetch
#[derive(Debug, Default)]
pub struct ImageUrlFilter {
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl ImageUrlFilter {
    /// Create a new URL filter from regex patterns
    pub fn new(include_patterns: &[String], exclude_patterns: &[String]) -> Result<Self, regex::Error> {
        let include_regexes = include_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude_regexes = exclude_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_regexes,
            exclude_regexes,
        })
    }

    pub fn from_config(config: &DownloadConfig) -> Result<Self, regex::Error> {
        Self::new(&config.include_patterns, &config.exclude_patterns)
    }

    /// Parse and vet a raw `src` value
    pub fn check(&self, raw: &str) -> Result<Url, Rejection> {
        if raw.is_empty() {
            return Err(Rejection::Empty);
        }
        // Scheme is checked on the raw text so `ftp:` and `data:` never reach the parser's
        // error paths
        if !(raw.starts_with("http://") || raw.starts_with("https://")) {
            let scheme = raw.split(':').next().unwrap_or_default().to_string();
            return Err(Rejection::Scheme(scheme));
        }
        let url = Url::parse(raw).map_err(|_| Rejection::Unparseable)?;

        // Exclusions take precedence
        let url_str = url.as_str();
        if self.exclude_regexes.iter().any(|r| r.is_match(url_str)) {
            return Err(Rejection::Excluded);
        }
        if !self.include_regexes.is_empty()
            && !self.include_regexes.iter().any(|r| r.is_match(url_str))
        {
            return Err(Rejection::NotIncluded);
        }

        Ok(url)
    }
}
