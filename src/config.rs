use crate::error::ScrapeError;
use crate::utils::random_delay;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Desktop Chrome user-agent sent by both the browser and the downloader
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Top-level configuration for one scraping run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Page to scroll and collect images from
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Directory the images are written to (created if absent)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub scroll: ScrollConfig,

    #[serde(default)]
    pub download: DownloadConfig,
}

/// Browser flavour requested from the WebDriver server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

/// How the headless browser session is launched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_browser_kind")]
    pub kind: BrowserKind,

    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Wait after navigation before the DOM is inspected
    #[serde(default = "default_settle")]
    pub settle: DelayRange,
}

/// Scroll-and-collect loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Upper bound on loop iterations
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: usize,

    /// Consecutive iterations without new images before stopping
    #[serde(default = "default_no_new_threshold")]
    pub no_new_threshold: usize,

    /// Fixed wait after each scroll
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,

    /// Random wait added on top of `scroll_delay_ms`
    #[serde(default = "default_scroll_jitter")]
    pub jitter: DelayRange,

    /// Extra attempts for a failed DOM read within one iteration
    #[serde(default = "default_dom_read_retries")]
    pub dom_read_retries: usize,

    #[serde(default = "default_dom_retry_delay_ms")]
    pub dom_retry_delay_ms: u64,
}

/// Downloader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Random pause after each successful download
    #[serde(default = "default_throttle")]
    pub throttle: DelayRange,

    /// Regex patterns an image URL must match (if empty, all URLs are included unless excluded)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns for image URLs to skip (these take precedence over include patterns)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Inclusive range of milliseconds a random delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// No delay at all
    pub const fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn sample(&self) -> Duration {
        random_delay(self.min_ms, self.max_ms)
    }
}

fn default_target_url() -> String {
    "https://www.example.com/".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("images_example")
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_browser_kind() -> BrowserKind {
    BrowserKind::Chrome
}

fn default_headless() -> bool {
    true
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_settle() -> DelayRange {
    DelayRange::new(3_000, 5_000)
}

fn default_max_scrolls() -> usize {
    7
}

fn default_no_new_threshold() -> usize {
    3
}

fn default_scroll_delay_ms() -> u64 {
    3_000
}

fn default_scroll_jitter() -> DelayRange {
    DelayRange::new(500, 1_500)
}

fn default_dom_read_retries() -> usize {
    2
}

fn default_dom_retry_delay_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_throttle() -> DelayRange {
    DelayRange::new(500, 2_000)
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            kind: default_browser_kind(),
            headless: default_headless(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            user_agent: default_user_agent(),
            settle: default_settle(),
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            max_scrolls: default_max_scrolls(),
            no_new_threshold: default_no_new_threshold(),
            scroll_delay_ms: default_scroll_delay_ms(),
            jitter: default_scroll_jitter(),
            dom_read_retries: default_dom_read_retries(),
            dom_retry_delay_ms: default_dom_retry_delay_ms(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            throttle: default_throttle(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self::new(&default_target_url())
    }
}

impl ScraperConfig {
    /// Create a new configuration with default values
    pub fn new(target_url: &str) -> Self {
        Self {
            target_url: target_url.to_string(),
            output_dir: default_output_dir(),
            browser: BrowserConfig::default(),
            scroll: ScrollConfig::default(),
            download: DownloadConfig::default(),
        }
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScrapeError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(ScrapeError::io(path))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(ScrapeError::io(path))?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ScrapeError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ScrapeError> {
        let target = url::Url::parse(&self.target_url)
            .map_err(|e| ScrapeError::Config(format!("target url {}: {e}", self.target_url)))?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(ScrapeError::Config(format!(
                "target url must be http or https: {}",
                self.target_url
            )));
        }
        if self.scroll.max_scrolls == 0 {
            return Err(ScrapeError::Config("max_scrolls must be at least 1".into()));
        }
        if self.scroll.no_new_threshold == 0 {
            return Err(ScrapeError::Config(
                "no_new_threshold must be at least 1".into(),
            ));
        }
        if self.download.timeout_secs == 0 {
            return Err(ScrapeError::Config("timeout_secs must be at least 1".into()));
        }
        for (name, range) in [
            ("browser.settle", self.browser.settle),
            ("scroll.jitter", self.scroll.jitter),
            ("download.throttle", self.download.throttle),
        ] {
            if range.min_ms > range.max_ms {
                return Err(ScrapeError::Config(format!(
                    "{name}: min_ms {} exceeds max_ms {}",
                    range.min_ms, range.max_ms
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_run_constants() {
        let config = ScraperConfig::default();
        assert_eq!(config.target_url, "https://www.example.com/");
        assert_eq!(config.output_dir, PathBuf::from("images_example"));
        assert_eq!(config.scroll.max_scrolls, 7);
        assert_eq!(config.scroll.no_new_threshold, 3);
        assert_eq!(config.scroll.scroll_delay_ms, 3_000);
        assert_eq!(config.scroll.jitter, DelayRange::new(500, 1_500));
        assert_eq!(config.browser.settle, DelayRange::new(3_000, 5_000));
        assert_eq!(config.browser.viewport_width, 1920);
        assert_eq!(config.browser.viewport_height, 1080);
        assert_eq!(config.download.timeout_secs, 15);
        assert_eq!(config.download.throttle, DelayRange::new(500, 2_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{
            "target_url": "https://gallery.example.org/",
            "scroll": { "max_scrolls": 12 },
            "browser": { "kind": "firefox", "headless": false }
        }"#;
        let config = ScraperConfig::from_json(json).unwrap();
        assert_eq!(config.target_url, "https://gallery.example.org/");
        assert_eq!(config.scroll.max_scrolls, 12);
        assert_eq!(config.scroll.no_new_threshold, 3);
        assert_eq!(config.browser.kind, BrowserKind::Firefox);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.webdriver_url, "http://localhost:4444");
        assert_eq!(config.browser.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scraper.json");
        std::fs::write(&path, r#"{"output_dir": "out/images"}"#).unwrap();

        let config = ScraperConfig::from_file(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out/images"));

        let missing = ScraperConfig::from_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ScrapeError::Io { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ScraperConfig::new("ftp://example.com/");
        assert!(config.validate().is_err());

        config = ScraperConfig::default();
        config.scroll.no_new_threshold = 0;
        assert!(config.validate().is_err());

        config = ScraperConfig::default();
        config.download.throttle = DelayRange::new(2_000, 500);
        assert!(config.validate().is_err());
    }
}
