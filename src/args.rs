use clap::{Parser, ValueEnum};
use img_harvest::{BrowserKind, ScrapeError, ScraperConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "img-harvest")]
#[command(about = "Scrolls a page in a headless browser and downloads its lazy-loaded images")]
#[command(version)]
pub struct Args {
    /// Page to collect images from (defaults to the config file or https://www.example.com/)
    pub url: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to write images to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// WebDriver server URL (WEBDRIVER_URL overrides the config file, this flag overrides both)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Browser to request from the WebDriver server
    #[arg(short, long, value_enum)]
    pub browser: Option<BrowserArg>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// Maximum number of scroll iterations
    #[arg(long)]
    pub max_scrolls: Option<usize>,

    /// Stop after this many consecutive scrolls without new images
    #[arg(long)]
    pub no_new_threshold: Option<usize>,

    /// Per-image download timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BrowserArg {
    Chrome,
    Firefox,
}

impl From<BrowserArg> for BrowserKind {
    fn from(arg: BrowserArg) -> Self {
        match arg {
            BrowserArg::Chrome => BrowserKind::Chrome,
            BrowserArg::Firefox => BrowserKind::Firefox,
        }
    }
}

impl Args {
    /// Defaults, then the config file, then WEBDRIVER_URL, then flags
    pub fn into_config(self) -> Result<ScraperConfig, ScrapeError> {
        let mut config = match &self.config {
            Some(path) => ScraperConfig::from_file(path)?,
            None => ScraperConfig::default(),
        };

        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                config.browser.webdriver_url = webdriver_url;
            }
        }

        if let Some(url) = self.url {
            config.target_url = url;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(webdriver_url) = self.webdriver_url {
            config.browser.webdriver_url = webdriver_url;
        }
        if let Some(browser) = self.browser {
            config.browser.kind = browser.into();
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(max_scrolls) = self.max_scrolls {
            config.scroll.max_scrolls = max_scrolls;
        }
        if let Some(threshold) = self.no_new_threshold {
            config.scroll.no_new_threshold = threshold;
        }
        if let Some(timeout) = self.timeout {
            config.download.timeout_secs = timeout;
        }

        Ok(config)
    }
}
