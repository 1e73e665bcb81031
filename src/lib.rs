// Re-export modules
pub mod config;
pub mod crawlers;
pub mod download;
pub mod error;
pub mod filter;
pub mod parsers;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{BrowserKind, ScraperConfig};
pub use crawlers::{PageDriver, WebSession, collect_images, with_session};
pub use download::{Downloader, Fetch, HttpFetcher};
pub use error::ScrapeError;
pub use results::{CollectReport, DownloadSummary, ImageSet, StopReason};

use std::path::PathBuf;

/// Outcome of a whole run
///
/// `error` is set when the run ended before the download phase; `summary` is then all zeros and
/// `collected` is 0.
#[derive(Debug)]
pub struct RunReport {
    /// Unique image URLs collected from the page
    pub collected: usize,
    pub summary: DownloadSummary,
    pub error: Option<ScrapeError>,
}

impl RunReport {
    fn failed(error: ScrapeError) -> Self {
        Self {
            collected: 0,
            summary: DownloadSummary::default(),
            error: Some(error),
        }
    }
}

/// Main builder for a scroll-and-download run
pub struct Scraper {
    config: ScraperConfig,
}

impl Scraper {
    /// Create a new Scraper for the given page with default settings
    pub fn new(target_url: &str) -> Self {
        Self {
            config: ScraperConfig::new(target_url),
        }
    }

    /// Use a complete configuration
    pub fn with_config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(self, path: impl AsRef<std::path::Path>) -> Result<Self, ScrapeError> {
        let config = ScraperConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a string
    pub fn with_config_str(self, config_str: &str) -> Result<Self, ScrapeError> {
        let config = ScraperConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    pub fn with_target_url(mut self, target_url: &str) -> Self {
        self.config.target_url = target_url.to_string();
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    pub fn with_webdriver_url(mut self, webdriver_url: &str) -> Self {
        self.config.browser.webdriver_url = webdriver_url.to_string();
        self
    }

    pub fn with_browser(mut self, kind: BrowserKind) -> Self {
        self.config.browser.kind = kind;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.browser.headless = headless;
        self
    }

    /// Set the maximum number of scroll iterations
    pub fn with_max_scrolls(mut self, max_scrolls: usize) -> Self {
        self.config.scroll.max_scrolls = max_scrolls;
        self
    }

    /// Set how many consecutive scrolls without new images end collection
    pub fn with_no_new_threshold(mut self, threshold: usize) -> Self {
        self.config.scroll.no_new_threshold = threshold;
        self
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Launch the browser, collect images and download them
    pub async fn run(self) -> RunReport {
        let config = self.config;
        if let Err(e) = config.validate() {
            return RunReport::failed(e);
        }

        let fetcher = match HttpFetcher::from_config(&config) {
            Ok(fetcher) => fetcher,
            Err(e) => return RunReport::failed(e),
        };

        // A directory problem should surface before a browser is started for nothing
        if let Err(e) = download::prepare_output_dir(&config.output_dir).await {
            return RunReport::failed(e);
        }

        ::log::info!(
            "Starting {:?} session via {}",
            config.browser.kind,
            config.browser.webdriver_url
        );
        let session = match WebSession::launch(&config.browser).await {
            Ok(session) => session,
            Err(e) => return RunReport::failed(e),
        };

        run_with(&config, session, fetcher).await
    }
}

/// Runs the pipeline on an already launched page
///
/// The page is closed once collection ends, before any download starts. Everything that can
/// fail outside the browser is checked first, so a run that collected images always accounts
/// for each of them in the summary.
pub async fn run_with<D, F>(config: &ScraperConfig, page: D, fetcher: F) -> RunReport
where
    D: PageDriver,
    F: Fetch,
{
    let prepared = match Downloader::from_config(fetcher, config) {
        Ok(downloader) => downloader
            .prepare_output_dir()
            .await
            .map(|()| downloader),
        Err(e) => Err(e),
    };
    let downloader = match prepared {
        Ok(downloader) => downloader,
        Err(e) => {
            with_session(page, async |_| ()).await;
            return RunReport::failed(e);
        }
    };

    let collected = with_session(page, async |page| {
        ::log::info!("Accessing website: {}", config.target_url);
        page.navigate(&config.target_url).await?;
        utils::pause(config.browser.settle.sample()).await;
        collect_images(page, &config.scroll).await
    })
    .await;

    let report = match collected {
        Ok(report) => report,
        Err(e) => return RunReport::failed(e),
    };
    ::log::info!(
        "Scrolling complete after {} scrolls ({}): {} unique images",
        report.iterations,
        report.stop,
        report.images.len()
    );
    if report.read_failures > 0 {
        ::log::warn!("{} scrolls could not read the DOM", report.read_failures);
    }

    let summary = downloader.download_all(&report.images).await;
    RunReport {
        collected: report.images.len(),
        summary,
        error: None,
    }
}
