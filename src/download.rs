use crate::config::{DelayRange, ScraperConfig};
use crate::error::ScrapeError;
use crate::filter::ImageUrlFilter;
use crate::results::{DownloadOutcome, DownloadSummary, ImageSet};
use crate::utils::pause;
use image::ImageFormat;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Extension given to files whose URL and response reveal nothing better
pub const FALLBACK_EXTENSION: &str = "jpg";

const FALLBACK_STEM: &str = "image";

/// Body and declared type of a fetched image
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Retrieves image bytes for the downloader
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// One attempt, failing on transport errors and non-success statuses
    async fn fetch(&self, url: &Url) -> Result<FetchedImage, ScrapeError>;
}

/// Plain HTTP GET with a fixed timeout, user-agent and referer
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, referer: &str, timeout: Duration) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        let referer = HeaderValue::from_str(referer)
            .map_err(|e| ScrapeError::Config(format!("referer {referer}: {e}")))?;
        headers.insert(header::REFERER, referer);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| ScrapeError::Config(format!("http client build failed: {e}")))?;

        Ok(Self { client })
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        Self::new(
            &config.browser.user_agent,
            &config.target_url,
            Duration::from_secs(config.download.timeout_secs),
        )
    }
}

fn http_error(url: &Url) -> impl FnOnce(reqwest::Error) -> ScrapeError {
    let url = url.to_string();
    move |source| ScrapeError::Http { url, source }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedImage, ScrapeError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(http_error(url))?
            .error_for_status()
            .map_err(http_error(url))?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(http_error(url))?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// File name derived from an image URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetName {
    /// Final path segment without the query string
    pub stem: String,
    /// The extension present in the URL, if any
    pub extension: Option<String>,
}

impl TargetName {
    pub fn from_url(url: &Url) -> Self {
        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_STEM);

        let path = Path::new(segment);
        match (path.file_stem(), path.extension()) {
            (Some(stem), Some(ext)) => Self {
                stem: stem.to_string_lossy().into_owned(),
                extension: Some(ext.to_string_lossy().into_owned()),
            },
            _ => Self {
                stem: segment.to_string(),
                extension: None,
            },
        }
    }

    /// Name used before the response is seen
    pub fn file_name(&self) -> String {
        self.with_extension(self.extension.as_deref().unwrap_or(FALLBACK_EXTENSION))
    }

    fn with_extension(&self, ext: &str) -> String {
        format!("{}.{}", self.stem, ext)
    }
}

/// File name for a URL: `https://site/a/photo.png?x=1` gives `photo.png`, `https://site/a/asset`
/// gives `asset.jpg`
pub fn derive_filename(url: &Url) -> String {
    TargetName::from_url(url).file_name()
}

/// Picks an extension from the declared content type, then the magic bytes
pub fn infer_extension(content_type: Option<&str>, bytes: &[u8]) -> String {
    if let Some(content_type) = content_type {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if mime == "image/svg+xml" {
            return "svg".to_string();
        }
        if let Some(ext) = ImageFormat::from_mime_type(&mime).and_then(first_extension) {
            return ext;
        }
    }

    if let Some(ext) = image::guess_format(bytes).ok().and_then(first_extension) {
        return ext;
    }
    if looks_like_svg(bytes) {
        return "svg".to_string();
    }
    FALLBACK_EXTENSION.to_string()
}

/// Extensions `infer_extension` may produce
fn is_image_extension(ext: &std::ffi::OsStr) -> bool {
    ext.eq_ignore_ascii_case("svg") || ImageFormat::from_extension(ext).is_some()
}

fn first_extension(format: ImageFormat) -> Option<String> {
    format.extensions_str().first().map(|ext| ext.to_string())
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

/// Creates `dir` and its parents if absent
pub async fn prepare_output_dir(dir: &Path) -> Result<(), ScrapeError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(ScrapeError::io(dir))
}

/// Downloads collected image URLs into one directory
pub struct Downloader<F> {
    fetcher: F,
    filter: ImageUrlFilter,
    output_dir: PathBuf,
    throttle: DelayRange,
}

impl<F: Fetch> Downloader<F> {
    pub fn new(
        fetcher: F,
        filter: ImageUrlFilter,
        output_dir: impl Into<PathBuf>,
        throttle: DelayRange,
    ) -> Self {
        Self {
            fetcher,
            filter,
            output_dir: output_dir.into(),
            throttle,
        }
    }

    pub fn from_config(fetcher: F, config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let filter = ImageUrlFilter::from_config(&config.download)?;
        Ok(Self::new(
            fetcher,
            filter,
            &config.output_dir,
            config.download.throttle,
        ))
    }

    /// Creates the output directory tree
    pub async fn prepare_output_dir(&self) -> Result<(), ScrapeError> {
        prepare_output_dir(&self.output_dir).await
    }

    /// Processes every URL in collection order
    ///
    /// Per-item problems become counters, so every URL lands in exactly one of them. Call
    /// `prepare_output_dir` first; otherwise every write fails.
    pub async fn download_all(&self, images: &ImageSet) -> DownloadSummary {
        let total = images.len();
        ::log::info!("Starting to download {} images...", total);

        let mut summary = DownloadSummary::new(total);
        for (idx, raw) in images.iter().enumerate() {
            let outcome = self.download_one(raw, idx + 1, total).await;
            summary.record(outcome);
            if outcome == DownloadOutcome::Downloaded {
                pause(self.throttle.sample()).await;
            }
        }
        summary
    }

    /// Handles a single URL; `idx` and `total` only feed the progress log
    pub async fn download_one(&self, raw: &str, idx: usize, total: usize) -> DownloadOutcome {
        let url = match self.filter.check(raw) {
            Ok(url) => url,
            Err(reason) => {
                ::log::info!("Skipping invalid URL ({}): {}", reason, raw);
                return DownloadOutcome::SkippedInvalid;
            }
        };

        let name = TargetName::from_url(&url);
        if let Some(existing) = self.existing_file(&name).await {
            ::log::info!(
                "Skipping existing file: {} ({}/{})",
                existing.display(),
                idx,
                total
            );
            return DownloadOutcome::SkippedExisting;
        }

        ::log::info!("Downloading: {} ({}/{})", name.file_name(), idx, total);
        match self.fetch_and_store(&url, &name).await {
            Ok(path) => {
                ::log::info!(
                    "Successfully downloaded: {} ({}/{})",
                    path.display(),
                    idx,
                    total
                );
                DownloadOutcome::Downloaded
            }
            Err(e) => {
                ::log::warn!("Failed to download image {}: {}", idx, e);
                DownloadOutcome::Failed
            }
        }
    }

    async fn fetch_and_store(&self, url: &Url, name: &TargetName) -> Result<PathBuf, ScrapeError> {
        let image = self.fetcher.fetch(url).await?;

        let file_name = match &name.extension {
            Some(_) => name.file_name(),
            None => {
                let ext = infer_extension(image.content_type.as_deref(), &image.bytes);
                name.with_extension(&ext)
            }
        };
        let path = self.output_dir.join(&file_name);

        // Stage under a hidden name so a failed write never looks like an existing file
        let staging = self.output_dir.join(format!(".{file_name}.part"));
        if let Err(e) = tokio::fs::write(&staging, &image.bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(ScrapeError::io(&path)(e));
        }
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(ScrapeError::io(&path))?;
        Ok(path)
    }

    /// Existing file for this name
    ///
    /// Names without an extension match a file with the same stem and an image extension, since
    /// the extension is only decided after fetching.
    async fn existing_file(&self, name: &TargetName) -> Option<PathBuf> {
        if name.extension.is_some() {
            let path = self.output_dir.join(name.file_name());
            return match tokio::fs::try_exists(&path).await {
                Ok(true) => Some(path),
                _ => None,
            };
        }

        let mut entries = tokio::fs::read_dir(&self.output_dir).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let stem_matches = path
                .file_stem()
                .is_some_and(|stem| stem.to_string_lossy() == name.stem);
            let is_image = path.extension().is_some_and(is_image_extension);
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if stem_matches && is_image && is_file {
                return Some(path);
            }
        }
        None
    }
}
