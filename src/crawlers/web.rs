use crate::config::{BrowserConfig, BrowserKind};
use crate::crawlers::crawler::{PageDriver, ScrollPosition};
use crate::error::ScrapeError;
use crate::parsers;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";
const MEASURE_SCROLL: &str =
    "return [window.pageYOffset + window.innerHeight, document.body.scrollHeight];";

// Common alternatives when the configured endpoint is not listening
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// A headless browser session driven over WebDriver
pub struct WebSession {
    client: Client,
}

impl WebSession {
    /// Starts a session on the configured WebDriver server
    ///
    /// Falls back to well-known local endpoints when the configured one refuses. Fails with
    /// the error from the configured endpoint if none of them accepts.
    pub async fn launch(config: &BrowserConfig) -> Result<Self, ScrapeError> {
        let caps = capabilities(config);

        let client = match connect(&config.webdriver_url, &caps).await {
            Ok(client) => client,
            Err(first_error) => {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}",
                    config.webdriver_url,
                    first_error
                );
                let mut fallback = None;
                for url in FALLBACK_WEBDRIVER_URLS {
                    if url == config.webdriver_url {
                        continue;
                    }
                    ::log::info!("Trying fallback WebDriver URL: {}", url);
                    if let Ok(client) = connect(url, &caps).await {
                        ::log::debug!("Connected to fallback WebDriver at {}", url);
                        fallback = Some(client);
                        break;
                    }
                }
                match fallback {
                    Some(client) => client,
                    None => {
                        ::log::error!(
                            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
                        );
                        return Err(ScrapeError::Launch {
                            url: config.webdriver_url.clone(),
                            source: first_error,
                        });
                    }
                }
            }
        };

        // The window-size argument covers Chrome; this covers drivers that ignore it
        if let Err(e) = client
            .set_window_size(config.viewport_width, config.viewport_height)
            .await
        {
            ::log::debug!("Could not set window size: {}", e);
        }

        Ok(Self { client })
    }
}

async fn connect(
    webdriver_url: &str,
    caps: &Map<String, Value>,
) -> Result<Client, fantoccini::error::NewSessionError> {
    let client = ClientBuilder::native()
        .capabilities(caps.clone())
        .connect(webdriver_url)
        .await?;
    ::log::debug!("Connected to WebDriver at {}", webdriver_url);
    Ok(client)
}

/// WebDriver capabilities for a headless desktop browser with a spoofed user-agent
pub fn capabilities(config: &BrowserConfig) -> Map<String, Value> {
    let mut caps = Map::new();
    match config.kind {
        BrowserKind::Chrome => {
            let mut args = Vec::new();
            if config.headless {
                args.push("--headless".to_string());
            }
            args.push("--no-sandbox".to_string());
            args.push("--disable-dev-shm-usage".to_string());
            args.push("--disable-gpu".to_string());
            args.push(format!(
                "--window-size={},{}",
                config.viewport_width, config.viewport_height
            ));
            args.push(format!("--user-agent={}", config.user_agent));
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
        BrowserKind::Firefox => {
            let mut args = Vec::new();
            if config.headless {
                args.push("--headless".to_string());
            }
            args.push(format!("--width={}", config.viewport_width));
            args.push(format!("--height={}", config.viewport_height));
            caps.insert(
                "moz:firefoxOptions".to_string(),
                json!({
                    "args": args,
                    "prefs": { "general.useragent.override": config.user_agent },
                }),
            );
        }
    }
    caps
}

impl PageDriver for WebSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.client
            .goto(url)
            .await
            .map_err(ScrapeError::browser("navigating to the target page"))
    }

    async fn image_sources(&mut self) -> Result<Vec<String>, ScrapeError> {
        let html = self
            .client
            .source()
            .await
            .map_err(ScrapeError::browser("reading the page source"))?;
        // Resolution against the live URL follows redirects the same way the browser did
        let base = self.client.current_url().await.ok();
        Ok(parsers::image_sources(&html, base.as_ref()))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
        self.client
            .execute(SCROLL_TO_BOTTOM, vec![])
            .await
            .map_err(ScrapeError::browser("scrolling"))?;
        Ok(())
    }

    async fn scroll_position(&mut self) -> Result<ScrollPosition, ScrapeError> {
        let value = self
            .client
            .execute(MEASURE_SCROLL, vec![])
            .await
            .map_err(ScrapeError::browser("measuring scroll position"))?;
        parse_scroll_position(&value)
    }

    async fn close(self) -> Result<(), ScrapeError> {
        self.client
            .close()
            .await
            .map_err(ScrapeError::browser("closing the session"))
    }
}

fn parse_scroll_position(value: &Value) -> Result<ScrollPosition, ScrapeError> {
    let pair = value
        .as_array()
        .filter(|items| items.len() == 2)
        .and_then(|items| Some((items[0].as_f64()?, items[1].as_f64()?)));
    match pair {
        Some((viewport_bottom, scroll_height)) => Ok(ScrollPosition {
            viewport_bottom,
            scroll_height,
        }),
        None => Err(ScrapeError::Script {
            context: "measuring scroll position",
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_capabilities() {
        let config = BrowserConfig::default();
        let caps = capabilities(&config);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        let args: Vec<&str> = args.iter().filter_map(Value::as_str).collect();
        assert!(args.contains(&"--headless"));
        assert!(args.contains(&"--window-size=1920,1080"));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));
    }

    #[test]
    fn test_firefox_capabilities_without_headless() {
        let config = BrowserConfig {
            kind: BrowserKind::Firefox,
            headless: false,
            user_agent: "TestAgent/1.0".to_string(),
            ..BrowserConfig::default()
        };
        let caps = capabilities(&config);
        let opts = &caps["moz:firefoxOptions"];
        let args: Vec<&str> = opts["args"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(!args.contains(&"--headless"));
        assert_eq!(args, vec!["--width=1920", "--height=1080"]);
        assert_eq!(opts["prefs"]["general.useragent.override"], "TestAgent/1.0");
        assert!(!caps.contains_key("goog:chromeOptions"));
    }

    #[test]
    fn test_parse_scroll_position() {
        let pos = parse_scroll_position(&json!([2160, 5400.5])).unwrap();
        assert_eq!(pos.viewport_bottom, 2160.0);
        assert_eq!(pos.scroll_height, 5400.5);

        assert!(parse_scroll_position(&json!(null)).is_err());
        assert!(parse_scroll_position(&json!([1])).is_err());
        assert!(parse_scroll_position(&json!(["a", "b"])).is_err());
    }
}
