use crate::error::ScrapeError;

/// Where the viewport sits relative to the scrollable document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    /// `pageYOffset + innerHeight`
    pub viewport_bottom: f64,
    /// `document.body.scrollHeight`
    pub scroll_height: f64,
}

impl ScrollPosition {
    pub fn at_bottom(&self) -> bool {
        self.viewport_bottom >= self.scroll_height
    }
}

/// The browser operations the scroll-and-collect loop needs
///
/// Implemented by the WebDriver session and by scripted pages in tests.
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    /// Load a page and wait for navigation to finish
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Every `<img>` source currently in the DOM, in document order
    async fn image_sources(&mut self) -> Result<Vec<String>, ScrapeError>;

    /// Scroll to the bottom of the document
    async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError>;

    async fn scroll_position(&mut self) -> Result<ScrollPosition, ScrapeError>;

    /// End the browser session
    async fn close(self) -> Result<(), ScrapeError>;
}

/// Runs `body` with exclusive use of `driver`, then closes the session
///
/// The session is closed whatever `body` returns, so callers can use `?` freely inside it.
pub async fn with_session<D, T, F>(mut driver: D, body: F) -> T
where
    D: PageDriver,
    F: AsyncFnOnce(&mut D) -> T,
{
    let out = body(&mut driver).await;
    match driver.close().await {
        Ok(()) => ::log::info!("Browser closed."),
        Err(e) => ::log::warn!("Failed to close browser session: {}", e),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct ClosingPage {
        closed: Rc<Cell<bool>>,
    }

    impl PageDriver for ClosingPage {
        async fn navigate(&mut self, _url: &str) -> Result<(), ScrapeError> {
            Err(ScrapeError::Dom("navigation refused".into()))
        }

        async fn image_sources(&mut self) -> Result<Vec<String>, ScrapeError> {
            Ok(Vec::new())
        }

        async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
            Ok(())
        }

        async fn scroll_position(&mut self) -> Result<ScrollPosition, ScrapeError> {
            Ok(ScrollPosition {
                viewport_bottom: 0.0,
                scroll_height: 0.0,
            })
        }

        async fn close(self) -> Result<(), ScrapeError> {
            self.closed.set(true);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_session_closed_when_body_fails() {
        let closed = Rc::new(Cell::new(false));
        let page = ClosingPage {
            closed: Rc::clone(&closed),
        };

        let result = with_session(page, async |page| {
            page.navigate("https://example.com/").await?;
            Ok::<_, ScrapeError>(())
        })
        .await;

        assert!(result.is_err());
        assert!(closed.get());
    }

    #[test]
    fn test_at_bottom() {
        let pos = ScrollPosition {
            viewport_bottom: 1080.0,
            scroll_height: 1080.0,
        };
        assert!(pos.at_bottom());
        let pos = ScrollPosition {
            viewport_bottom: 1080.0,
            scroll_height: 4000.0,
        };
        assert!(!pos.at_bottom());
    }
}
