use crate::config::ScrollConfig;
use crate::crawlers::crawler::PageDriver;
use crate::error::ScrapeError;
use crate::results::{CollectReport, ImageSet, StopReason};
use crate::utils::pause;
use std::time::Duration;

/// Mutable state of one scroll-and-collect pass
#[derive(Debug, Default)]
pub struct ScrollState {
    /// 1-based index of the current iteration
    pub iteration: usize,
    /// Consecutive iterations that found nothing new
    pub no_new_streak: usize,
    pub read_failures: usize,
    pub images: ImageSet,
}

impl ScrollState {
    fn finish(self, stop: StopReason) -> CollectReport {
        CollectReport {
            images: self.images,
            iterations: self.iteration,
            read_failures: self.read_failures,
            stop,
        }
    }
}

/// Scrolls the page until it stops yielding new images, then returns every unique source seen
///
/// Stop checks run in this order each iteration: the no-new-images streak (before scrolling),
/// the scroll budget, and finally whether the viewport reached the document bottom after the
/// scroll. A DOM read that keeps failing is counted separately and leaves the streak alone.
/// Scroll and measure failures are returned as errors.
pub async fn collect_images<D: PageDriver>(
    page: &mut D,
    config: &ScrollConfig,
) -> Result<CollectReport, ScrapeError> {
    ::log::info!(
        "Starting scroll: at most {} scrolls, stopping after {} without new images",
        config.max_scrolls,
        config.no_new_threshold
    );

    let mut state = ScrollState::default();

    for iteration in 1..=config.max_scrolls {
        state.iteration = iteration;

        match read_with_retry(page, config).await {
            Ok(sources) => {
                let new_count = state.images.extend_new(&sources);
                if new_count > 0 {
                    state.no_new_streak = 0;
                    ::log::info!(
                        "Scroll {}: found {} new images (total: {})",
                        iteration,
                        new_count,
                        state.images.len()
                    );
                } else {
                    state.no_new_streak += 1;
                    ::log::info!(
                        "Scroll {}: no new images ({}/{} consecutive)",
                        iteration,
                        state.no_new_streak,
                        config.no_new_threshold
                    );
                    if state.no_new_streak >= config.no_new_threshold {
                        ::log::info!(
                            "Stopping: no new images for {} consecutive scrolls",
                            state.no_new_streak
                        );
                        return Ok(state.finish(StopReason::NoNewImages));
                    }
                }
            }
            Err(e) => {
                state.read_failures += 1;
                ::log::warn!("Scroll {}: could not read images: {}", iteration, e);
            }
        }

        page.scroll_to_bottom().await?;
        pause(Duration::from_millis(config.scroll_delay_ms)).await;
        pause(config.jitter.sample()).await;

        let position = page.scroll_position().await?;
        if position.at_bottom() {
            ::log::info!("Reached bottom of page (scroll {})", iteration);
            return Ok(state.finish(StopReason::ReachedBottom));
        }
    }

    ::log::info!("Scroll budget of {} exhausted", config.max_scrolls);
    Ok(state.finish(StopReason::ScrollBudget))
}

async fn read_with_retry<D: PageDriver>(
    page: &mut D,
    config: &ScrollConfig,
) -> Result<Vec<String>, ScrapeError> {
    let mut attempt = 0;
    loop {
        match page.image_sources().await {
            Ok(sources) => return Ok(sources),
            Err(e) if attempt < config.dom_read_retries => {
                attempt += 1;
                ::log::debug!(
                    "DOM read failed ({}), retry {}/{}",
                    e,
                    attempt,
                    config.dom_read_retries
                );
                pause(Duration::from_millis(config.dom_retry_delay_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelayRange;
    use crate::crawlers::crawler::ScrollPosition;

    /// A page whose DOM is scripted per read
    struct ScriptedPage {
        /// Sources returned by each successive read; the last entry repeats
        reads: Vec<Result<Vec<String>, String>>,
        read_count: usize,
        scrolls: usize,
        /// Report the bottom after this many scrolls
        bottom_after: Option<usize>,
    }

    impl ScriptedPage {
        fn new(reads: Vec<Result<Vec<String>, String>>) -> Self {
            Self {
                reads,
                read_count: 0,
                scrolls: 0,
                bottom_after: None,
            }
        }
    }

    impl PageDriver for ScriptedPage {
        async fn navigate(&mut self, _url: &str) -> Result<(), ScrapeError> {
            Ok(())
        }

        async fn image_sources(&mut self) -> Result<Vec<String>, ScrapeError> {
            let idx = self.read_count.min(self.reads.len() - 1);
            self.read_count += 1;
            self.reads[idx].clone().map_err(ScrapeError::Dom)
        }

        async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
            self.scrolls += 1;
            Ok(())
        }

        async fn scroll_position(&mut self) -> Result<ScrollPosition, ScrapeError> {
            let at_bottom = self.bottom_after.is_some_and(|n| self.scrolls >= n);
            Ok(ScrollPosition {
                viewport_bottom: 1080.0 * self.scrolls as f64,
                scroll_height: if at_bottom { 0.0 } else { 1.0e9 },
            })
        }

        async fn close(self) -> Result<(), ScrapeError> {
            Ok(())
        }
    }

    fn fast_config() -> ScrollConfig {
        ScrollConfig {
            scroll_delay_ms: 0,
            jitter: DelayRange::none(),
            dom_retry_delay_ms: 0,
            ..ScrollConfig::default()
        }
    }

    fn batch(names: &[&str]) -> Result<Vec<String>, String> {
        Ok(names
            .iter()
            .map(|n| format!("https://cdn.example.com/{n}"))
            .collect())
    }

    #[tokio::test]
    async fn test_stops_after_threshold_without_new_images() {
        let mut page = ScriptedPage::new(vec![batch(&["a.png", "b.png"])]);
        let report = collect_images(&mut page, &fast_config()).await.unwrap();

        assert_eq!(report.stop, StopReason::NoNewImages);
        // One productive read, then three empty ones
        assert_eq!(report.iterations, 4);
        assert_eq!(page.scrolls, 3);
        assert_eq!(report.images.len(), 2);
    }

    #[tokio::test]
    async fn test_runs_full_budget_when_always_new() {
        let reads = (0..10)
            .map(|i| batch(&[format!("{i}.jpg").as_str()]))
            .collect::<Vec<_>>();
        let mut page = ScriptedPage::new(reads);
        let report = collect_images(&mut page, &fast_config()).await.unwrap();

        assert_eq!(report.stop, StopReason::ScrollBudget);
        assert_eq!(report.iterations, 7);
        assert_eq!(page.scrolls, 7);
        assert_eq!(report.images.len(), 7);
    }

    #[tokio::test]
    async fn test_stops_at_bottom() {
        let reads = (0..10)
            .map(|i| batch(&[format!("{i}.jpg").as_str()]))
            .collect::<Vec<_>>();
        let mut page = ScriptedPage::new(reads);
        page.bottom_after = Some(2);
        let report = collect_images(&mut page, &fast_config()).await.unwrap();

        assert_eq!(report.stop, StopReason::ReachedBottom);
        assert_eq!(report.iterations, 2);
        assert_eq!(report.images.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicates_within_and_across_reads() {
        let mut page = ScriptedPage::new(vec![
            batch(&["a.png", "a.png", "b.png"]),
            batch(&["b.png", "c.png", "a.png"]),
        ]);
        let report = collect_images(&mut page, &fast_config()).await.unwrap();

        let urls: Vec<&str> = report.images.iter().collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/a.png",
                "https://cdn.example.com/b.png",
                "https://cdn.example.com/c.png",
            ]
        );
    }

    #[tokio::test]
    async fn test_read_failures_do_not_advance_streak() {
        let mut page = ScriptedPage::new(vec![
            batch(&["a.png"]),
            Err("stale element".into()),
            Err("stale element".into()),
            Err("stale element".into()),
            batch(&["a.png"]),
        ]);
        let config = ScrollConfig {
            dom_read_retries: 2,
            ..fast_config()
        };
        let report = collect_images(&mut page, &config).await.unwrap();

        // Iteration 2 exhausts its retries; iterations 3 to 5 are the empty streak
        assert_eq!(report.read_failures, 1);
        assert_eq!(report.iterations, 5);
        assert_eq!(report.stop, StopReason::NoNewImages);
    }

    #[tokio::test]
    async fn test_transient_read_failure_is_retried() {
        let mut page = ScriptedPage::new(vec![
            Err("not ready".into()),
            batch(&["a.png"]),
            batch(&["a.png", "b.png"]),
        ]);
        let config = ScrollConfig {
            max_scrolls: 2,
            ..fast_config()
        };
        let report = collect_images(&mut page, &config).await.unwrap();

        assert_eq!(report.read_failures, 0);
        assert_eq!(report.images.len(), 2);
        assert_eq!(report.stop, StopReason::ScrollBudget);
    }
}
