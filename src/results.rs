use std::collections::HashSet;
use std::fmt;

/// Insertion-ordered set of image URLs
///
/// Equality is exact string match, so `a.png?w=1` and `a.png?w=2` are distinct entries.
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL, returning `false` if it was already present
    pub fn insert(&mut self, url: &str) -> bool {
        if self.seen.contains(url) {
            return false;
        }
        self.seen.insert(url.to_string());
        self.order.push(url.to_string());
        true
    }

    /// Merges a batch of sources and returns how many were unseen
    pub fn extend_new<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter()
            .filter(|url| self.insert(url.as_ref()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// URLs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ImageSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ImageSet::new();
        set.extend_new(iter);
        set
    }
}

/// Why the scroll-and-collect loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Too many consecutive iterations found nothing new
    NoNewImages,
    /// Every allowed iteration ran
    ScrollBudget,
    /// The viewport bottom reached the document height
    ReachedBottom,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::NoNewImages => "no new images",
            StopReason::ScrollBudget => "scroll budget exhausted",
            StopReason::ReachedBottom => "reached bottom of page",
        };
        f.write_str(text)
    }
}

/// Result of the scroll-and-collect loop
#[derive(Debug, Clone)]
pub struct CollectReport {
    pub images: ImageSet,
    /// Loop iterations started, including the one that stopped the loop
    pub iterations: usize,
    /// Iterations whose DOM read failed after all retries
    pub read_failures: usize,
    pub stop: StopReason,
}

/// What happened to one collected URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    Failed,
    SkippedInvalid,
    SkippedExisting,
}

/// Aggregated download counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub found: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub skipped_invalid: usize,
    pub skipped_existing: usize,
}

impl DownloadSummary {
    pub fn new(found: usize) -> Self {
        Self {
            found,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded => self.downloaded += 1,
            DownloadOutcome::Failed => self.failed += 1,
            DownloadOutcome::SkippedInvalid => self.skipped_invalid += 1,
            DownloadOutcome::SkippedExisting => self.skipped_existing += 1,
        }
    }

    /// Sum of all outcome counters; equals `found` once every URL is processed
    pub fn processed(&self) -> usize {
        self.downloaded + self.failed + self.skipped_invalid + self.skipped_existing
    }

    pub fn skipped(&self) -> usize {
        self.skipped_invalid + self.skipped_existing
    }
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{rule}")?;
        writeln!(f, "Download Summary:")?;
        writeln!(f, "Total images found: {}", self.found)?;
        writeln!(f, "Successfully downloaded: {}", self.downloaded)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Skipped (existing): {}", self.skipped_existing)?;
        writeln!(f, "Skipped (invalid): {}", self.skipped_invalid)?;
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_set_dedups_and_keeps_order() {
        let mut set = ImageSet::new();
        assert_eq!(set.extend_new(["https://a/1.png", "https://a/2.png", "https://a/1.png"]), 2);
        assert_eq!(set.extend_new(["https://a/2.png", "https://a/3.png"]), 1);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec!["https://a/1.png", "https://a/2.png", "https://a/3.png"]
        );
        assert!(!set.insert("https://a/3.png"));
    }

    #[test]
    fn test_query_variants_are_distinct() {
        let set: ImageSet = ["https://a/x.png?w=1", "https://a/x.png?w=2"].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = DownloadSummary::new(4);
        summary.record(DownloadOutcome::Downloaded);
        summary.record(DownloadOutcome::Failed);
        summary.record(DownloadOutcome::SkippedInvalid);
        summary.record(DownloadOutcome::SkippedExisting);
        assert_eq!(summary.processed(), summary.found);
        assert_eq!(summary.skipped(), 2);

        let printed = summary.to_string();
        assert!(printed.contains("Total images found: 4"));
        assert!(printed.contains("Successfully downloaded: 1"));
        assert!(printed.contains("Skipped (existing): 1"));
    }
}
