use rand::Rng;
use std::time::Duration;

/// Pick a delay uniformly from `min_ms..=max_ms`
///
/// A reversed range collapses to `min_ms`.
pub fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    let ms = rand::rng().random_range(min_ms..=max_ms);
    Duration::from_millis(ms)
}

/// Sleep unless the duration is zero
pub async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
