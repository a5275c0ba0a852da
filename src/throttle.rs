use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

/// Politeness policy applied around every provider search.
///
/// `admit` is awaited before a search starts and enforces the optional global
/// request rate. `cool_down` runs after the search finishes, while the caller
/// still holds its concurrency slot, so a busy slot stays idle for the
/// configured interval before the next item may use it.
pub struct Throttle {
    cooldown: Duration,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Throttle {
    pub fn new(cooldown: Duration, max_requests_per_second: Option<u32>) -> Self {
        let limiter = max_requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));
        Self { cooldown, limiter }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, None)
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub async fn admit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    pub async fn cool_down(&self) {
        if !self.cooldown.is_zero() {
            tokio::time::sleep(self.cooldown).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn cool_down_waits_configured_interval() {
        let throttle = Throttle::new(Duration::from_millis(1000), None);
        let start = Instant::now();
        throttle.cool_down().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_throttle_never_waits() {
        let throttle = Throttle::disabled();
        let start = Instant::now();
        throttle.admit().await;
        throttle.cool_down().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn rate_limit_admits_within_quota() {
        let throttle = Throttle::new(Duration::ZERO, Some(50));
        // The first admission of a fresh bucket is immediate.
        tokio::time::timeout(Duration::from_secs(1), throttle.admit())
            .await
            .unwrap();
    }

    #[test]
    fn zero_rate_means_unlimited() {
        let throttle = Throttle::new(Duration::from_millis(300), Some(0));
        assert!(throttle.limiter.is_none());
        assert_eq!(throttle.cooldown(), Duration::from_millis(300));
    }
}
