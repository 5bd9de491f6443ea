//! Minimum-interval rate limiting.
//!
//! Each loader owns one `RateLimiter`. Before every fetch attempt the loader
//! waits until at least `1 / requests_per_second` has passed since the previous
//! attempt, then records the current time. The timestamp advances on every
//! attempt, whether the fetch later succeeds or fails.
//!
//! The same gate has two entry points: `wait_for_slot` suspends the task,
//! `wait_for_slot_blocking` sleeps the thread.

use std::time::{Duration, Instant};

use crate::models::ExecutionMode;

/// Per-loader minimum-interval gate.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Option<Duration>,
    last_request_time: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter allowing `requests_per_second` attempts per second.
    ///
    /// `None`, zero, negative or non-finite rates disable the gate.
    pub fn new(requests_per_second: Option<f64>) -> Self {
        let min_interval = requests_per_second
            .filter(|rps| rps.is_finite() && *rps > 0.0)
            .and_then(|rps| Duration::try_from_secs_f64(1.0 / rps).ok());
        Self {
            min_interval,
            last_request_time: None,
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn min_interval(&self) -> Option<Duration> {
        self.min_interval
    }

    pub fn last_request_time(&self) -> Option<Instant> {
        self.last_request_time
    }

    /// Time still to wait at `now` before the next attempt may start.
    fn delay_at(&self, now: Instant) -> Option<Duration> {
        let min_interval = self.min_interval?;
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < min_interval).then(|| min_interval - elapsed)
    }

    fn record_attempt(&mut self) {
        let now = Instant::now();
        // never moves backwards
        self.last_request_time = Some(match self.last_request_time {
            Some(last) if last > now => last,
            _ => now,
        });
    }

    /// Suspends until a slot is free, then records the attempt.
    pub async fn wait_for_slot(&mut self) {
        if let Some(delay) = self.delay_at(Instant::now()) {
            log::debug!("Rate limit: waiting {:?} before next request", delay);
            tokio::time::sleep(delay).await;
        }
        self.record_attempt();
    }

    /// Blocks the calling thread until a slot is free, then records the attempt.
    pub fn wait_for_slot_blocking(&mut self) {
        if let Some(delay) = self.delay_at(Instant::now()) {
            log::debug!("Rate limit: sleeping {:?} before next request", delay);
            std::thread::sleep(delay);
        }
        self.record_attempt();
    }

    /// Waits with the primitive matching `mode`.
    pub async fn wait(&mut self, mode: ExecutionMode) {
        match mode {
            ExecutionMode::Blocking => self.wait_for_slot_blocking(),
            ExecutionMode::Suspend => self.wait_for_slot().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_disabled() {
        assert_eq!(RateLimiter::new(None).min_interval(), None);
        assert_eq!(RateLimiter::new(Some(0.0)).min_interval(), None);
        assert_eq!(RateLimiter::new(Some(-1.0)).min_interval(), None);
        assert_eq!(RateLimiter::new(Some(f64::NAN)).min_interval(), None);
        assert_eq!(
            RateLimiter::new(Some(2.0)).min_interval(),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_first_wait_returns_immediately() {
        let mut limiter = RateLimiter::new(Some(0.5)); // 2s interval
        let start = Instant::now();
        limiter.wait_for_slot_blocking();
        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(limiter.last_request_time().is_some());
    }

    #[test]
    fn test_blocking_waits_are_spaced() {
        let mut limiter = RateLimiter::new(Some(2.0));
        let start = Instant::now();
        limiter.wait_for_slot_blocking();
        limiter.wait_for_slot_blocking();
        assert!(
            start.elapsed() >= Duration::from_millis(500),
            "two waits at 2 rps should take at least 0.5s, took {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_async_waits_are_spaced() {
        let mut limiter = RateLimiter::new(Some(2.0));
        let start = Instant::now();
        limiter.wait_for_slot().await;
        limiter.wait_for_slot().await;
        assert!(
            start.elapsed() >= Duration::from_millis(500),
            "two waits at 2 rps should take at least 0.5s, took {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_wait_dispatches_on_mode() {
        let mut limiter = RateLimiter::new(Some(10.0));
        let start = Instant::now();
        limiter.wait(ExecutionMode::Suspend).await;
        limiter.wait(ExecutionMode::Blocking).await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_unlimited_records_without_waiting() {
        let mut limiter = RateLimiter::unlimited();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait_for_slot_blocking();
        }
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(limiter.last_request_time().is_some());
    }

    #[test]
    fn test_last_request_time_is_monotonic() {
        let mut limiter = RateLimiter::new(Some(1000.0));
        let mut previous = None;
        for _ in 0..5 {
            limiter.wait_for_slot_blocking();
            let current = limiter.last_request_time();
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_delay_accounts_for_elapsed_time() {
        let mut limiter = RateLimiter::new(Some(1.0));
        limiter.record_attempt();
        let last = limiter.last_request_time().unwrap();
        assert_eq!(
            limiter.delay_at(last + Duration::from_millis(400)),
            Some(Duration::from_millis(600))
        );
        assert_eq!(limiter.delay_at(last + Duration::from_secs(2)), None);
    }
}
