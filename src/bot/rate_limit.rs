//! Per-user message rate limiting (in-memory, lock-free).

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use teloxide::types::UserId;

/// Idle users are dropped once every this many checks.
const SWEEP_EVERY: usize = 256;

/// Sliding-window limiter: at most `max` messages per `window` per user.
#[derive(Clone)]
pub struct RateLimiter {
    hits: Arc<DashMap<u64, VecDeque<Instant>>>,
    checks: Arc<AtomicUsize>,
    max: usize,
    window: Duration,
}

impl RateLimiter {
    /// `max == 0` disables limiting.
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            hits: Arc::new(DashMap::new()),
            checks: Arc::new(AtomicUsize::new(0)),
            max: max as usize,
            window,
        }
    }

    pub fn per_minute(max: u32) -> Self {
        Self::new(max, Duration::from_secs(60))
    }

    /// Record a message. Returns `false` if the user is over the limit;
    /// rejected messages are not counted.
    pub fn check(&self, user: UserId) -> bool {
        self.check_at(user, Instant::now())
    }

    fn check_at(&self, user: UserId, now: Instant) -> bool {
        if self.max == 0 {
            return true;
        }
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now);
        }

        let mut times = self.hits.entry(user.0).or_default();
        while times
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) >= self.window)
        {
            times.pop_front();
        }

        if times.len() >= self.max {
            return false;
        }
        times.push_back(now);
        true
    }

    /// Forget users with no message inside the window.
    fn sweep(&self, now: Instant) {
        self.hits.retain(|_, times| {
            times
                .back()
                .is_some_and(|&t| now.saturating_duration_since(t) < self.window)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_within_window() {
        let limiter = RateLimiter::per_minute(3);
        let start = Instant::now();
        let user = UserId(1);

        for i in 0..3 {
            assert!(limiter.check_at(user, start + Duration::from_secs(i)));
        }
        assert!(!limiter.check_at(user, start + Duration::from_secs(10)));
        assert!(limiter.check_at(UserId(2), start + Duration::from_secs(10)));
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::per_minute(2);
        let start = Instant::now();
        let user = UserId(1);

        assert!(limiter.check_at(user, start));
        assert!(limiter.check_at(user, start + Duration::from_secs(30)));
        assert!(!limiter.check_at(user, start + Duration::from_secs(59)));
        // The first hit has expired.
        assert!(limiter.check_at(user, start + Duration::from_secs(61)));
        assert!(!limiter.check_at(user, start + Duration::from_secs(62)));
    }

    #[test]
    fn zero_disables() {
        let off = RateLimiter::per_minute(0);
        for _ in 0..100 {
            assert!(off.check(UserId(1)));
        }
        assert!(off.hits.is_empty());
    }

    #[test]
    fn idle_users_are_forgotten() {
        let limiter = RateLimiter::per_minute(5);
        let start = Instant::now();

        for id in 0..SWEEP_EVERY as u64 - 1 {
            assert!(limiter.check_at(UserId(id), start));
        }
        assert_eq!(limiter.hits.len(), SWEEP_EVERY - 1);

        // This check triggers a sweep; every earlier user has gone quiet.
        assert!(limiter.check_at(UserId(9999), start + Duration::from_secs(61)));
        assert_eq!(limiter.hits.len(), 1);
        assert!(limiter.hits.contains_key(&9999));
    }

    #[test]
    fn sweep_keeps_active_users() {
        let limiter = RateLimiter::per_minute(5);
        let start = Instant::now();

        limiter.check_at(UserId(1), start);
        limiter.check_at(UserId(2), start + Duration::from_secs(50));
        limiter.sweep(start + Duration::from_secs(70));

        assert!(!limiter.hits.contains_key(&1));
        assert!(limiter.hits.contains_key(&2));
    }
}
