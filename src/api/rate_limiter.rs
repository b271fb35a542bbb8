use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl Bucket {
    fn new(capacity: f64, refill_rate: f64) -> Self {
        let now = Instant::now();
        Bucket { tokens: capacity, capacity, refill_rate, last_refill: now, last_seen: now }
    }

    fn try_consume(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
        self.last_seen = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-client token-bucket rate limiter. Each distinct `client_key` gets
/// its own bucket, created lazily at full capacity on first use.
pub struct RateLimiter {
    capacity: f64,
    refill_rate: f64,
    eviction_ttl: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(capacity: f64, refill_rate: f64, eviction_ttl: Duration) -> Self {
        RateLimiter { capacity, refill_rate, eviction_ttl, buckets: Mutex::new(HashMap::new()) }
    }

    pub fn is_allowed(&self, client_key: &str) -> bool {
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(client_key.to_string())
            .or_insert_with(|| Bucket::new(self.capacity, self.refill_rate));
        bucket.try_consume()
    }

    /// Removes buckets that haven't been touched in `eviction_ttl`. Call
    /// this periodically; nothing evicts in the background on its own.
    pub fn evict_stale(&self) -> usize {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();
        let before = buckets.len();
        buckets.retain(|_, b| now.duration_since(b.last_seen) <= self.eviction_ttl);
        before - buckets.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter::new(30.0, 0.5, Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn allows_requests_within_capacity() {
        let limiter = RateLimiter::new(3.0, 1.0, Duration::from_secs(600));
        assert!(limiter.is_allowed("client-a"));
        assert!(limiter.is_allowed("client-a"));
        assert!(limiter.is_allowed("client-a"));
    }

    #[test]
    fn blocks_once_capacity_is_exhausted() {
        let limiter = RateLimiter::new(2.0, 0.0, Duration::from_secs(600));
        assert!(limiter.is_allowed("client-a"));
        assert!(limiter.is_allowed("client-a"));
        assert!(!limiter.is_allowed("client-a"));
    }

    #[test]
    fn separate_clients_have_independent_buckets() {
        let limiter = RateLimiter::new(1.0, 0.0, Duration::from_secs(600));
        assert!(limiter.is_allowed("client-a"));
        assert!(!limiter.is_allowed("client-a"));
        assert!(limiter.is_allowed("client-b"));
    }

    #[test]
    fn tokens_refill_over_time() {
        let limiter = RateLimiter::new(1.0, 1000.0, Duration::from_secs(600));
        assert!(limiter.is_allowed("client-a"));
        assert!(!limiter.is_allowed("client-a"));
        sleep(Duration::from_millis(10));
        assert!(limiter.is_allowed("client-a"));
    }

    #[test]
    fn evict_stale_removes_only_expired_buckets() {
        let limiter = RateLimiter::new(5.0, 1.0, Duration::from_millis(0));
        limiter.is_allowed("client-a");
        sleep(Duration::from_millis(5));
        let evicted = limiter.evict_stale();
        assert_eq!(evicted, 1);
        assert_eq!(limiter.bucket_count(), 0);
    }

    #[test]
    fn evict_stale_keeps_recently_seen_buckets() {
        let limiter = RateLimiter::new(5.0, 1.0, Duration::from_secs(9999));
        limiter.is_allowed("client-a");
        let evicted = limiter.evict_stale();
        assert_eq!(evicted, 0);
        assert_eq!(limiter.bucket_count(), 1);
    }
}
