use tokio::time::Instant;

/// Per-connection token bucket. Each inbound frame costs one token; the
/// bucket refills continuously up to its burst size.
pub struct RateLimiter {
    tokens: f64,
    last_refill: Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    pub fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns `true` if the frame is allowed, `false` if rate-limited.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_burst_within_limit() {
        let mut limiter = RateLimiter::new(5.0, 5.0);
        for _ in 0..5 {
            assert!(limiter.allow());
        }
    }

    #[test]
    fn rejects_over_limit() {
        let mut limiter = RateLimiter::new(3.0, 0.0); // no refill
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[tokio::test]
    async fn refills_over_time() {
        let mut limiter = RateLimiter::new(2.0, 100.0); // 100 tokens/sec refill
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(limiter.allow());
    }

    #[tokio::test]
    async fn refill_is_capped_at_burst() {
        let mut limiter = RateLimiter::new(2.0, 1000.0);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }
}
