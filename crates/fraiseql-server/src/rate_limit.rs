//! Process-wide token-bucket rate limiter.
//!
//! Deliberately simple: one bucket refilled at the configured
//! requests-per-second (`FRAISEQL_RATE_LIMIT_RPS` overrides). Per-principal
//! limiting belongs to the external RBAC layer; this guard protects the
//! process itself.

use std::time::Instant;

use parking_lot::Mutex;

struct Bucket {
    tokens:      f64,
    last_refill: Instant,
}

/// Token bucket: capacity == refill rate == configured rps.
pub struct RateLimiter {
    rps:    f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter allowing `rps` requests per second (0 disables).
    #[must_use]
    pub fn new(rps: u32) -> Self {
        Self {
            rps:    f64::from(rps),
            bucket: Mutex::new(Bucket {
                tokens:      f64::from(rps),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Try to take one token. Returns the suggested wait in milliseconds
    /// when the bucket is empty.
    pub fn check(&self) -> Result<(), u64> {
        if self.rps <= 0.0 {
            return Ok(());
        }
        let mut bucket = self.bucket.lock();
        let elapsed = bucket.last_refill.elapsed().as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.rps);
        bucket.last_refill = Instant::now();

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - bucket.tokens;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Err((deficit / self.rps * 1000.0).ceil() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rps_disables_limiting() {
        let limiter = RateLimiter::new(0);
        for _ in 0..1000 {
            assert!(limiter.check().is_ok());
        }
    }

    #[test]
    fn test_bucket_exhausts_and_suggests_wait() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());

        let wait = limiter.check().expect_err("bucket exhausted");
        assert!(wait > 0);
    }
}
