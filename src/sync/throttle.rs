//! Bandwidth throttling for uploads.
//!
//! Provides rate limiting using a token bucket algorithm. One limiter is shared
//! by every upload in a run, so the limit applies to the aggregate rate.

use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Tokens are handed out in 1KB units
const TOKEN_BYTES: u64 = 1024;

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Bandwidth limit configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandwidthLimit {
    /// Bytes per second limit, 0 means unlimited.
    pub bytes_per_second: u64,
}

impl BandwidthLimit {
    pub fn new(bytes_per_second: u64) -> Self {
        Self { bytes_per_second }
    }

    pub fn unlimited() -> Self {
        Self { bytes_per_second: 0 }
    }

    pub fn is_limited(&self) -> bool {
        self.bytes_per_second > 0
    }

    /// Rate the limiter actually enforces: limits below one token per second
    /// are raised to one token.
    pub fn effective_bytes_per_second(&self) -> u64 {
        if self.is_limited() {
            self.bytes_per_second.max(TOKEN_BYTES)
        } else {
            0
        }
    }

    /// Format as human-readable string.
    pub fn display(&self) -> String {
        if !self.is_limited() {
            return "unlimited".to_string();
        }
        format!(
            "{}/s",
            humansize::format_size(self.bytes_per_second, humansize::DECIMAL)
        )
    }
}

/// Bandwidth limiter using token bucket algorithm.
#[derive(Clone)]
pub struct BandwidthLimiter {
    limiter: Option<Arc<DirectLimiter>>,
    limit: BandwidthLimit,
}

impl BandwidthLimiter {
    pub fn new(limit: BandwidthLimit) -> Self {
        if limit.effective_bytes_per_second() != limit.bytes_per_second {
            tracing::warn!(
                requested = limit.bytes_per_second,
                "bandwidth limit below {} B/s is not supported, using {}",
                TOKEN_BYTES,
                BandwidthLimit::new(TOKEN_BYTES).display()
            );
        }

        let limiter = if limit.is_limited() {
            let tokens_per_second = (limit.bytes_per_second / TOKEN_BYTES).clamp(1, u32::MAX as u64);
            NonZeroU32::new(tokens_per_second as u32)
                .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))))
        } else {
            None
        };

        Self { limiter, limit }
    }

    pub fn unlimited() -> Self {
        Self::new(BandwidthLimit::unlimited())
    }

    /// Wait for permission to transfer `bytes` bytes.
    /// This is a no-op if no limit is set.
    pub async fn acquire(&self, bytes: usize) {
        if let Some(limiter) = &self.limiter {
            let tokens = (bytes as u64).div_ceil(TOKEN_BYTES).max(1);

            for _ in 0..tokens {
                limiter.until_ready().await;
            }
        }
    }
}

impl Default for BandwidthLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for BandwidthLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandwidthLimiter")
            .field("limit", &self.limit)
            .finish()
    }
}
