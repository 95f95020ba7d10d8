//! Token-bucket egress pacer (spec.md §4.3: "rate = bitrate/8 bytes/s,
//! burst clamped between `minBurstPackets × maxPayload` (8) and
//! `maxBurstPackets × maxPayload` (64); if a packet does not fit, the
//! sender suspends for exactly the deficit time. Setting bitrate to 0
//! disables pacing.").

use std::time::{Duration, Instant};

use mirage_core::PacerPolicy;

pub struct Pacer {
    policy: PacerPolicy,
    bitrate_bps: u64,
    tokens: f64,
    last_refill: Instant,
}

impl Pacer {
    pub fn new(policy: PacerPolicy, bitrate_bps: u64) -> Self {
        let burst = policy.burst_bytes(bitrate_bps) as f64;
        Self { policy, bitrate_bps, tokens: burst, last_refill: Instant::now() }
    }

    pub fn set_bitrate(&mut self, bitrate_bps: u64) {
        self.bitrate_bps = bitrate_bps;
        let burst = self.policy.burst_bytes(bitrate_bps) as f64;
        self.tokens = self.tokens.min(burst);
    }

    fn refill(&mut self) {
        if self.bitrate_bps == 0 {
            return;
        }
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        let bytes_per_sec = self.bitrate_bps as f64 / 8.0;
        let burst = self.policy.burst_bytes(self.bitrate_bps) as f64;
        self.tokens = (self.tokens + elapsed * bytes_per_sec).min(burst);
    }

    /// Consume `bytes` worth of budget, returning the deficit wait time if
    /// the bucket doesn't currently hold enough tokens. Pacing is disabled
    /// entirely when `bitrate_bps == 0`.
    pub fn consume(&mut self, bytes: usize) -> Option<Duration> {
        if self.bitrate_bps == 0 {
            return None;
        }
        self.refill();
        let needed = bytes as f64;
        if self.tokens >= needed {
            self.tokens -= needed;
            return None;
        }
        let deficit = needed - self.tokens;
        let bytes_per_sec = self.bitrate_bps as f64 / 8.0;
        let wait_secs = deficit / bytes_per_sec;
        self.tokens = 0.0;
        Some(Duration::from_secs_f64(wait_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bitrate_disables_pacing() {
        let mut pacer = Pacer::new(PacerPolicy::default(), 0);
        assert_eq!(pacer.consume(1_000_000), None);
    }

    #[test]
    fn burst_is_available_immediately() {
        let policy = PacerPolicy::default();
        let mut pacer = Pacer::new(policy, 50_000_000);
        let burst = policy.burst_bytes(50_000_000);
        assert_eq!(pacer.consume(burst), None);
    }

    #[test]
    fn exceeding_the_burst_returns_a_deficit_wait() {
        let policy = PacerPolicy::default();
        let mut pacer = Pacer::new(policy, 8_000_000);
        let burst = policy.burst_bytes(8_000_000);
        let wait = pacer.consume(burst + 100_000);
        assert!(wait.is_some());
        assert!(wait.unwrap() > Duration::ZERO);
    }
}
