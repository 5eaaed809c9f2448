use chrono::{DateTime, Duration, Local};

/// Gates how often PMTSD frames are physically written to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    min_interval: Duration,
}

impl RateLimiter {
    pub const DEFAULT_INTERVAL_MS: i64 = 5000;

    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    /// A frame goes out when something changed, or when the last successful
    /// write is at least `min_interval` old. Never having sent counts as old.
    pub fn should_transmit(
        &self,
        changed: bool,
        now: DateTime<Local>,
        last_transmit: Option<DateTime<Local>>,
    ) -> bool {
        if changed {
            return true;
        }

        match last_transmit {
            Some(last) => now.signed_duration_since(last) >= self.min_interval,
            None => true,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::milliseconds(Self::DEFAULT_INTERVAL_MS))
    }
}
