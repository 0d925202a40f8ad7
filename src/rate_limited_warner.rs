use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default interval between warnings about unhandled errors.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Helper that rate limits repeated warnings.
///
/// The caller counts suppressed events via [`record`](Self::record). The next
/// call to [`warn_if_due`](Self::warn_if_due) emits a warning using the
/// provided callback if the configured interval has elapsed.
/// [`flush`](Self::flush) emits immediately if anything has been counted since
/// the last emission.
pub struct RateLimitedWarner {
    interval_secs: u64,
    last_warn: AtomicU64,
    count: AtomicU64,
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}

impl RateLimitedWarner {
    /// Create a new warner. The first warning can be emitted immediately.
    pub fn new(interval: Duration) -> Self {
        let interval_secs = interval.as_secs();
        Self {
            interval_secs,
            last_warn: AtomicU64::new(now_secs().saturating_sub(interval_secs)),
            count: AtomicU64::new(0),
        }
    }

    /// Increment the event counter.
    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit a warning if the rate limit interval has elapsed.
    pub fn warn_if_due(&self, mut warn: impl FnMut(u64)) {
        let now = now_secs();
        let prev = self.last_warn.load(Ordering::Relaxed);
        if now.saturating_sub(prev) >= self.interval_secs {
            let count = self.count.swap(0, Ordering::Relaxed);
            if count > 0 {
                warn(count);
            }
            self.last_warn.store(now, Ordering::Relaxed);
        }
    }

    /// Immediately warn about any counted events.
    pub fn flush(&self, mut warn: impl FnMut(u64)) {
        let count = self.count.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            self.last_warn.store(now_secs(), Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for RateLimitedWarner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedWarner")
            .field("interval_secs", &self.interval_secs)
            .field("pending", &self.count.load(Ordering::Relaxed))
            .finish()
    }
}
