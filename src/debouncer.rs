use std::time::{Duration, Instant};

/// A debouncer that holds the most recent input value and releases it
/// only after a period of inactivity
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    /// The duration to wait after the last event before releasing the value
    delay: Duration,
    /// When the last event occurred
    last_event: Option<Instant>,
    /// Latest value, superseding anything written before it
    pending: Option<T>,
}

impl<T> Debouncer<T> {
    /// Create a new debouncer with the specified delay in milliseconds
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            last_event: None,
            pending: None,
        }
    }

    /// Register a new value, restarting the quiet window
    pub fn trigger(&mut self, value: T) {
        self.trigger_at(value, Instant::now());
    }

    pub fn trigger_at(&mut self, value: T, now: Instant) {
        self.last_event = Some(now);
        self.pending = Some(value);
    }

    /// Take the pending value if the quiet window has elapsed
    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        let last = self.last_event?;
        if now.saturating_duration_since(last) >= self.delay {
            self.last_event = None;
            return self.pending.take();
        }
        None
    }

    /// Get the time remaining before the value is released
    /// Returns None if nothing is pending
    pub fn time_remaining(&self) -> Option<Duration> {
        self.time_remaining_at(Instant::now())
    }

    pub fn time_remaining_at(&self, now: Instant) -> Option<Duration> {
        if self.pending.is_none() {
            return None;
        }

        self.last_event.map(|last| {
            let elapsed = now.saturating_duration_since(last);
            if elapsed >= self.delay {
                Duration::from_millis(0)
            } else {
                self.delay - elapsed
            }
        })
    }

    /// Reset the debouncer, discarding any pending value
    pub fn reset(&mut self) {
        self.last_event = None;
        self.pending = None;
    }

    /// Check if there's a pending value
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
